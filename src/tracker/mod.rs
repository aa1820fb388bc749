pub mod fetch;
pub mod types;

pub use fetch::TicketGraphFetcher;
pub use types::{TicketId, TicketTree};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::TrackerConfig;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Tracker returned status {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("Failed to decode tracker response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Tracker issue has no id to look up commits for")]
    MissingIssueId,

    #[error("Tracker base URL not configured (set tracker.base_url or REVIEW_CONTEXT_TRACKER_URL)")]
    MissingBaseUrl,
}

/// Raw response from the tracker: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResponse {
    pub status: u16,
    pub body: String,
}

impl TrackerResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET access to the tracker REST API. `path` is relative to the tracker's
/// base URL and includes any query string.
/// Implementations must be Send + Sync so one transport can serve every
/// concurrent fetch task.
#[async_trait]
pub trait TrackerTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<TrackerResponse, TrackerError>;
}

/// `reqwest`-backed transport. Every request carries the configured
/// per-request timeout; a timeout surfaces as `TrackerError::Request`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or(TrackerError::MissingBaseUrl)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("review-context")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl TrackerTransport for HttpTransport {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<TrackerResponse, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", format!("Basic {token}"));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, body_bytes = body.len(), "tracker response");

        Ok(TrackerResponse { status, body })
    }
}

/// In-memory transport serving canned bodies by path; unknown paths get a 404.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTransport {
        responses: HashMap<String, TrackerResponse>,
        failing: HashSet<String>,
        requested: Mutex<Vec<String>>,
    }

    /// A real `reqwest` error, the same kind a refused connection or timeout
    /// produces.
    pub fn request_error() -> TrackerError {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        TrackerError::Request(err)
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, path: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                path.to_string(),
                TrackerResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }

        /// Fail requests for `path` at the transport level instead of
        /// answering them.
        pub fn with_transport_error(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }

        /// Requested paths that were issue-by-key lookups.
        pub fn issue_requests(&self) -> Vec<String> {
            self.requested()
                .into_iter()
                .filter(|path| path.starts_with("/rest/api/2/issue/"))
                .collect()
        }
    }

    #[async_trait]
    impl TrackerTransport for MockTransport {
        async fn get(&self, path: &str) -> Result<TrackerResponse, TrackerError> {
            self.requested.lock().unwrap().push(path.to_string());
            if self.failing.contains(path) {
                return Err(request_error());
            }
            Ok(self.responses.get(path).cloned().unwrap_or(TrackerResponse {
                status: 404,
                body: String::new(),
            }))
        }
    }
}
