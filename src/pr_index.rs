use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum PrIndexError {
    #[error("Failed to read PR index file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse PR index file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One project entry of the historical PR data file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectEntry {
    #[serde(default)]
    prs: Vec<PrRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PrRecord {
    /// Stored as `raw/<diff filename>`
    #[serde(default)]
    diff_file: Option<String>,
    #[serde(default)]
    pr_data: PrData,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PrData {
    #[serde(default)]
    title: String,
}

/// Read-only lookup from a stored diff's filename to the ticket ids named in
/// the title of the pull request that produced it.
///
/// Projects keep the order they have in the file, so "first match" is stable.
#[derive(Debug, Clone, Default)]
pub struct PrIndex {
    projects: Vec<(String, ProjectEntry)>,
}

impl PrIndex {
    /// Load the index from the JSON data file.
    #[instrument]
    pub fn load(path: &Path) -> Result<PrIndex, PrIndexError> {
        let contents = fs::read_to_string(path)?;
        let index = Self::from_json(&contents)?;
        debug!(projects = index.projects.len(), "loaded PR index");
        Ok(index)
    }

    pub fn from_json(contents: &str) -> Result<PrIndex, PrIndexError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(contents)?;
        let projects = raw
            .into_iter()
            .map(|(name, value)| {
                serde_json::from_value::<ProjectEntry>(value).map(|entry| (name, entry))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PrIndex { projects })
    }

    /// Ticket ids from the title of the first PR whose `diff_file` is
    /// `raw/{diff_filename}`. Later matches are not consulted.
    pub fn find_ticket_ids(&self, diff_filename: &str) -> Option<Vec<String>> {
        let search_path = format!("raw/{diff_filename}");
        self.projects
            .iter()
            .flat_map(|(_, entry)| entry.prs.iter())
            .find(|pr| pr.diff_file.as_deref() == Some(search_path.as_str()))
            .map(|pr| extract_ticket_ids(&pr.pr_data.title))
    }
}

static TICKET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]+-[0-9]+\b").expect("valid ticket id pattern"));

/// All `ABC-123` shaped tokens in `text`, in order of appearance.
pub fn extract_ticket_ids(text: &str) -> Vec<String> {
    TICKET_ID
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
