use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn, Instrument};

use super::types::{CommitDetail, IssuePayload, Ticket, TicketId, TicketTree};
use super::{TrackerError, TrackerTransport};

type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TicketId, TrackerError>> + Send + 'a>>;

/// Arena a single tree is built into. Keys already present are linked
/// instead of fetched again.
#[derive(Default)]
struct TreeBuilder {
    tickets: Vec<Ticket>,
    by_key: HashMap<String, TicketId>,
}

impl TreeBuilder {
    fn lookup(&self, key: &str) -> Option<TicketId> {
        self.by_key.get(key).copied()
    }

    fn insert(&mut self, requested_key: &str, ticket: Ticket) -> TicketId {
        let id = TicketId(self.tickets.len());
        self.by_key.insert(requested_key.to_string(), id);
        self.by_key.entry(ticket.key.clone()).or_insert(id);
        self.tickets.push(ticket);
        id
    }

    fn ticket_mut(&mut self, id: TicketId) -> &mut Ticket {
        &mut self.tickets[id.0]
    }

    fn finish(self, root: TicketId) -> TicketTree {
        TicketTree {
            root,
            tickets: self.tickets,
        }
    }
}

/// Builds ticket trees (parent, subtasks and commits) from the tracker API.
///
/// Each requested key is resolved in its own task, at most `concurrency` at a
/// time. A key that cannot be fetched is left out of the result; it never
/// affects the other keys.
#[derive(Clone)]
pub struct TicketGraphFetcher {
    transport: Arc<dyn TrackerTransport>,
    concurrency: usize,
}

impl TicketGraphFetcher {
    pub fn new(transport: Arc<dyn TrackerTransport>, concurrency: usize) -> Self {
        Self {
            transport,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch one tree per distinct key, in the order the keys were given.
    pub async fn fetch(&self, keys: &[String]) -> Vec<TicketTree> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut seen = HashSet::new();
        let mut handles = Vec::new();

        for key in keys.iter().filter(|key| seen.insert(key.as_str())) {
            let fetcher = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let key = key.clone();
            let span = info_span!("fetch_ticket", key = %key);
            handles.push(tokio::spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return None;
                    };
                    info!("fetching ticket");
                    match fetcher.fetch_tree(&key).await {
                        Ok(tree) => Some(tree),
                        Err(err) => {
                            warn!(error = %err, "ticket omitted");
                            None
                        }
                    }
                }
                .instrument(span),
            ));
        }

        let mut trees = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(tree)) => trees.push(tree),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "ticket task failed"),
            }
        }
        info!(requested = keys.len(), fetched = trees.len(), "ticket fetch complete");
        trees
    }

    /// Resolve a single key into its tree, commits included for the root.
    pub async fn fetch_tree(&self, key: &str) -> Result<TicketTree, TrackerError> {
        let mut builder = TreeBuilder::default();
        let root = self.fetch_one(&mut builder, key, true, None).await?;
        let tree = builder.finish(root);
        debug!(tickets = tree.len(), "ticket tree built");
        Ok(tree)
    }

    /// Fetch `key` into `tree` and wire up its relatives.
    ///
    /// With `parent_ref` unset the payload's parent is fetched (without
    /// commits) and the new ticket is handed down to it; with `parent_ref` set
    /// that ticket becomes the parent and no parent lookup is made. Subtasks
    /// are always fetched with the new ticket as their `parent_ref`, and a
    /// subtask that fails is dropped. Keys already in `tree` are linked, not
    /// fetched.
    fn fetch_one<'a>(
        &'a self,
        tree: &'a mut TreeBuilder,
        key: &'a str,
        include_commits: bool,
        parent_ref: Option<TicketId>,
    ) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Some(existing) = tree.lookup(key) {
                debug!(key, "ticket already in tree, linking");
                return Ok(existing);
            }

            let issue = self.get_issue(key).await?;
            let commits = match (include_commits, issue.id.as_deref()) {
                (true, Some(issue_id)) => self.get_commits(issue_id).await.unwrap_or_else(|err| {
                    debug!(key, error = %err, "commit lookup failed");
                    Vec::new()
                }),
                (true, None) => {
                    debug!(key, error = %TrackerError::MissingIssueId, "commit lookup skipped");
                    Vec::new()
                }
                (false, _) => Vec::new(),
            };

            let fields = issue.fields;
            let id = tree.insert(
                key,
                Ticket {
                    key: issue.key.unwrap_or_else(|| key.to_string()),
                    summary: fields.summary,
                    description: fields.description.unwrap_or_default(),
                    status: fields.status.name,
                    commits,
                    parent_key: fields.parent.as_ref().map(|parent| parent.key.clone()),
                    parent: None,
                    children: Vec::new(),
                },
            );

            match (parent_ref, fields.parent) {
                (Some(parent_ref), _) => tree.ticket_mut(id).parent = Some(parent_ref),
                (None, Some(parent)) => {
                    match self.fetch_one(tree, &parent.key, false, Some(id)).await {
                        Ok(parent_id) => tree.ticket_mut(id).parent = Some(parent_id),
                        Err(err) => {
                            warn!(key, parent = %parent.key, error = %err, "parent omitted")
                        }
                    }
                }
                (None, None) => {}
            }

            for subtask in fields.subtasks.unwrap_or_default() {
                match self.fetch_one(tree, &subtask.key, false, Some(id)).await {
                    Ok(child_id) => tree.ticket_mut(id).children.push(child_id),
                    Err(err) => {
                        warn!(key, subtask = %subtask.key, error = %err, "subtask omitted")
                    }
                }
            }

            Ok(id)
        })
    }

    async fn get_issue(&self, key: &str) -> Result<IssuePayload, TrackerError> {
        let path = format!("/rest/api/2/issue/{key}");
        let body = self.get_ok(&path).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_commits(&self, issue_id: &str) -> Result<Vec<String>, TrackerError> {
        let path = format!(
            "/rest/dev-status/latest/issue/detail\
             ?issueId={issue_id}&applicationType=bitbucket&dataType=repository"
        );
        let body = self.get_ok(&path).await?;
        let detail: CommitDetail = serde_json::from_str(&body)?;
        Ok(detail.commit_ids())
    }

    async fn get_ok(&self, path: &str) -> Result<String, TrackerError> {
        let response = self.transport.get(path).await?;
        if !response.is_success() {
            return Err(TrackerError::Status {
                path: path.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}
