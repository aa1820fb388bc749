use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::ops::Index;

/// Issue-by-key response from the tracker REST API.
/// Only the fields the ticket graph needs are modelled; `summary` and
/// `status.name` are required, so a payload without them fails to decode.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueFields {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: IssueStatus,
    #[serde(default)]
    pub parent: Option<IssueRef>,
    #[serde(default)]
    pub subtasks: Option<Vec<IssueRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueStatus {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRef {
    pub key: String,
}

/// Commit-detail response: `detail[].repositories[].commits[].id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub detail: Vec<CommitDetailEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetailEntry {
    #[serde(default)]
    pub repositories: Vec<CommitRepository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitRepository {
    #[serde(default)]
    pub commits: Vec<CommitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub id: String,
}

impl CommitDetail {
    /// Commit ids in response order; duplicates are kept.
    pub fn commit_ids(self) -> Vec<String> {
        self.detail
            .into_iter()
            .flat_map(|entry| entry.repositories)
            .flat_map(|repo| repo.commits)
            .map(|commit| commit.id)
            .collect()
    }
}

/// Index of a ticket inside its `TicketTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId(pub(crate) usize);

/// A tracker ticket. `parent` and `children` point into the owning tree.
#[derive(Debug, Clone, Default)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub commits: Vec<String>,
    /// Parent key as named by the tracker payload, whether or not it was fetched
    pub parent_key: Option<String>,
    pub parent: Option<TicketId>,
    pub children: Vec<TicketId>,
}

/// All tickets reached from one requested key. The root is the ticket for
/// that key; parents and subtasks live next to it in the same arena.
#[derive(Debug, Clone)]
pub struct TicketTree {
    pub(crate) root: TicketId,
    pub(crate) tickets: Vec<Ticket>,
}

impl TicketTree {
    pub fn root(&self) -> &Ticket {
        &self[self.root]
    }

    pub fn root_id(&self) -> TicketId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn parent_of(&self, id: TicketId) -> Option<&Ticket> {
        self[id].parent.map(|parent| &self[parent])
    }

    pub fn children_of(&self, id: TicketId) -> impl Iterator<Item = &Ticket> + '_ {
        self[id].children.iter().map(move |child| &self[*child])
    }

    /// Nested JSON view rooted at the requested ticket: the parent and the
    /// children are inlined. A ticket already written elsewhere in the document
    /// is emitted as `{"key": ...}` so back-references terminate.
    pub fn to_json(&self) -> Value {
        let mut written = HashSet::new();
        self.ticket_json(self.root, &mut written)
    }

    fn ticket_json(&self, id: TicketId, written: &mut HashSet<TicketId>) -> Value {
        let ticket = &self[id];
        if !written.insert(id) {
            return json!({ "key": ticket.key });
        }

        let parent = match ticket.parent {
            Some(parent) => self.ticket_json(parent, written),
            None => Value::Null,
        };
        let children: Vec<Value> = ticket
            .children
            .iter()
            .map(|child| self.ticket_json(*child, written))
            .collect();

        json!({
            "key": ticket.key,
            "description": ticket.description,
            "summary": ticket.summary,
            "commits": ticket.commits,
            "parent": parent,
            "children": children,
            "status": ticket.status,
        })
    }
}

impl Index<TicketId> for TicketTree {
    type Output = Ticket;

    fn index(&self, id: TicketId) -> &Ticket {
        &self.tickets[id.0]
    }
}
