use tracing::debug;

use super::{ADDED_LINES_KEY, DELETED_LINES_KEY, DIFF_NAME_KEY, FILE_NAME_KEY, PARENT_ID_KEY};
use crate::pr_index::PrIndex;

/// Structured hints recovered from a similarity-search result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMetadata {
    pub file_names: Vec<String>,
    pub added_entries: Vec<String>,
    pub deleted_entries: Vec<String>,
    /// Ticket ids resolved from the `diff_name` of the matched document
    pub jira_ids: Vec<String>,
}

/// Decoder state between two comma-separated segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Idle,
    Adding,
    Deleting,
    /// A `diff_name` segment was seen; nothing after it is read.
    Done,
}

/// What a segment looks like, judged only by its leading token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    FileName,
    AddedLines,
    DeletedLines,
    DiffName,
    ParentId,
    Content,
}

impl Segment {
    fn classify(segment: &str) -> Self {
        if segment.starts_with(FILE_NAME_KEY) {
            Segment::FileName
        } else if segment.starts_with(ADDED_LINES_KEY) {
            Segment::AddedLines
        } else if segment.starts_with(DELETED_LINES_KEY) {
            Segment::DeletedLines
        } else if segment.starts_with(DIFF_NAME_KEY) {
            Segment::DiffName
        } else if segment.starts_with(PARENT_ID_KEY) {
            Segment::ParentId
        } else {
            Segment::Content
        }
    }
}

/// Side effect of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    RecordFileName,
    RecordAddedMarker,
    RecordDeletedMarker,
    RecordDiffName,
    AppendAdded,
    AppendDeleted,
    Discard,
}

/// Transition table. A repeated `added_lines` while already adding (or
/// `deleted_lines` while deleting) is treated as plain content.
fn transition(state: DecodeState, segment: Segment) -> (DecodeState, Action) {
    use DecodeState::*;

    match (state, segment) {
        (Done, _) => (Done, Action::Discard),
        (_, Segment::FileName) => (Idle, Action::RecordFileName),
        (Adding, Segment::AddedLines) => (Adding, Action::AppendAdded),
        (_, Segment::AddedLines) => (Adding, Action::RecordAddedMarker),
        (Deleting, Segment::DeletedLines) => (Deleting, Action::AppendDeleted),
        (_, Segment::DeletedLines) => (Deleting, Action::RecordDeletedMarker),
        (_, Segment::DiffName) => (Done, Action::RecordDiffName),
        (_, Segment::ParentId) => (Idle, Action::Discard),
        (Adding, Segment::Content) => (Adding, Action::AppendAdded),
        (Deleting, Segment::Content) => (Deleting, Action::AppendDeleted),
        (Idle, Segment::Content) => (Idle, Action::Discard),
    }
}

/// Segments read from a search result, before diff names are resolved to
/// ticket ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedResult {
    pub metadata: DecodedMetadata,
    /// `diff_name` values in the order they were read
    pub diff_names: Vec<String>,
}

impl ScannedResult {
    /// Resolve the collected diff names through `index`. Misses contribute
    /// nothing.
    pub fn resolve(self, index: &PrIndex) -> DecodedMetadata {
        let mut decoded = self.metadata;
        for diff_name in &self.diff_names {
            match index.find_ticket_ids(diff_name) {
                Some(ids) => decoded.jira_ids.extend(ids),
                None => debug!(diff_name = %diff_name, "no PR record for diff"),
            }
        }
        decoded
    }
}

/// Run the segment state machine over `raw_text` without touching the PR
/// index. Every segment after the first `diff_name` is ignored.
pub fn scan(raw_text: &str) -> ScannedResult {
    let mut scanned = ScannedResult::default();
    let decoded = &mut scanned.metadata;
    let mut state = DecodeState::Idle;

    for segment in raw_text.split(',') {
        let (next, action) = transition(state, Segment::classify(segment));
        match action {
            Action::RecordFileName => decoded
                .file_names
                .push(after_first(segment, &format!("{FILE_NAME_KEY} ")).to_string()),
            Action::RecordAddedMarker => {
                push_marker_value(&mut decoded.added_entries, segment, ADDED_LINES_KEY, "++")
            }
            Action::RecordDeletedMarker => {
                push_marker_value(&mut decoded.deleted_entries, segment, DELETED_LINES_KEY, "--")
            }
            Action::RecordDiffName => scanned
                .diff_names
                .push(after_first(segment, &format!("{DIFF_NAME_KEY} ")).to_string()),
            Action::AppendAdded => decoded.added_entries.push(segment.to_string()),
            Action::AppendDeleted => decoded.deleted_entries.push(segment.to_string()),
            Action::Discard => {}
        }
        state = next;
        if state == DecodeState::Done {
            break;
        }
    }

    debug!(
        files = scanned.metadata.file_names.len(),
        added = scanned.metadata.added_entries.len(),
        deleted = scanned.metadata.deleted_entries.len(),
        diff_names = scanned.diff_names.len(),
        "scanned search result"
    );
    scanned
}

/// Reconstruct file names, added/deleted entries and ticket ids from the
/// free-form text a similarity search returned.
///
/// This is best effort: content that happens to start with a record key is
/// taken for a key. Every segment after the first `diff_name` is ignored, and
/// the collected diff names are resolved to ticket ids through `index`.
pub fn decode(raw_text: &str, index: &PrIndex) -> DecodedMetadata {
    scan(raw_text).resolve(index)
}

fn after_first<'a>(segment: &'a str, needle: &str) -> &'a str {
    segment
        .split_once(needle)
        .map(|(_, rest)| rest)
        .unwrap_or(segment)
}

/// Stored documents carry the `++`/`--` of the diff header right after the
/// key; text produced by `encode` has only the key and a space. Operators
/// inside the line itself are content.
fn push_marker_value(entries: &mut Vec<String>, segment: &str, key: &str, marker: &str) {
    let rest = segment.strip_prefix(key).unwrap_or(segment);
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    let value = rest.strip_prefix(marker).unwrap_or(rest);
    if !value.is_empty() {
        entries.push(value.to_string());
    }
}
