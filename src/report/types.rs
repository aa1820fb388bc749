use crate::search::DecodedMetadata;
use crate::tracker::TicketTree;

/// Encoder output together with the files that went into it.
#[derive(Debug, Clone)]
pub struct EncodedDiff {
    /// Paths kept after exclusion, in diff order
    pub paths: Vec<String>,
    /// Text handed to the embedding store
    pub search_text: String,
}

/// Everything one command produced. Sections a command doesn't touch stay
/// empty and are not rendered.
#[derive(Debug, Default)]
pub struct Report {
    pub encoded: Option<EncodedDiff>,
    pub metadata: Option<DecodedMetadata>,
    /// Number of distinct ticket keys that were asked for
    pub requested_tickets: usize,
    pub tickets: Vec<TicketTree>,
}

/// How a report is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored terminal text, or Markdown when written to a file
    Text,
    Json,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.encoded.is_none() && self.metadata.is_none() && self.requested_tickets == 0
    }
}
