//! Lossy text form of parsed diffs for embedding search, and the heuristic
//! decoder that reads structured hints back out of search results.

pub mod decode;
pub mod encode;

pub use decode::{decode, scan, DecodedMetadata};
pub use encode::encode;

/// Record keys written by the encoder and recognized by the decoder.
pub(crate) const FILE_NAME_KEY: &str = "file_name";
pub(crate) const ADDED_LINES_KEY: &str = "added_lines";
pub(crate) const DELETED_LINES_KEY: &str = "deleted_lines";
pub(crate) const PARENT_ID_KEY: &str = "parent_jira_id";
pub(crate) const DIFF_NAME_KEY: &str = "diff_name";
