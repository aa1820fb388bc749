pub mod codec;
pub mod types;

pub use codec::parse;
pub use types::FileChange;

/// Path fragments skipped unless the config file says otherwise.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["DAO", ".xml"];
