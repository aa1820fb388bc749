/// One file's worth of changes extracted from a unified diff.
/// Populated by the line scanner in codec.rs and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChange {
    /// Path taken from the `diff --git` boundary line (e.g., "src/auth/config.rs")
    pub path: String,
    /// Lines added in this file, without the leading '+'
    pub added_lines: Vec<String>,
    /// Lines deleted in this file, without the leading '-'
    pub deleted_lines: Vec<String>,
    /// Old blob id from the `index` line, empty when the diff has none
    pub base_revision: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// True when `path` contains any of the given substrings (case-sensitive).
    pub fn is_excluded(&self, patterns: &[String]) -> bool {
        patterns
            .iter()
            .any(|pattern| self.path.contains(pattern.as_str()))
    }
}
