use super::types::FileChange;

/// Parse a unified diff string into the ordered list of per-file changes,
/// dropping every file whose path contains one of `exclude_patterns`.
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// and may carry an index line whose old blob id becomes `base_revision`:
///   index {old}..{new} {mode}
///
/// Hunk headers (`@@ ... @@`) are skipped. Every other line starting with
/// '+' or '-' (and longer than the marker itself) is recorded verbatim minus
/// the marker, so the `+++`/`---` file headers land in the line lists too.
///
/// Input without any boundary line yields an empty list.
pub fn parse(raw_diff: &str, exclude_patterns: &[String]) -> Vec<FileChange> {
    let mut files = Vec::new();
    let mut current_file: Option<FileChange> = None;

    let finish_file = |files: &mut Vec<FileChange>, file: &mut Option<FileChange>| {
        if let Some(file) = file.take() {
            if !file.path.is_empty() && !file.is_excluded(exclude_patterns) {
                files.push(file);
            }
        }
    };

    for line in raw_diff.lines() {
        if line.starts_with("diff --git") {
            finish_file(&mut files, &mut current_file);
            current_file = Some(FileChange::new(boundary_path(line)));
            continue;
        }

        if line.starts_with("@@") {
            continue;
        }

        let Some(file) = current_file.as_mut() else {
            continue;
        };

        if let Some(added) = line.strip_prefix('+').filter(|rest| !rest.is_empty()) {
            file.added_lines.push(added.to_string());
        } else if let Some(deleted) = line.strip_prefix('-').filter(|rest| !rest.is_empty()) {
            file.deleted_lines.push(deleted.to_string());
        } else if line.starts_with("index ") {
            file.base_revision = base_revision(line);
        }
    }

    finish_file(&mut files, &mut current_file);
    files
}

/// The last token of the boundary line with its `a/` or `b/` prefix removed.
fn boundary_path(line: &str) -> String {
    let token = line.split_whitespace().last().unwrap_or_default();
    token.chars().skip(2).collect()
}

fn base_revision(line: &str) -> String {
    line.split_whitespace()
        .nth(1)
        .and_then(|range| range.split("..").next())
        .unwrap_or_default()
        .to_string()
}
