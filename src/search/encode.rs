use serde_json::{json, Value};

use super::{ADDED_LINES_KEY, DELETED_LINES_KEY, FILE_NAME_KEY, PARENT_ID_KEY};
use crate::diff::FileChange;

/// Removed from the serialized records, in this order. `\\t` is the two
/// character JSON escape, not a tab.
const NOISE: &[&str] = &[" ", "[", "]", "'", "\"", "\\t", "{", "}"];

/// Flatten parsed changes into the minified text that gets embedded.
///
/// Each change becomes `{file_name, added_lines, deleted_lines,
/// parent_jira_id}`; the list is serialized as compact JSON, the noise
/// characters are stripped and `:` separators become single spaces.
/// The result cannot be parsed back unambiguously; see `decode`.
pub fn encode(changes: &[FileChange]) -> String {
    let records: Vec<Value> = changes
        .iter()
        .map(|change| {
            json!({
                FILE_NAME_KEY: change.path,
                ADDED_LINES_KEY: change.added_lines,
                DELETED_LINES_KEY: change.deleted_lines,
                PARENT_ID_KEY: change.base_revision,
            })
        })
        .collect();

    let mut minified = Value::Array(records).to_string();
    for noise in NOISE {
        minified = minified.replace(noise, "");
    }
    minified.replace(':', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, added: &[&str], deleted: &[&str], rev: &str) -> FileChange {
        FileChange {
            path: path.to_string(),
            added_lines: added.iter().map(|l| l.to_string()).collect(),
            deleted_lines: deleted.iter().map(|l| l.to_string()).collect(),
            base_revision: rev.to_string(),
        }
    }

    #[test]
    fn test_encode_single_change() {
        let text = encode(&[change(
            "src/Service.java",
            &["if (x == null) {", "return;"],
            &["x.run();"],
            "abc123",
        )]);
        assert_eq!(
            text,
            "file_name src/Service.java,added_lines if(x==null),return;,deleted_lines x.run();,parent_jira_id abc123"
        );
    }

    #[test]
    fn test_encode_strips_escaped_tabs_and_colons() {
        let text = encode(&[change("a.py", &["\tkey: 'value'"], &[], "")]);
        assert_eq!(
            text,
            "file_name a.py,added_lines key value,deleted_lines ,parent_jira_id "
        );
    }

    #[test]
    fn test_encode_multiple_changes_in_order() {
        let text = encode(&[change("b.rs", &[], &[], "1"), change("a.rs", &[], &[], "2")]);
        let b = text.find("file_name b.rs").unwrap();
        let a = text.find("file_name a.rs").unwrap();
        assert!(b < a);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let changes = vec![change("x.rs", &["let a = 1;"], &["let a = 2;"], "ff00")];
        assert_eq!(encode(&changes), encode(&changes));
    }

    #[test]
    fn test_encode_empty_list() {
        assert_eq!(encode(&[]), "");
    }
}
