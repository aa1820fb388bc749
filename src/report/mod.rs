pub mod types;

pub use types::{EncodedDiff, OutputFormat, Report};

use colored::Colorize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::diff::FileChange;
use crate::search::DecodedMetadata;
use crate::tracker::{TicketId, TicketTree};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Pair the encoder output with the paths it was built from.
pub fn encoded(changes: &[FileChange], search_text: String) -> EncodedDiff {
    EncodedDiff {
        paths: changes.iter().map(|c| c.path.clone()).collect(),
        search_text,
    }
}

/// Output the report to the terminal (default) or to a file.
///
/// Text format prints colored output to stdout, or writes Markdown when a
/// path is given. JSON goes to the same destinations.
#[instrument(skip(report), fields(tickets = report.tickets.len()))]
pub fn output(
    report: &Report,
    output_path: Option<&Path>,
    format: OutputFormat,
) -> Result<(), ReportError> {
    match (format, output_path) {
        (OutputFormat::Text, None) => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        (OutputFormat::Text, Some(path)) => {
            debug!(path = %path.display(), "writing markdown report");
            std::fs::write(path, markdown_report(report))?;
            Ok(())
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(&json_report(report))?);
            Ok(())
        }
        (OutputFormat::Json, Some(path)) => {
            debug!(path = %path.display(), "writing json report");
            std::fs::write(path, serde_json::to_string_pretty(&json_report(report))?)?;
            Ok(())
        }
    }
}

fn print_terminal_report(report: &Report) {
    if report.is_empty() {
        println!("Nothing to report.");
        return;
    }
    println!();

    if let Some(encoded) = &report.encoded {
        println!("═══ Search Text ({} files) ═══", encoded.paths.len());
        for path in &encoded.paths {
            println!("  • {}", path);
        }
        println!();
        println!("{}", encoded.search_text);
        println!();
    }

    if let Some(metadata) = &report.metadata {
        println!("═══ Similar Change ═══");
        print_list("Files", &metadata.file_names);
        print_list("Added", &metadata.added_entries);
        print_list("Deleted", &metadata.deleted_entries);
        print_list("Tickets", &metadata.jira_ids);
        println!();
    }

    if report.requested_tickets > 0 {
        println!(
            "═══ Tickets ({} of {} resolved) ═══",
            report.tickets.len(),
            report.requested_tickets
        );
        for tree in &report.tickets {
            for (depth, line) in ticket_lines(tree) {
                println!("{}{}", "  ".repeat(depth + 1), line);
            }
            println!();
        }
    }
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("{}: {}", label.bold(), "none".dimmed());
    } else {
        println!("{}:", label.bold());
        for item in items {
            println!("  • {}", item);
        }
    }
}

/// Helper to colorize a tracker status for terminal output.
fn colorize_status(status: &str) -> colored::ColoredString {
    match status.to_ascii_lowercase().as_str() {
        "done" | "closed" | "resolved" => status.green().bold(),
        "in progress" | "in review" => status.yellow().bold(),
        _ => status.normal().bold(),
    }
}

/// Indented lines for one tree: the root, its parent, then the children
/// depth-first. A ticket already shown is listed again only by key.
fn ticket_lines(tree: &TicketTree) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut shown = HashSet::new();
    push_ticket_lines(tree, tree.root_id(), 0, &mut shown, &mut lines);

    let root = tree.root();
    match (tree.parent_of(tree.root_id()), &root.parent_key) {
        (Some(parent), _) => lines.insert(
            1,
            (1, format!("parent: {} {}", parent.key.bold(), parent.summary)),
        ),
        (None, Some(parent_key)) => {
            lines.insert(1, (1, format!("parent: {} (not fetched)", parent_key)))
        }
        (None, None) => {}
    }
    lines
}

fn push_ticket_lines(
    tree: &TicketTree,
    id: TicketId,
    depth: usize,
    shown: &mut HashSet<TicketId>,
    lines: &mut Vec<(usize, String)>,
) {
    let ticket = &tree[id];
    if !shown.insert(id) {
        lines.push((depth, format!("{} (see above)", ticket.key)));
        return;
    }

    lines.push((
        depth,
        format!(
            "{} [{}] {}",
            ticket.key.bold(),
            colorize_status(&ticket.status),
            ticket.summary
        ),
    ));
    if !ticket.commits.is_empty() {
        lines.push((depth + 1, format!("commits: {}", ticket.commits.join(", "))));
    }
    for child in &ticket.children {
        push_ticket_lines(tree, *child, depth + 1, shown, lines);
    }
}

/// Write the report as Markdown.
fn markdown_report(report: &Report) -> String {
    let mut md = String::new();
    md.push_str("# Review Context\n\n");

    if let Some(encoded) = &report.encoded {
        md.push_str(&format!("## Search Text ({} files)\n\n", encoded.paths.len()));
        for path in &encoded.paths {
            md.push_str(&format!("- `{}`\n", path));
        }
        md.push_str(&format!("\n```\n{}\n```\n\n", encoded.search_text));
    }

    if let Some(metadata) = &report.metadata {
        md.push_str("## Similar Change\n\n");
        push_markdown_list(&mut md, "Files", &metadata.file_names);
        push_markdown_list(&mut md, "Added", &metadata.added_entries);
        push_markdown_list(&mut md, "Deleted", &metadata.deleted_entries);
        push_markdown_list(&mut md, "Tickets", &metadata.jira_ids);
    }

    if report.requested_tickets > 0 {
        md.push_str(&format!(
            "## Tickets ({} of {} resolved)\n\n",
            report.tickets.len(),
            report.requested_tickets
        ));
        for tree in &report.tickets {
            let root = tree.root();
            md.push_str(&format!(
                "### {}: {}\n\n**Status:** {}\n\n",
                root.key, root.summary, root.status
            ));
            if !root.description.is_empty() {
                md.push_str(&format!("{}\n\n", root.description));
            }
            if let Some(parent) = tree.parent_of(tree.root_id()) {
                md.push_str(&format!("**Parent:** {} {}\n\n", parent.key, parent.summary));
            }
            let children: Vec<String> = tree
                .children_of(tree.root_id())
                .map(|child| format!("{} [{}] {}", child.key, child.status, child.summary))
                .collect();
            push_markdown_list(&mut md, "Subtasks", &children);
            push_markdown_list(&mut md, "Commits", &root.commits);
        }
    }

    md
}

fn push_markdown_list(md: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        md.push_str(&format!("**{}:** none\n\n", label));
        return;
    }
    md.push_str(&format!("**{}:**\n\n", label));
    for item in items {
        md.push_str(&format!("- {}\n", item));
    }
    md.push('\n');
}

fn metadata_json(metadata: &DecodedMetadata) -> Value {
    json!({
        "file_names": metadata.file_names,
        "added_entries": metadata.added_entries,
        "deleted_entries": metadata.deleted_entries,
        "jira_ids": metadata.jira_ids,
    })
}

fn json_report(report: &Report) -> Value {
    let mut value = serde_json::Map::new();
    if let Some(encoded) = &report.encoded {
        value.insert(
            "search_text".to_string(),
            json!({ "files": encoded.paths, "text": encoded.search_text }),
        );
    }
    if let Some(metadata) = &report.metadata {
        value.insert("similar_change".to_string(), metadata_json(metadata));
    }
    if report.requested_tickets > 0 {
        let tickets: Vec<Value> = report.tickets.iter().map(TicketTree::to_json).collect();
        value.insert("tickets".to_string(), Value::Array(tickets));
    }
    Value::Object(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::types::Ticket;

    fn sample_tree() -> TicketTree {
        let mut root = Ticket {
            key: "LNW-2".to_string(),
            summary: "Null checks".to_string(),
            description: "Guard processData".to_string(),
            status: "In Review".to_string(),
            commits: vec!["abc123".to_string()],
            parent_key: Some("LNW-1".to_string()),
            ..Ticket::default()
        };
        root.parent = Some(TicketId(1));
        let parent = Ticket {
            key: "LNW-1".to_string(),
            summary: "Core utilities hardening".to_string(),
            status: "Done".to_string(),
            children: vec![TicketId(0)],
            ..Ticket::default()
        };
        TicketTree {
            root: TicketId(0),
            tickets: vec![root, parent],
        }
    }

    fn sample_report() -> Report {
        Report {
            encoded: Some(EncodedDiff {
                paths: vec!["src/Service.java".to_string()],
                search_text: "file_name src/Service.java".to_string(),
            }),
            metadata: Some(DecodedMetadata {
                file_names: vec!["Service.java".to_string()],
                added_entries: vec!["if(x==null)".to_string()],
                deleted_entries: vec![],
                jira_ids: vec!["LNW-2".to_string()],
            }),
            requested_tickets: 2,
            tickets: vec![sample_tree()],
        }
    }

    #[test]
    fn test_encoded_keeps_paths_in_order() {
        let changes = vec![FileChange::new("b.rs"), FileChange::new("a.rs")];
        let encoded = encoded(&changes, "text".to_string());
        assert_eq!(encoded.paths, vec!["b.rs", "a.rs"]);
        assert_eq!(encoded.search_text, "text");
    }

    #[test]
    fn test_markdown_report() {
        let md = markdown_report(&sample_report());
        assert!(md.contains("## Search Text (1 files)"));
        assert!(md.contains("- `src/Service.java`"));
        assert!(md.contains("## Similar Change"));
        assert!(md.contains("**Deleted:** none"));
        assert!(md.contains("## Tickets (1 of 2 resolved)"));
        assert!(md.contains("### LNW-2: Null checks"));
        assert!(md.contains("**Parent:** LNW-1 Core utilities hardening"));
        assert!(md.contains("- abc123"));
    }

    #[test]
    fn test_ticket_lines_order() {
        colored::control::set_override(false);
        let lines = ticket_lines(&sample_tree());
        assert_eq!(lines[0], (0, "LNW-2 [In Review] Null checks".to_string()));
        assert_eq!(lines[1], (1, "parent: LNW-1 Core utilities hardening".to_string()));
        assert_eq!(lines[2], (1, "commits: abc123".to_string()));
    }

    #[test]
    fn test_ticket_lines_mark_repeats() {
        colored::control::set_override(false);
        let mut tree = sample_tree();
        tree.root = TicketId(1);
        tree.tickets[0].children = vec![TicketId(1)];
        let lines = ticket_lines(&tree);
        assert_eq!(lines[0], (0, "LNW-1 [Done] Core utilities hardening".to_string()));
        assert_eq!(lines[1], (1, "LNW-2 [In Review] Null checks".to_string()));
        assert_eq!(lines[2], (2, "commits: abc123".to_string()));
        assert_eq!(lines[3], (2, "LNW-1 (see above)".to_string()));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_json_report_sections() {
        let value = json_report(&sample_report());
        assert_eq!(value["search_text"]["files"][0], "src/Service.java");
        assert_eq!(value["similar_change"]["jira_ids"][0], "LNW-2");
        assert_eq!(value["tickets"][0]["parent"]["key"], "LNW-1");
    }

    #[test]
    fn test_json_report_skips_untouched_sections() {
        let value = json_report(&Report::default());
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_output_to_file() {
        let path = std::env::temp_dir().join("review_context_report.md");
        output(&sample_report(), Some(&path), OutputFormat::Text).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Review Context"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_json_to_file() {
        let path = std::env::temp_dir().join("review_context_report.json");
        output(&sample_report(), Some(&path), OutputFormat::Json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["tickets"][0]["key"], "LNW-2");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_to_terminal() {
        // Should not panic
        output(&sample_report(), None, OutputFormat::Text).unwrap();
        output(&Report::default(), None, OutputFormat::Text).unwrap();
    }
}
