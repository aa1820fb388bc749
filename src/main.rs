mod config;
mod diff;
mod pr_index;
mod report;
mod search;
mod tracker;

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::pr_index::{PrIndex, PrIndexError};
use crate::report::{OutputFormat, Report};
use crate::search::DecodedMetadata;
use crate::tracker::{HttpTransport, TicketGraphFetcher};

/// Review Context — turns a diff into similarity-search text, reads hints back
/// out of search results, and builds the tracker ticket context around them.
#[derive(Parser, Debug)]
#[command(name = "review-context", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Optional output file (Markdown, or JSON with --json)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a unified diff and print the text used for embedding search
    Encode {
        /// Diff file to read; stdin when omitted
        diff: Option<PathBuf>,

        /// Use the bundled sample diff instead of reading input
        #[arg(long)]
        r#mock: bool,
    },
    /// Decode a similarity-search result into files, changed lines and tickets
    Decode {
        /// File holding the text returned by the vector store ("-" for stdin)
        result: PathBuf,

        /// Also fetch the tickets the result resolves to
        #[arg(long)]
        with_tickets: bool,
    },
    /// Fetch ticket trees (parent, subtasks, commits) from the tracker
    Tickets {
        /// Ticket keys, e.g. LNW-1234
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = Config::load()?;

    let report = match cli.command {
        Command::Encode { diff: diff_path, r#mock } => {
            let _span = info_span!("encode", mock = r#mock).entered();
            let diff_text = if r#mock {
                info!("using bundled sample diff");
                include_str!("../tests/fixtures/sample_diff.patch").to_string()
            } else {
                read_input(diff_path.as_deref())?
            };

            let changes = diff::parse(&diff_text, &config.diff.exclude_patterns);
            info!(files = changes.len(), "parsed diff");
            let search_text = search::encode(&changes);
            debug!(chars = search_text.len(), "encoded search text");

            Report {
                encoded: Some(report::encoded(&changes, search_text)),
                ..Report::default()
            }
        }
        Command::Decode { result, with_tickets } => {
            let path = (result.as_os_str() != "-").then_some(result.as_path());
            let raw = read_input(path)?;

            let metadata = decode_result(raw.trim_end(), &config.pr_index.path)?;
            info!(
                files = metadata.file_names.len(),
                tickets = metadata.jira_ids.len(),
                "decoded search result"
            );

            let mut report = Report::default();
            if with_tickets {
                let keys = metadata.jira_ids.clone();
                fetch_into(&mut report, &config, &keys).await?;
            }
            report.metadata = Some(metadata);
            report
        }
        Command::Tickets { keys } => {
            let mut report = Report::default();
            fetch_into(&mut report, &config, &keys).await?;
            report
        }
    };

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    report::output(&report, cli.output.as_deref(), format)?;
    info!("done");

    Ok(())
}

/// Decode a search result, loading the PR index only when the result names
/// a stored diff.
fn decode_result(raw: &str, index_path: &Path) -> Result<DecodedMetadata, PrIndexError> {
    let scanned = search::scan(raw);
    if scanned.diff_names.is_empty() {
        debug!("no diff names in result, PR index not loaded");
        return Ok(scanned.metadata);
    }

    info!(path = %index_path.display(), "loading PR index");
    let index = PrIndex::load(index_path)?;
    Ok(search::decode(raw, &index))
}

/// Fetch ticket trees for `keys` and store them on the report.
async fn fetch_into(
    report: &mut Report,
    config: &Config,
    keys: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut distinct: Vec<&String> = keys.iter().collect();
    distinct.sort();
    distinct.dedup();
    report.requested_tickets = distinct.len();
    if keys.is_empty() {
        info!("no ticket keys to fetch");
        return Ok(());
    }

    let transport = HttpTransport::new(&config.tracker)?;
    let fetcher = TicketGraphFetcher::new(Arc::new(transport), config.tracker_concurrency());
    info!(keys = keys.len(), "fetching tickets from tracker");
    report.tickets = fetcher.fetch(keys).await;
    Ok(())
}

/// Read a file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<String, std::io::Error> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}
