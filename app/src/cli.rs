use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use grepvault_core::config::DEFAULT_ENDPOINT;
use grepvault_core::{CountPolicy, ExportRow, SearchConfig, SearchOutcome, SearchQuery, search};
use grepvault_progress::{ProgressEvent, ProgressSink};
use tokio::task;
use tracing::{debug, error, info};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,
    /// Treat the query as a regular expression
    #[arg(long)]
    pub regex: bool,
    /// Match whole words only (ignored together with --regex)
    #[arg(long)]
    pub whole_words: bool,
    /// Case sensitive search
    #[arg(long)]
    pub case_sensitive: bool,
    /// Repository filter pattern, e.g. `user/repo`
    #[arg(long = "repo")]
    pub repo_filter: Option<String>,
    /// Path filter pattern, e.g. `src/`
    #[arg(long = "path")]
    pub path_filter: Option<String>,
    /// CSV file to write
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Search endpoint (defaults to GREPVAULT_ENDPOINT or grep.app)
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Maximum number of pages to fetch
    #[arg(long = "max-pages")]
    pub max_pages: Option<u32>,
    /// Delay between page requests in milliseconds
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,
    /// How page counts add up: legacy-sum or first-page
    #[arg(long = "count-policy", default_value = "legacy-sum")]
    pub count_policy: String,
    /// Print the outcome as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn default_endpoint() -> String {
    match std::env::var("GREPVAULT_ENDPOINT") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}

/// Base configuration shared by the CLI and the MCP server.
pub fn base_config(endpoint: Option<String>, delay_ms: Option<u64>) -> SearchConfig {
    let mut config = SearchConfig {
        endpoint: endpoint.unwrap_or_else(default_endpoint),
        ..SearchConfig::default()
    };
    if let Some(ms) = delay_ms {
        config.page_delay = Duration::from_millis(ms);
    }
    config
}

/// Initialize tracing for the `search` command.
///
/// Logs go to stderr, and respect RUST_LOG or default to `info`.
pub fn init_tracing_cli() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize tracing for the MCP server.
///
/// - Never logs to stdout (to keep stdio clean for JSON-RPC).
/// - If `GREPVAULT_LOG_PATH` is set, append logs to that file.
/// - If not set or the file cannot be opened, logging is disabled.
pub fn init_tracing_server() {
    use std::fs::OpenOptions;
    use tracing_subscriber::{EnvFilter, fmt};

    let path = match std::env::var("GREPVAULT_LOG_PATH") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => return,
    };

    if OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .is_err()
    {
        return;
    }

    let make_writer = move || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .expect("failed to open GREPVAULT_LOG_PATH for logging")
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(make_writer)
        .init();
}

/// Forwards progress to the log.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Skipped { .. }
            | ProgressEvent::Failed { .. }
            | ProgressEvent::Finished { .. } => {
                info!("[{:>3.0}%] {}", event.fraction() * 100.0, event.label())
            }
            _ => debug!("[{:>3.0}%] {}", event.fraction() * 100.0, event.label()),
        }
    }
}

pub async fn run_search(args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let count_policy = match CountPolicy::parse(&args.count_policy) {
        Ok(policy) => policy,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    if args.query.trim().is_empty() {
        error!("Search query must not be empty");
        std::process::exit(1);
    }

    let mut config = base_config(args.endpoint, args.delay_ms);
    config.count_policy = count_policy;
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(output) = args.output {
        config.output = output;
    }

    let query = SearchQuery {
        query: args.query,
        use_regex: args.regex,
        whole_words: args.whole_words,
        case_sensitive: args.case_sensitive,
        repo_filter: args.repo_filter,
        path_filter: args.path_filter,
    };

    let outcome = task::spawn_blocking(move || search(&query, &config, &mut LogProgress)).await?;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Search failed: {err}");
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) {
    println!("{}", outcome.total_label);
    println!("CSV: {}", outcome.csv_path.display());
    if !outcome.preview.is_empty() {
        println!();
        println!("Repository | Line Number | Extracted Query | Content | Path");
        for row in &outcome.preview {
            println!("{}", format_row(row));
        }
        println!();
    }
    println!("{}", outcome.status);
}

fn format_row(row: &ExportRow) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        row.repository,
        row.line_number,
        row.extracted_query,
        row.content.trim(),
        row.path
    )
}
