use std::path::PathBuf;

use grepvault_progress::{ProgressEvent, ProgressSink};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{AggregationController, Pacer, SessionReport, SleepPacer};
use crate::config::SearchConfig;
use crate::error::{VaultError, VaultResult};
use crate::export::{Exporter, preview};
use crate::fetch::{PageFetcher, PageSource};
use crate::model::{ExportRow, SearchQuery};

/// Everything a front end needs after a search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub csv_path: PathBuf,
    pub preview: Vec<ExportRow>,
    pub total_label: String,
    pub status: String,
    pub report: SessionReport,
}

pub fn total_label(total_results: u64) -> String {
    format!("**Total Results: {total_results}**")
}

pub fn status_message(preview_limit: usize, total_results: u64) -> String {
    format!(
        "Displaying top {preview_limit} unique results. Download the CSV for all {total_results} results."
    )
}

/// Run a full session against the configured endpoint, pausing between
/// pages, and export the results to `config.output`.
pub fn search(
    query: &SearchQuery,
    config: &SearchConfig,
    progress: &mut dyn ProgressSink,
) -> VaultResult<SearchOutcome> {
    config.validate()?;
    let fetcher = PageFetcher::from_config(config)?;
    search_with(fetcher, SleepPacer, query, config, progress)
}

pub fn search_with<S: PageSource, P: Pacer>(
    source: S,
    pacer: P,
    query: &SearchQuery,
    config: &SearchConfig,
    progress: &mut dyn ProgressSink,
) -> VaultResult<SearchOutcome> {
    config.validate()?;
    if query.query.is_empty() {
        return Err(VaultError::Config("query must not be empty".into()));
    }

    info!("searching for {:?}", query.query);
    let mut controller = AggregationController::new(source, pacer, config);
    let aggregate = controller.run(query, progress)?;

    progress.on_event(&ProgressEvent::Exporting {
        rows: aggregate.report.lines,
    });
    let rows = Exporter::new(&query.query).export(&aggregate.hits, &config.output)?;
    let total = aggregate.report.total_results;

    progress.on_event(&ProgressEvent::Finished {
        pages: aggregate.report.pages_fetched,
        total_results: total,
    });

    Ok(SearchOutcome {
        csv_path: config.output.clone(),
        preview: preview(&rows, config.preview_limit),
        total_label: total_label(total),
        status: status_message(config.preview_limit, total),
        report: aggregate.report,
    })
}
