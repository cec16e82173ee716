//! Progress events emitted while a search session walks result pages.
//!
//! The engine never assumes how progress is displayed. It hands every
//! event to a [`ProgressSink`]; each event can be reduced to a fraction
//! in `[0, 1]` plus a short label.

use serde::Serialize;

pub const FETCH_LABEL: &str = "Fetching data...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// About to request `page` out of at most `max_pages`.
    Fetching { page: u32, max_pages: u32 },
    /// A page was fetched and merged.
    Fetched {
        page: u32,
        max_pages: u32,
        lines: usize,
        reported_count: u64,
    },
    /// A page could not be processed and was dropped.
    Skipped {
        page: u32,
        max_pages: u32,
        reason: String,
    },
    /// A page request failed; pagination stops here.
    Failed {
        page: u32,
        max_pages: u32,
        reason: String,
    },
    /// Writing the export file.
    Exporting { rows: usize },
    Finished { pages: u32, total_results: u64 },
}

impl ProgressEvent {
    pub fn fraction(&self) -> f64 {
        match self {
            ProgressEvent::Fetching { page, max_pages }
            | ProgressEvent::Fetched {
                page, max_pages, ..
            }
            | ProgressEvent::Skipped {
                page, max_pages, ..
            }
            | ProgressEvent::Failed {
                page, max_pages, ..
            } => ratio(*page, *max_pages),
            ProgressEvent::Exporting { .. } | ProgressEvent::Finished { .. } => 1.0,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ProgressEvent::Fetching { .. } => FETCH_LABEL.to_string(),
            ProgressEvent::Fetched {
                page,
                lines,
                reported_count,
                ..
            } => format!("Page {page}: {lines} matched lines ({reported_count} reported)"),
            ProgressEvent::Skipped { page, reason, .. } => format!("Page {page} skipped: {reason}"),
            ProgressEvent::Failed { page, reason, .. } => format!("Page {page} failed: {reason}"),
            ProgressEvent::Exporting { rows } => format!("Exporting {rows} rows..."),
            ProgressEvent::Finished {
                pages,
                total_results,
            } => format!("Done after {pages} pages, {total_results} results"),
        }
    }
}

fn ratio(page: u32, max_pages: u32) -> f64 {
    if max_pages == 0 {
        return 1.0;
    }
    (f64::from(page) / f64::from(max_pages)).clamp(0.0, 1.0)
}

pub trait ProgressSink {
    fn on_event(&mut self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_event(&mut self, _event: &ProgressEvent) {}
}

/// Collects events, mostly useful in tests.
impl ProgressSink for Vec<ProgressEvent> {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.push(event.clone());
    }
}

/// Adapts a `(fraction, label)` callback.
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: FnMut(f64, &str),
{
    fn on_event(&mut self, event: &ProgressEvent) {
        (self.0)(event.fraction(), &event.label());
    }
}
