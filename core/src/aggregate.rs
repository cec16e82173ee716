use std::time::Duration;

use grepvault_progress::{ProgressEvent, ProgressSink};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CountPolicy, SearchConfig};
use crate::error::VaultResult;
use crate::fetch::{PageSource, PageStatus};
use crate::model::SearchQuery;
use crate::store::HitStore;

/// Pause between two page requests.
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pause(&mut self, _delay: Duration) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub pages_fetched: u32,
    /// Pages dropped because their body or a snippet was malformed.
    pub pages_skipped: Vec<u32>,
    /// Pages whose request failed; the last entry ended pagination.
    pub pages_failed: Vec<u32>,
    pub total_results: u64,
    pub repositories: usize,
    pub files: usize,
    pub lines: usize,
}

#[derive(Debug)]
pub struct Aggregate {
    pub hits: HitStore,
    pub report: SessionReport,
}

/// Walks result pages one at a time and merges them into a single store.
pub struct AggregationController<S, P> {
    source: S,
    pacer: P,
    max_pages: u32,
    page_delay: Duration,
    count_policy: CountPolicy,
}

impl<S: PageSource, P: Pacer> AggregationController<S, P> {
    pub fn new(source: S, pacer: P, config: &SearchConfig) -> Self {
        Self {
            source,
            pacer,
            max_pages: config.max_pages,
            page_delay: config.page_delay,
            count_policy: config.count_policy,
        }
    }

    pub fn run(
        &mut self,
        query: &SearchQuery,
        progress: &mut dyn ProgressSink,
    ) -> VaultResult<Aggregate> {
        let mut hits = HitStore::new();
        let mut report = SessionReport::default();
        let mut counted = false;
        let mut next = Some(1u32);

        while let Some(page) = next {
            if page > self.max_pages {
                info!("page ceiling {} reached, stopping", self.max_pages);
                break;
            }

            progress.on_event(&ProgressEvent::Fetching {
                page,
                max_pages: self.max_pages,
            });

            match self.source.fetch_page(page, query) {
                Ok(result) => match result.status {
                    PageStatus::Complete => {
                        report.pages_fetched += 1;
                        let lines = result.hits.line_count();
                        match self.count_policy {
                            CountPolicy::LegacySum => report.total_results += result.total_count,
                            CountPolicy::FirstPage => {
                                if !counted {
                                    report.total_results = result.total_count;
                                }
                            }
                        }
                        counted = true;
                        hits.merge(result.hits);
                        progress.on_event(&ProgressEvent::Fetched {
                            page,
                            max_pages: self.max_pages,
                            lines,
                            reported_count: result.total_count,
                        });
                        next = result.next_page;
                    }
                    PageStatus::Malformed(reason) => {
                        warn!("page {page}: dropped malformed page: {reason}");
                        report.pages_skipped.push(page);
                        progress.on_event(&ProgressEvent::Skipped {
                            page,
                            max_pages: self.max_pages,
                            reason,
                        });
                        next = result.next_page;
                    }
                    PageStatus::Failed(reason) => {
                        report.pages_failed.push(page);
                        progress.on_event(&ProgressEvent::Failed {
                            page,
                            max_pages: self.max_pages,
                            reason,
                        });
                        next = None;
                    }
                },
                // Undecodable body: no count, so no next page either.
                Err(err) if err.is_malformed_page() => {
                    warn!("page {page}: dropped malformed page, ending pagination: {err}");
                    report.pages_skipped.push(page);
                    progress.on_event(&ProgressEvent::Skipped {
                        page,
                        max_pages: self.max_pages,
                        reason: err.to_string(),
                    });
                    next = None;
                }
                Err(err) => return Err(err),
            }

            if next.is_some_and(|p| p <= self.max_pages) {
                debug!("pausing {:?} before next page", self.page_delay);
                self.pacer.pause(self.page_delay);
            }
        }

        report.repositories = hits.repository_count();
        report.files = hits.file_count();
        report.lines = hits.line_count();
        info!(
            "fetched {} pages ({} skipped, {} failed): {} lines in {} files across {} repositories",
            report.pages_fetched,
            report.pages_skipped.len(),
            report.pages_failed.len(),
            report.lines,
            report.files,
            report.repositories
        );

        Ok(Aggregate { hits, report })
    }

    pub fn into_parts(self) -> (S, P) {
        (self.source, self.pacer)
    }
}
