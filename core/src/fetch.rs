use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{PAGE_SIZE, SearchConfig};
use crate::error::VaultResult;
use crate::model::SearchQuery;
use crate::store::HitStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageStatus {
    #[default]
    Complete,
    /// The request failed or the endpoint answered with a non-success
    /// status. Nothing is known about later pages.
    Failed(String),
    /// The body decoded but a snippet did not parse. The page's hits are
    /// dropped; `next_page` still follows the reported count.
    Malformed(String),
}

/// Outcome of one page request.
#[derive(Debug, Default)]
pub struct PageResult {
    pub next_page: Option<u32>,
    pub hits: HitStore,
    /// Query-wide total as reported by the index on this page.
    pub total_count: u64,
    pub status: PageStatus,
}

impl PageResult {
    /// Empty page that ends pagination because it could not be fetched.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: PageStatus::Failed(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == PageStatus::Complete
    }
}

/// Source of result pages, one call per page.
pub trait PageSource {
    fn fetch_page(&self, page: u32, query: &SearchQuery) -> VaultResult<PageResult>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET against the search endpoint.
pub trait SearchTransport {
    fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> VaultResult<RawResponse>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> VaultResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("grepvault/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl SearchTransport for HttpTransport {
    fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> VaultResult<RawResponse> {
        let response = self.client.get(endpoint).query(params).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(RawResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    facets: Facets,
    hits: HitList,
}

#[derive(Debug, Deserialize)]
struct Facets {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct HitList {
    #[serde(default)]
    hits: Vec<HitEntry>,
}

#[derive(Debug, Deserialize)]
struct HitEntry {
    repo: RawField,
    path: RawField,
    content: SnippetField,
}

#[derive(Debug, Deserialize)]
struct RawField {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct SnippetField {
    snippet: String,
}

/// Request parameters for `page`. Regex mode suppresses whole-word mode.
pub fn query_params(page: u32, query: &SearchQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("q", query.query.clone()), ("page", page.to_string())];

    if query.use_regex {
        params.push(("regexp", "true".to_string()));
    } else if query.whole_words {
        params.push(("words", "true".to_string()));
    }
    if query.case_sensitive {
        params.push(("case", "true".to_string()));
    }
    if let Some(pattern) = non_empty(query.repo_filter.as_deref()) {
        params.push(("f.repo.pattern", pattern.to_string()));
    }
    if let Some(pattern) = non_empty(query.path_filter.as_deref()) {
        params.push(("f.path.pattern", pattern.to_string()));
    }

    params
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Next page number when `count` results do not fit in `page` windows.
pub fn next_page(count: u64, page: u32, page_size: u32) -> Option<u32> {
    if count > u64::from(page_size) * u64::from(page) {
        Some(page + 1)
    } else {
        None
    }
}

pub struct PageFetcher<T> {
    transport: T,
    endpoint: String,
    page_size: u32,
}

impl PageFetcher<HttpTransport> {
    pub fn from_config(config: &SearchConfig) -> VaultResult<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(transport, config.endpoint.clone(), config.page_size))
    }
}

impl<T: SearchTransport> PageFetcher<T> {
    pub fn new(transport: T, endpoint: impl Into<String>, page_size: u32) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            page_size,
        }
    }

    pub fn with_default_page_size(transport: T, endpoint: impl Into<String>) -> Self {
        Self::new(transport, endpoint, PAGE_SIZE)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: SearchTransport> PageSource for PageFetcher<T> {
    fn fetch_page(&self, page: u32, query: &SearchQuery) -> VaultResult<PageResult> {
        let params = query_params(page, query);
        debug!("fetching page {page} from {}", self.endpoint);

        let response = match self.transport.get(&self.endpoint, &params) {
            Ok(resp) => resp,
            Err(err) => {
                warn!("page {page}: request failed, ending pagination: {err}");
                return Ok(PageResult::failed(err.to_string()));
            }
        };

        if !response.is_success() {
            warn!(
                "page {page}: endpoint returned status {}, ending pagination",
                response.status
            );
            return Ok(PageResult::failed(format!(
                "endpoint returned status {}",
                response.status
            )));
        }

        let data: SearchResponse = serde_json::from_str(&response.body)?;
        let total_count = data.facets.count;
        let next = next_page(total_count, page, self.page_size);

        let mut hits = HitStore::new();
        for entry in &data.hits.hits {
            if let Err(err) = hits.add(&entry.repo.raw, &entry.path.raw, &entry.content.snippet) {
                warn!(
                    "page {page}: {}:{}: {err}, dropping page",
                    entry.repo.raw, entry.path.raw
                );
                return Ok(PageResult {
                    next_page: next,
                    hits: HitStore::new(),
                    total_count,
                    status: PageStatus::Malformed(err.to_string()),
                });
            }
        }
        debug!(
            "page {page}: {} entries, {} matched lines, reported count {total_count}, next {:?}",
            data.hits.hits.len(),
            hits.line_count(),
            next
        );

        Ok(PageResult {
            next_page: next,
            hits,
            total_count,
            status: PageStatus::Complete,
        })
    }
}
