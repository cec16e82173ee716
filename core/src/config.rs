use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::error::{VaultError, VaultResult};

pub const DEFAULT_ENDPOINT: &str = "https://grep.app/api/search";
pub const DEFAULT_EXPORT_FILE: &str = "search_results.csv";
pub const PAGE_SIZE: u32 = 10;
pub const MAX_PAGES: u32 = 100;
pub const PREVIEW_LIMIT: usize = 6;

/// How per-page reported counts are combined into the session total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountPolicy {
    /// Add every page's reported count. The index reports the same
    /// query-wide total on each page, so this counts it once per page.
    #[default]
    LegacySum,
    /// Keep the count reported by the first successful page.
    FirstPage,
}

impl CountPolicy {
    pub fn parse(value: &str) -> VaultResult<Self> {
        match value {
            "legacy-sum" => Ok(CountPolicy::LegacySum),
            "first-page" => Ok(CountPolicy::FirstPage),
            other => Err(VaultError::Config(format!(
                "unknown count policy '{other}' (expected legacy-sum or first-page)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub page_delay: Duration,
    pub request_timeout: Duration,
    pub preview_limit: usize,
    pub count_policy: CountPolicy,
    pub output: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: PAGE_SIZE,
            max_pages: MAX_PAGES,
            page_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            preview_limit: PREVIEW_LIMIT,
            count_policy: CountPolicy::default(),
            output: PathBuf::from(DEFAULT_EXPORT_FILE),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> VaultResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(VaultError::Config("endpoint must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(VaultError::Config("page size must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(VaultError::Config("page ceiling must be at least 1".into()));
        }
        Ok(())
    }
}
