use std::ops::Range;

use serde::Serialize;

/// One matched source line, markup removed.
///
/// `spans` are byte ranges into `text` covering the highlighted parts of
/// the line, in order and non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedLine {
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

impl MatchedLine {
    pub fn matched_fragments(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().filter_map(|span| self.text.get(span.clone()))
    }
}

/// Borrowed view of one entry in a `HitStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'a> {
    pub repository: &'a str,
    pub path: &'a str,
    pub line_number: &'a str,
    pub line: &'a MatchedLine,
}

/// Search flags and filters sent with every page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub use_regex: bool,
    pub whole_words: bool,
    pub case_sensitive: bool,
    pub repo_filter: Option<String>,
    pub path_filter: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Flattened CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Line Number")]
    pub line_number: String,
    #[serde(rename = "Extracted Query")]
    pub extracted_query: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Path")]
    pub path: String,
}
