use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::model::MatchedLine;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static LINE_NO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.lineno").expect("static selector"));
static CODE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("pre").expect("static selector"));
static MARK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("mark").expect("static selector"));

/// Pair of random tokens used to render match boundaries into plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMarkers {
    pub open: String,
    pub close: String,
}

impl BoundaryMarkers {
    pub fn generate() -> Self {
        Self {
            open: Uuid::new_v4().to_string(),
            close: Uuid::new_v4().to_string(),
        }
    }

    /// Rebuild the line with `open` before and `close` after every span.
    pub fn render(&self, line: &MatchedLine) -> String {
        let mut out = String::with_capacity(
            line.text.len() + line.spans.len() * (self.open.len() + self.close.len()),
        );
        let mut cursor = 0;
        for span in &line.spans {
            out.push_str(&line.text[cursor..span.start]);
            out.push_str(&self.open);
            out.push_str(&line.text[span.clone()]);
            out.push_str(&self.close);
            cursor = span.end;
        }
        out.push_str(&line.text[cursor..]);
        out
    }
}

/// Turns a result snippet (an HTML table of numbered code lines) into the
/// lines that carry at least one `<mark>` highlight.
#[derive(Debug, Clone)]
pub struct SnippetParser {
    markers: BoundaryMarkers,
}

impl Default for SnippetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetParser {
    pub fn new() -> Self {
        Self {
            markers: BoundaryMarkers::generate(),
        }
    }

    pub fn with_markers(markers: BoundaryMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &BoundaryMarkers {
        &self.markers
    }

    pub fn render_marked(&self, line: &MatchedLine) -> String {
        self.markers.render(line)
    }

    /// Line number text (as printed in the snippet) to matched line.
    pub fn parse(&self, snippet: &str) -> VaultResult<BTreeMap<String, MatchedLine>> {
        let document = Html::parse_fragment(snippet);
        let mut matches = BTreeMap::new();

        for (idx, row) in document.select(&ROW).enumerate() {
            let line_number = row
                .select(&LINE_NO)
                .next()
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .ok_or_else(|| {
                    VaultError::MalformedSnippet(format!("row {idx} has no line number cell"))
                })?;
            let code = row.select(&CODE).next().ok_or_else(|| {
                VaultError::MalformedSnippet(format!("row {idx} has no code cell"))
            })?;

            if code.select(&MARK).next().is_none() {
                continue;
            }

            let mut text = String::new();
            let mut spans = Vec::new();
            collect_text(code, &mut text, &mut spans, false);
            matches.insert(line_number, MatchedLine { text, spans });
        }

        Ok(matches)
    }
}

fn collect_text(
    element: ElementRef<'_>,
    out: &mut String,
    spans: &mut Vec<Range<usize>>,
    inside_mark: bool,
) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            // Nested marks fold into the outermost span.
            let opens_span = !inside_mark && child_el.value().name() == "mark";
            let start = out.len();
            collect_text(child_el, out, spans, inside_mark || opens_span);
            if opens_span {
                spans.push(start..out.len());
            }
        }
    }
}
