use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::VaultResult;
use crate::model::{ExportRow, Hit};
use crate::store::HitStore;

pub const HEADER: [&str; 5] = [
    "Repository",
    "Line Number",
    "Extracted Query",
    "Content",
    "Path",
];

/// Text following the first occurrence of `query` up to the next `=`,
/// backtick or `"`, trimmed. Empty when `query` does not occur.
pub fn extract_query_context(line: &str, query: &str) -> String {
    let Some(idx) = line.find(query) else {
        return String::new();
    };
    let rest = &line[idx + query.len()..];
    let end = rest.find(['=', '`', '"']).unwrap_or(rest.len());
    rest[..end].trim().to_string()
}

pub struct Exporter<'q> {
    query: &'q str,
}

impl<'q> Exporter<'q> {
    pub fn new(query: &'q str) -> Self {
        Self { query }
    }

    pub fn row(&self, hit: Hit<'_>) -> ExportRow {
        ExportRow {
            repository: hit.repository.to_string(),
            line_number: hit.line_number.to_string(),
            extracted_query: extract_query_context(&hit.line.text, self.query),
            content: hit.line.text.clone(),
            path: hit.path.to_string(),
        }
    }

    pub fn rows(&self, store: &HitStore) -> Vec<ExportRow> {
        store.hits().map(|hit| self.row(hit)).collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W, rows: &[ExportRow]) -> VaultResult<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(HEADER)?;
        for row in rows {
            out.write_record([
                &row.repository,
                &row.line_number,
                &row.extracted_query,
                &row.content,
                &row.path,
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write every row of `store` to `path`; returns the rows written.
    pub fn export(&self, store: &HitStore, path: &Path) -> VaultResult<Vec<ExportRow>> {
        let rows = self.rows(store);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = BufWriter::new(File::create(path)?);
        self.write_csv(file, &rows)?;
        info!("wrote {} rows to {}", rows.len(), path.display());
        Ok(rows)
    }
}

/// First row per distinct extracted query, at most `limit` rows, in order.
pub fn preview(rows: &[ExportRow], limit: usize) -> Vec<ExportRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row.extracted_query.as_str()))
        .take(limit)
        .cloned()
        .collect()
}
