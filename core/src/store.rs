use std::collections::BTreeMap;

use crate::error::VaultResult;
use crate::model::{Hit, MatchedLine};
use crate::snippet::SnippetParser;

type Lines = BTreeMap<String, MatchedLine>;
type Files = BTreeMap<String, Lines>;

/// repository -> path -> line number -> matched line.
///
/// A (repository, path, line number) key holds a single line; inserting
/// the same key again replaces the value. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct HitStore {
    parser: SnippetParser,
    repos: BTreeMap<String, Files>,
}

impl PartialEq for HitStore {
    fn eq(&self, other: &Self) -> bool {
        self.repos == other.repos
    }
}

impl HitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(parser: SnippetParser) -> Self {
        Self {
            parser,
            repos: BTreeMap::new(),
        }
    }

    pub fn parser(&self) -> &SnippetParser {
        &self.parser
    }

    /// Parse `snippet` and record its highlighted lines under
    /// (`repository`, `path`). Returns how many lines the snippet matched.
    pub fn add(&mut self, repository: &str, path: &str, snippet: &str) -> VaultResult<usize> {
        let matches = self.parser.parse(snippet)?;
        if matches.is_empty() {
            return Ok(0);
        }
        let added = matches.len();
        let lines = self
            .repos
            .entry(repository.to_string())
            .or_default()
            .entry(path.to_string())
            .or_default();
        lines.extend(matches);
        Ok(added)
    }

    pub fn insert(&mut self, repository: &str, path: &str, line_number: &str, line: MatchedLine) {
        self.repos
            .entry(repository.to_string())
            .or_default()
            .entry(path.to_string())
            .or_default()
            .insert(line_number.to_string(), line);
    }

    /// Fold `other` into `self`; on a key collision the value from `other`
    /// wins.
    pub fn merge(&mut self, other: HitStore) {
        for (repository, files) in other.repos {
            let target = self.repos.entry(repository).or_default();
            for (path, lines) in files {
                target.entry(path).or_default().extend(lines);
            }
        }
    }

    pub fn get(&self, repository: &str, path: &str, line_number: &str) -> Option<&MatchedLine> {
        self.repos.get(repository)?.get(path)?.get(line_number)
    }

    pub fn hits(&self) -> impl Iterator<Item = Hit<'_>> {
        self.repos.iter().flat_map(|(repository, files)| {
            files.iter().flat_map(move |(path, lines)| {
                lines.iter().map(move |(line_number, line)| Hit {
                    repository: repository.as_str(),
                    path: path.as_str(),
                    line_number: line_number.as_str(),
                    line,
                })
            })
        })
    }

    pub fn repository_count(&self) -> usize {
        self.repos.len()
    }

    pub fn file_count(&self) -> usize {
        self.repos.values().map(BTreeMap::len).sum()
    }

    pub fn line_count(&self) -> usize {
        self.repos
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }
}
