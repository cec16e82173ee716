use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed snippet: {0}")]
    MalformedSnippet(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VaultError {
    pub fn is_malformed_page(&self) -> bool {
        matches!(self, VaultError::MalformedSnippet(_) | VaultError::Decode(_))
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
