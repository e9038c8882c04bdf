use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("invalid multiverse id: {0}")]
    InvalidIdentifier(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    ConfigInvalid(String),

    #[error("Gatherer request failed: {0}")]
    FetchHttp(String),

    #[error("Gatherer returned status {status} for {url}")]
    FetchStatus { status: u16, url: String },

    #[error("giving up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("card {id} is missing required field {field}")]
    MissingField { id: u32, field: &'static str },

    #[error("invalid selector {0}")]
    Selector(String),

    #[error("card store error: {0}")]
    Store(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
