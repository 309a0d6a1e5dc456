use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KeggError {
    #[error("invalid brite id: {0}")]
    InvalidBriteId(String),

    #[error("invalid KEGG organism code: {0}")]
    InvalidOrgCode(String),

    #[error("malformed hierarchy node: {0}")]
    Structure(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("source directory does not exist: {0}")]
    #[diagnostic(help("pass an existing directory with --gene-dir"))]
    MissingSourceDir(PathBuf),

    #[error("KEGG request failed: {0}")]
    KeggHttp(String),

    #[error("KEGG returned status {status}: {message}")]
    KeggStatus { status: u16, message: String },

    #[error("worker pool unavailable: {0}")]
    WorkerPool(String),

    #[error("batch failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: usize, message: String },

    #[error("failed to parse KEGG response: {0}")]
    Parse(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl KeggError {
    /// True for errors that mean "the server had nothing for this request".
    pub fn is_status(&self) -> bool {
        matches!(self, KeggError::KeggStatus { .. })
    }
}

impl From<csv::Error> for KeggError {
    fn from(err: csv::Error) -> Self {
        KeggError::Table(err.to_string())
    }
}
