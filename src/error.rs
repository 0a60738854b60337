use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("orders source missing required fields: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Schema error with a deterministic message: field names are sorted.
    pub fn missing_fields(mut missing: Vec<String>) -> Self {
        missing.sort();
        PipelineError::Schema { missing }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
