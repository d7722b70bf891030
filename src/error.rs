//! Crate-wide error types.
//!
//! Shaped after the MRF crate's existing `parser::ParseError` and
//! `sources::SourceError`: one `thiserror`-derived enum per component, each
//! wrapping the underlying library error with `#[from]` and adding the
//! structural/positional variants for malformed input.

use thiserror::Error;

/// Errors raised by the streaming readers (CSV and JSON, Tall/Wide, v2/v3).
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed header, unexpected token, or an unknown code-type value that
    /// leaves a code cell orphaned. Carries the source ordinal (CSV row
    /// number or JSON item index) for the user-visible error report.
    #[error("input structure error at {ordinal} ({stage}): {message}")]
    Structure {
        stage: &'static str,
        ordinal: u64,
        message: String,
    },
}

/// Errors raised by the columnar writer.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the relational loader.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("columnar error: {0}")]
    Writer(#[from] WriterError),

    #[error("load cancelled")]
    Cancelled,

    /// A transaction was rolled back; `cause` is the error that triggered it.
    /// Prior committed batches remain durable.
    #[error("transaction rolled back: {cause}")]
    RolledBack { cause: Box<LoadError> },
}

impl LoadError {
    pub fn rolled_back(cause: LoadError) -> Self {
        LoadError::RolledBack {
            cause: Box::new(cause),
        }
    }
}

/// Top-level error for the ingest half of a pipeline (reader -> writer).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Writer(#[from] WriterError),
}
