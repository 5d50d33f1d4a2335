//! Error type for the ingestion pipeline.
//!
//! Every variant is fatal for the run. Unparsable numeric cells are not
//! errors at all: they resolve to the column's fallback in `dataset`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: PathBuf },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A column declared by a dataset descriptor is absent from the header row.
    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
