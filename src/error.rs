use std::io;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("edge table: {0}")]
    Csv(#[from] csv::Error),

    #[error("node table: {0}")]
    Table(#[from] PolarsError),

    #[error("json output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node table is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("edge table needs at least two columns, found {0}")]
    EdgeColumns(usize),

    #[error("node row {row} has no Id")]
    NullId { row: usize },

    #[error("edge row {row} references unknown node {id:?}")]
    UnknownEndpoint { row: usize, id: String },

    #[error("not enough observations for {what}: need at least {need}, got {got}")]
    InsufficientData {
        what: &'static str,
        need: usize,
        got: usize,
    },
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
