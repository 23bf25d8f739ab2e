// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Stage-fatal failures. Row-level problems never surface here; they are
/// counted in `StageDiagnostics` instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required extract or upstream stage artifact does not exist.
    #[error("missing input '{artifact}': {} does not exist", path.display())]
    MissingInput { artifact: String, path: PathBuf },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
