//! Error taxonomy.
//!
//! Configuration and I/O failures that must abort the run are distinguished
//! from the recoverable, per-sample conditions described in the run
//! orchestrator: the latter are logged inline with `tracing::warn!`/`tracing::debug!`
//! and never reach here.

use std::process::ExitCode;

/// Fatal errors, surfaced all the way to `main`.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("missing required parameter(s) for run mode {run_mode}: {missing}")]
    MissingParameters { run_mode: String, missing: String },

    #[error("unknown run mode {0:?}")]
    UnknownRunMode(String),

    #[error("path does not exist: {0}")]
    PathNotFound(std::path::PathBuf),

    #[error("could not open acceptor alignment {path}: {source}")]
    AcceptorAlignmentUnavailable {
        path: std::path::PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("fatal failure while writing substituted FASTQ {path}: {source}")]
    FastqWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::MissingParameters { .. }
            | AppError::UnknownRunMode(_)
            | AppError::PathNotFound(_) => ExitCode::from(2),
            AppError::AcceptorAlignmentUnavailable { .. } | AppError::FastqWriteFailed { .. } => {
                ExitCode::from(3)
            }
            AppError::Other(_) => ExitCode::FAILURE,
        }
    }
}
