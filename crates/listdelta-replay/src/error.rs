#![forbid(unsafe_code)]

use std::path::PathBuf;

use listdelta_core::{ConfigError, SequenceError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace file not found: {path}")]
    MissingTrace { path: PathBuf },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("line {line}: malformed record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {source}")]
    Sequence {
        line: usize,
        #[source]
        source: SequenceError,
    },
}

impl ReplayError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse { .. } | Self::Sequence { .. } => 2,
            Self::Config(_) | Self::InvalidArgument { .. } => 3,
            Self::Io(_) | Self::MissingTrace { .. } => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Source line the error refers to, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } | Self::Sequence { line, .. } => Some(*line),
            _ => None,
        }
    }
}
