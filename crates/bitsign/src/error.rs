//! Error types for the bitsign tool.

use std::path::PathBuf;

use bitsign_core::{AuthError, ErrorKind};
use thiserror::Error;

/// Errors that can occur during bitsign operations.
#[derive(Debug, Error)]
pub enum BitsignError {
    /// Framing or verification failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Reading or writing a file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl BitsignError {
    /// Taxonomy kind of the underlying authentication failure, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BitsignError::Auth(e) => Some(e.kind()),
            BitsignError::Io { .. } | BitsignError::Config(_) => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BitsignError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for bitsign operations.
pub type Result<T> = std::result::Result<T, BitsignError>;
