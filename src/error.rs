//! Error types for the symbol index engine.
//!
//! Per-file errors (`PathResolution`, `Bind`, `IngestionRollback`, `NotFound`)
//! are contained by the synchronizer and counted; `StoreOpen` and
//! `ProducerChannel` abort a run.

use thiserror::Error;

use crate::error_codes::*;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Schema init, function registration or database open failed
    #[error("cannot open store {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    /// A supplied path cannot be canonicalized
    #[error(transparent)]
    PathResolution(#[from] PathError),

    /// A tag record is missing required fields or names an unknown file
    #[error("cannot bind tag record: {0}")]
    Bind(String),

    /// The producer emitted no usable tags for a file
    #[error("no tags produced for {0}; transaction rolled back")]
    IngestionRollback(String),

    /// The producer process cannot be reached or its channel broke
    #[error("tag producer channel failure: {0}")]
    ProducerChannel(String),

    /// Lookup or delete on a path that is not in the store
    #[error("path not found in store: {0}")]
    NotFound(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Stable error code for diagnostics (see [`crate::error_codes`])
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::StoreOpen { .. } => SYM_STORE_001_OPEN_FAILED,
            IndexError::PathResolution(_) => SYM_PATH_001_UNRESOLVABLE,
            IndexError::Bind(_) => SYM_ING_001_BIND,
            IndexError::IngestionRollback(_) => SYM_ING_002_ROLLBACK,
            IndexError::ProducerChannel(_) => SYM_PROD_001_CHANNEL,
            IndexError::NotFound(_) => SYM_STORE_002_NOT_FOUND,
            IndexError::Sqlite(_) => SYM_STORE_003_SQLITE,
            IndexError::Io(_) => SYM_IO_001,
        }
    }

    /// Whether this error must abort a whole synchronization run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IndexError::StoreOpen { .. } | IndexError::ProducerChannel(_)
        )
    }
}

/// Path normalization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    Unresolvable(String),

    /// Path is not valid UTF-8 and cannot be stored
    #[error("path is not valid UTF-8: {0}")]
    NotUtf8(String),

    /// Path contains a newline and cannot be sent over the producer channel
    #[error("path contains a line break: {0}")]
    LineBreak(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
