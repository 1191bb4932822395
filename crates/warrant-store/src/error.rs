//! Error types for the store crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a key-value engine.
#[derive(Debug, Error)]
pub enum KvError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A lock was poisoned by a panicking writer.
    #[error("failed to acquire lock")]
    LockError,

    /// A log entry could not be encoded.
    #[error("failed to encode log entry: {0}")]
    Encoding(String),

    /// A complete log line could not be replayed.
    #[error("corrupt log entry on line {line} of {path}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A failed append could not be rolled back; the engine refuses writes.
    #[error("log {0} is in an unknown state after a failed write")]
    Failed(PathBuf),
}

impl KvError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| KvError::Io { path, source }
    }
}

/// Errors that can occur during credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record for this token already exists.
    #[error("token already exists")]
    DuplicateKey(String),

    /// No record exists for this token.
    #[error("token not found")]
    NotFound(String),

    /// A stored record or index entry could not be decoded.
    #[error("corrupt store entry: {0}")]
    Corrupt(String),

    /// The underlying engine failed.
    #[error("storage engine error: {0}")]
    Engine(#[from] KvError),

    /// A record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
