//! Error types for the flora library.

use std::io;

use crate::storage::StorageError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration could not be written or is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// A caller broke a precondition of the engine (e.g. zero cycle length)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}
