//! Error types for the dirsync core crate.

use thiserror::Error;

use crate::models::common::Context;

/// Stable code reported to the host when a whole run was aborted.
pub const AGGREGATE_FAILURE_CODE: u32 = 1_410_774_015;

/// Top-level error type for all dirsync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("directory returned no users for configuration {configuration} ({context})")]
    EmptyDirectoryResult { configuration: u32, context: Context },

    #[error("configuration {configuration} has no {context} settings")]
    ContextNotConfigured { configuration: u32, context: Context },

    #[error("local store error: {0}")]
    Store(String),

    #[error(
        "Some or all imports failed. Synchronisation was aborted. Check your settings or your network connections ({failures} failed)"
    )]
    AggregateSyncFailure { failures: u32 },
}

impl SyncError {
    /// Machine-readable code for errors the host may need to tell apart.
    pub fn code(&self) -> Option<u32> {
        match self {
            SyncError::AggregateSyncFailure { .. } => Some(AGGREGATE_FAILURE_CODE),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// A convenience Result alias that defaults to [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;
