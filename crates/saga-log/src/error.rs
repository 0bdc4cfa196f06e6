use thiserror::Error;

use crate::ExecutionId;

/// Errors that can occur when interacting with a log store.
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted log type string is not one of the known values.
    #[error("Unknown log type: {0}")]
    InvalidLogType(String),

    /// A persisted row could not be mapped back to a log entry.
    #[error("Corrupt log entry for execution {execution_id}: {reason}")]
    Corrupt {
        execution_id: ExecutionId,
        reason: String,
    },

    /// The backend refused or failed the operation for another reason.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for log store operations.
pub type Result<T> = std::result::Result<T, LogStoreError>;
