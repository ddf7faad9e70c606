use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while opening the database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Another instance of digidex appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a sqlx error, recognising SQLite lock conditions.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all mean
/// another process owns the file.
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

/// Errors from document store reads, writes and subscriptions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed document body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused the operation (bad key, permissions, ...)
    #[error("Write rejected: {0}")]
    Rejected(String),
}

// ============================================================================
// Document
// ============================================================================

/// One document of a collection as delivered in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub body: Value,
    /// Unix timestamp (milliseconds) of the last write
    pub updated_at: i64,
}
