//! Error types for substrate operations.

use thiserror::Error;

/// Result type for substrate operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the key-value substrate.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested table has not been created.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Fully qualified table name (tenant scope included).
        name: String,
    },

    /// The substrate could not be reached or refused the operation.
    #[error("substrate unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// A counter column holds a value that is not an 8-byte integer.
    #[error("column {column:?} is not a counter: expected 8 bytes, found {len}")]
    InvalidCounter {
        /// Column qualifier.
        column: Vec<u8>,
        /// Length of the stored value.
        len: usize,
    },

    /// Incrementing the counter would overflow a signed 64-bit value.
    #[error("counter overflow on column {column:?}")]
    CounterOverflow {
        /// Column qualifier.
        column: Vec<u8>,
    },
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }
}
