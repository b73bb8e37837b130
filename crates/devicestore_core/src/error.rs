//! Error types for DeviceStore core.

use crate::types::EntityFamily;
use devicestore_codec::CodecError;
use devicestore_storage::{StorageError, StorageResult};
use thiserror::Error;

/// Result type for core operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in entity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The substrate failed. `context` names the operation that was running.
    #[error("{context}: {source}")]
    Substrate {
        /// Operation-specific description, such as "unable to create area".
        context: String,
        /// The underlying substrate error.
        #[source]
        source: StorageError,
    },

    /// A token did not resolve for the given family.
    #[error("invalid {family} token: {token}")]
    InvalidToken {
        /// Family the token was expected to belong to.
        family: EntityFamily,
        /// The unresolved token.
        token: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A request violated a precondition.
    #[error("precondition failed: {0}")]
    Precondition(#[from] Precondition),

    /// A row is missing columns every row of its family must carry.
    #[error("corrupt {family} row: {message}")]
    CorruptRow {
        /// Family of the row.
        family: EntityFamily,
        /// Description of what is missing.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid token error.
    pub fn invalid_token(family: EntityFamily, token: impl Into<String>) -> Self {
        Self::InvalidToken {
            family,
            token: token.into(),
        }
    }

    /// Creates a corrupt row error.
    pub fn corrupt_row(family: EntityFamily, message: impl Into<String>) -> Self {
        Self::CorruptRow {
            family,
            message: message.into(),
        }
    }

    /// Returns true for an unresolved token of the given family.
    #[must_use]
    pub fn is_invalid_token(&self, family: EntityFamily) -> bool {
        matches!(self, Self::InvalidToken { family: f, .. } if *f == family)
    }

    /// Returns the precondition, if this is a precondition violation.
    #[must_use]
    pub fn precondition(&self) -> Option<&Precondition> {
        match self {
            Self::Precondition(p) => Some(p),
            _ => None,
        }
    }
}

/// Preconditions callers can render as specific user-facing messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The device already has an active assignment.
    #[error("device {device_token} already has active assignment {assignment_token}")]
    DeviceAlreadyAssigned {
        /// Device token.
        device_token: String,
        /// Token of the active assignment.
        assignment_token: String,
    },

    /// The device cannot be deleted while an assignment is active.
    #[error("device {device_token} cannot be deleted while assignment {assignment_token} is active")]
    DeviceAssigned {
        /// Device token.
        device_token: String,
        /// Token of the active assignment.
        assignment_token: String,
    },

    /// The caller supplied a token that is already mapped.
    #[error("{family} token already in use: {token}")]
    DuplicateToken {
        /// Family of the entity being created.
        family: EntityFamily,
        /// The duplicate token.
        token: String,
    },

    /// A command with the same namespace and name exists on the device type.
    #[error("command {namespace}:{name} already exists on device type {device_type_token}")]
    DuplicateCommand {
        /// Device type token.
        device_type_token: String,
        /// Command namespace.
        namespace: String,
        /// Command name.
        name: String,
    },

    /// A status with the same code exists on the device type.
    #[error("status code {code} already exists on device type {device_type_token}")]
    DuplicateStatusCode {
        /// Device type token.
        device_type_token: String,
        /// Status code.
        code: String,
    },

    /// A stream with the same id exists on the assignment.
    #[error("stream {stream_id} already exists on assignment {assignment_token}")]
    DuplicateStreamId {
        /// Assignment token.
        assignment_token: String,
        /// Stream id.
        stream_id: String,
    },

    /// A required request field is missing or blank.
    #[error("{family} requires field '{field}'")]
    MissingField {
        /// Family of the entity being built.
        family: EntityFamily,
        /// Field name.
        field: &'static str,
    },

    /// A coordinate or opacity is NaN or infinite and cannot be stored.
    #[error("{family} field '{field}' must be a finite number")]
    NonFiniteValue {
        /// Family of the entity being built.
        family: EntityFamily,
        /// Field name.
        field: &'static str,
    },

    /// A group element must reference exactly one device or nested group.
    #[error("group element must reference exactly one device or nested group")]
    InvalidGroupElement,

    /// A group cannot contain itself.
    #[error("group {group_token} cannot contain itself")]
    SelfReferencingGroup {
        /// Group token.
        group_token: String,
    },

    /// The assignment has already been released.
    #[error("assignment {assignment_token} is not active")]
    AssignmentNotActive {
        /// Assignment token.
        assignment_token: String,
    },
}

/// Adds operation context to substrate results.
pub trait ResultExt<T> {
    /// Wraps a substrate error with an operation-specific message.
    fn context(self, context: &str) -> StoreResult<T>;

    /// Like [`ResultExt::context`], building the message lazily.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> StoreResult<T>;
}

impl<T> ResultExt<T> for StorageResult<T> {
    fn context(self, context: &str) -> StoreResult<T> {
        self.map_err(|source| StoreError::Substrate {
            context: context.to_string(),
            source,
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> StoreResult<T> {
        self.map_err(|source| StoreError::Substrate {
            context: f(),
            source,
        })
    }
}
