//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while marshaling payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode payload bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// No marshaler is registered for the stored type indicator.
    #[error("unknown payload type indicator {indicator:02x?}")]
    UnknownPayloadType {
        /// The raw indicator bytes read from the row.
        indicator: Vec<u8>,
    },

    /// A row has a payload but no type indicator.
    #[error("payload type indicator is empty")]
    EmptyPayloadType,
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unknown payload type error.
    pub fn unknown_payload_type(indicator: &[u8]) -> Self {
        Self::UnknownPayloadType {
            indicator: indicator.to_vec(),
        }
    }
}
