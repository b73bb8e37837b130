//! Payload marshalers.

use crate::error::{CodecError, CodecResult};
use serde_json::Value;
use std::fmt;

/// Built-in payload encodings and their stored type indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadEncoding {
    /// UTF-8 JSON text.
    Json = 0x00,
    /// Binary CBOR.
    Cbor = 0x01,
}

impl PayloadEncoding {
    /// Returns the one-byte indicator written beside the payload.
    #[must_use]
    pub const fn indicator(self) -> u8 {
        self as u8
    }

    /// Maps an indicator byte back to a built-in encoding.
    #[must_use]
    pub const fn from_indicator(indicator: u8) -> Option<Self> {
        match indicator {
            0x00 => Some(Self::Json),
            0x01 => Some(Self::Cbor),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Cbor => write!(f, "cbor"),
        }
    }
}

/// A strategy for turning a payload into bytes and back.
///
/// Marshalers operate on a self-describing [`Value`] tree so the trait
/// stays object-safe; typed entities go through
/// [`encode_entity`](crate::encode_entity) and
/// [`decode_entity`](crate::decode_entity).
///
/// # Invariants
///
/// - `decode(encode(v)) == v` for every value the marshaler accepts
/// - `indicator()` never changes for a given marshaler
pub trait PayloadMarshaler: Send + Sync {
    /// Type indicator stored alongside every body this marshaler writes.
    fn indicator(&self) -> Vec<u8>;

    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Encodes a value to bytes.
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>>;

    /// Decodes bytes into a value.
    fn decode(&self, bytes: &[u8]) -> CodecResult<Value>;
}

/// JSON marshaler backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaler;

impl PayloadMarshaler for JsonMarshaler {
    fn indicator(&self) -> Vec<u8> {
        vec![PayloadEncoding::Json.indicator()]
    }

    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}

/// CBOR marshaler backed by `ciborium`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CborMarshaler;

impl PayloadMarshaler for CborMarshaler {
    fn indicator(&self) -> Vec<u8> {
        vec![PayloadEncoding::Cbor.indicator()]
    }

    fn name(&self) -> &str {
        "cbor"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        let mut buffer = Vec::new();
        ciborium::into_writer(value, &mut buffer)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        Ok(buffer)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}
