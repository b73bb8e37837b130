//! # DeviceStore Codec
//!
//! Payload marshaling for DeviceStore rows.
//!
//! Every entity row stores its body as a `(type indicator, body bytes)`
//! pair. The indicator names the marshaler that wrote the body, which lets
//! readers decode rows written by any registered codec:
//!
//! | Indicator | Marshaler          |
//! |-----------|--------------------|
//! | `0x00`    | [`JsonMarshaler`]  |
//! | `0x01`    | [`CborMarshaler`]  |
//!
//! Additional marshalers are plugged in through
//! [`MarshalerResolver::register`].
//!
//! ## Usage
//!
//! ```
//! use devicestore_codec::{decode_entity, encode_entity, MarshalerResolver};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Zone {
//!     name: String,
//!     opacity: f64,
//! }
//!
//! let resolver = MarshalerResolver::default();
//! let zone = Zone { name: "dock".into(), opacity: 0.4 };
//! let (indicator, body) = encode_entity(&resolver, &zone).unwrap();
//! let decoded: Zone = decode_entity(&resolver, &indicator, &body).unwrap();
//! assert_eq!(zone, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod marshaler;
mod resolver;

pub use error::{CodecError, CodecResult};
pub use marshaler::{CborMarshaler, JsonMarshaler, PayloadEncoding, PayloadMarshaler};
pub use resolver::MarshalerResolver;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes an entity with the resolver's writer marshaler.
///
/// Returns the type indicator and the body, to be stored side by side.
///
/// # Errors
///
/// Returns an error if the entity cannot be represented or encoded.
pub fn encode_entity<T: Serialize>(
    resolver: &MarshalerResolver,
    entity: &T,
) -> CodecResult<(Vec<u8>, Vec<u8>)> {
    let value =
        serde_json::to_value(entity).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    let marshaler = resolver.writer();
    let body = marshaler.encode(&value)?;
    Ok((marshaler.indicator(), body))
}

/// Decodes an entity body using the marshaler named by `indicator`.
///
/// # Errors
///
/// Returns `UnknownPayloadType` if no marshaler is registered for the
/// indicator, or a decoding error if the body does not match `T`.
pub fn decode_entity<T: DeserializeOwned>(
    resolver: &MarshalerResolver,
    indicator: &[u8],
    body: &[u8],
) -> CodecResult<T> {
    let value = resolver.resolve(indicator)?.decode(body)?;
    serde_json::from_value(value).map_err(|e| CodecError::decoding_failed(e.to_string()))
}
