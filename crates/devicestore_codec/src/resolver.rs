//! Type-indicator to marshaler resolution.

use crate::error::{CodecError, CodecResult};
use crate::marshaler::{CborMarshaler, JsonMarshaler, PayloadEncoding, PayloadMarshaler};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves stored payload-type indicators to marshalers.
///
/// The writer picks the marshaler (the resolver's *default*) and records its
/// indicator beside the body. Readers resolve whatever indicator the row
/// carries, so bodies written by several codec generations can coexist in
/// the same table.
///
/// A resolver is an ordinary value: build one at startup and pass it to
/// whoever needs it.
///
/// # Example
///
/// ```
/// use devicestore_codec::{MarshalerResolver, PayloadEncoding};
///
/// let resolver = MarshalerResolver::new(PayloadEncoding::Json);
/// let marshaler = resolver.resolve(&[0x01]).unwrap();
/// assert_eq!(marshaler.name(), "cbor");
/// assert!(resolver.resolve(&[0x42]).is_err());
/// ```
#[derive(Clone)]
pub struct MarshalerResolver {
    marshalers: HashMap<Vec<u8>, Arc<dyn PayloadMarshaler>>,
    default: Arc<dyn PayloadMarshaler>,
}

impl MarshalerResolver {
    /// Creates a resolver with the built-in marshalers registered, writing
    /// new payloads with `default`.
    #[must_use]
    pub fn new(default: PayloadEncoding) -> Self {
        let json: Arc<dyn PayloadMarshaler> = Arc::new(JsonMarshaler);
        let cbor: Arc<dyn PayloadMarshaler> = Arc::new(CborMarshaler);
        let default_marshaler = match default {
            PayloadEncoding::Json => Arc::clone(&json),
            PayloadEncoding::Cbor => Arc::clone(&cbor),
        };

        let mut marshalers = HashMap::new();
        marshalers.insert(json.indicator(), json);
        marshalers.insert(cbor.indicator(), cbor);

        Self {
            marshalers,
            default: default_marshaler,
        }
    }

    /// Registers an additional marshaler, replacing any marshaler already
    /// registered under the same indicator.
    pub fn register(&mut self, marshaler: Arc<dyn PayloadMarshaler>) {
        self.marshalers.insert(marshaler.indicator(), marshaler);
    }

    /// Registers a marshaler and makes it the writer default.
    pub fn register_default(&mut self, marshaler: Arc<dyn PayloadMarshaler>) {
        self.default = Arc::clone(&marshaler);
        self.register(marshaler);
    }

    /// Resolves a stored type indicator.
    ///
    /// # Errors
    ///
    /// Returns `EmptyPayloadType` for an empty indicator and
    /// `UnknownPayloadType` when no marshaler is registered for it.
    pub fn resolve(&self, indicator: &[u8]) -> CodecResult<Arc<dyn PayloadMarshaler>> {
        if indicator.is_empty() {
            return Err(CodecError::EmptyPayloadType);
        }
        self.marshalers
            .get(indicator)
            .cloned()
            .ok_or_else(|| CodecError::unknown_payload_type(indicator))
    }

    /// The marshaler used for new writes.
    #[must_use]
    pub fn writer(&self) -> Arc<dyn PayloadMarshaler> {
        Arc::clone(&self.default)
    }

    /// Returns the registered indicators in ascending order.
    #[must_use]
    pub fn indicators(&self) -> Vec<Vec<u8>> {
        let mut indicators: Vec<Vec<u8>> = self.marshalers.keys().cloned().collect();
        indicators.sort();
        indicators
    }
}

impl Default for MarshalerResolver {
    fn default() -> Self {
        Self::new(PayloadEncoding::Cbor)
    }
}

impl fmt::Debug for MarshalerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalerResolver")
            .field("default", &self.default.name())
            .field("indicators", &self.indicators())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Stores payloads as raw UTF-8 of the JSON text, reversed. Only useful
    /// for proving plugins need no resolver changes.
    struct ReversedJson;

    impl PayloadMarshaler for ReversedJson {
        fn indicator(&self) -> Vec<u8> {
            vec![0x10, 0x01]
        }

        fn name(&self) -> &str {
            "reversed-json"
        }

        fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
            let mut bytes = JsonMarshaler.encode(value)?;
            bytes.reverse();
            Ok(bytes)
        }

        fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
            let mut bytes = bytes.to_vec();
            bytes.reverse();
            JsonMarshaler.decode(&bytes)
        }
    }

    #[test]
    fn default_writer() {
        assert_eq!(MarshalerResolver::default().writer().name(), "cbor");
        assert_eq!(
            MarshalerResolver::new(PayloadEncoding::Json).writer().name(),
            "json"
        );
    }

    #[test]
    fn rejects_unknown_and_empty_indicators() {
        let resolver = MarshalerResolver::default();
        assert!(matches!(
            resolver.resolve(&[0x09]),
            Err(CodecError::UnknownPayloadType { indicator }) if indicator == vec![0x09]
        ));
        assert!(matches!(
            resolver.resolve(&[]),
            Err(CodecError::EmptyPayloadType)
        ));
    }

    #[test]
    fn plugin_marshaler_coexists() {
        let mut resolver = MarshalerResolver::default();
        resolver.register(Arc::new(ReversedJson));
        assert_eq!(resolver.indicators().len(), 3);

        let value = json!({ "name": "plugin" });
        let bytes = resolver.resolve(&[0x10, 0x01]).unwrap().encode(&value).unwrap();
        let decoded = resolver.resolve(&[0x10, 0x01]).unwrap().decode(&bytes).unwrap();
        assert_eq!(decoded, value);

        // built-ins still resolve
        assert_eq!(resolver.resolve(&[0x00]).unwrap().name(), "json");
    }

    #[test]
    fn register_default_switches_writer() {
        let mut resolver = MarshalerResolver::default();
        resolver.register_default(Arc::new(ReversedJson));
        assert_eq!(resolver.writer().name(), "reversed-json");
    }
}
