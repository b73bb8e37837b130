//! Store configuration.

use devicestore_codec::PayloadEncoding;

/// Configuration for opening a [`StoreContext`](crate::StoreContext).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Tenant scope all tables are opened under.
    pub tenant: String,

    /// Prefix prepended to every table name.
    pub table_prefix: String,

    /// Encoding used for newly written payloads.
    pub payload_encoding: PayloadEncoding,

    /// Idle table handles kept per table by the pool.
    pub pool_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tenant: "default".to_string(),
            table_prefix: "dm".to_string(),
            payload_encoding: PayloadEncoding::Cbor,
            pool_capacity: 8,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant scope.
    #[must_use]
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// Sets the table name prefix.
    #[must_use]
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Sets the encoding for new payloads.
    #[must_use]
    pub const fn payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload_encoding = encoding;
        self
    }

    /// Sets the number of idle handles kept per table.
    #[must_use]
    pub const fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}
