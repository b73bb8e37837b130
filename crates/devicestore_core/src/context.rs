//! Shared state passed to every entity store.

use crate::config::StoreConfig;
use crate::directory::IdDirectories;
use crate::error::{ResultExt, StoreResult};
use crate::pool::{TableLease, TablePool};
use crate::schema::Table;
use devicestore_codec::MarshalerResolver;
use devicestore_storage::Substrate;
use std::sync::Arc;

/// Everything an entity store operation needs: pooled table access, the
/// tenant scope, token directories and the payload marshaler resolver.
///
/// A context is built once at startup and shared by reference. Opening it
/// ensures every table exists; no table management happens afterwards.
#[derive(Debug)]
pub struct StoreContext {
    config: StoreConfig,
    pool: Arc<TablePool>,
    directories: IdDirectories,
    resolver: MarshalerResolver,
}

impl StoreContext {
    /// Opens a context with the default marshalers.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be ensured.
    pub fn open(substrate: Arc<dyn Substrate>, config: StoreConfig) -> StoreResult<Self> {
        let resolver = MarshalerResolver::new(config.payload_encoding);
        Self::with_resolver(substrate, config, resolver)
    }

    /// Opens a context with a caller-built resolver, for plugin codecs.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be ensured.
    pub fn with_resolver(
        substrate: Arc<dyn Substrate>,
        config: StoreConfig,
        resolver: MarshalerResolver,
    ) -> StoreResult<Self> {
        let pool = Arc::new(TablePool::new(
            substrate,
            config.tenant.clone(),
            config.table_prefix.clone(),
            config.pool_capacity,
        ));
        pool.ensure_tables()
            .with_context(|| format!("unable to create tables for tenant {}", config.tenant))?;
        tracing::debug!(tenant = %config.tenant, prefix = %config.table_prefix, "store context opened");

        let directories = IdDirectories::new(&pool);
        Ok(Self {
            config,
            pool,
            directories,
            resolver,
        })
    }

    /// Checks out a table handle, released when the lease drops.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle cannot be opened.
    pub fn table(&self, table: Table) -> StoreResult<TableLease<'_>> {
        self.pool
            .checkout(table)
            .with_context(|| format!("unable to open table {}", table.name()))
    }

    /// The configuration the context was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The tenant scope.
    pub fn tenant(&self) -> &str {
        &self.config.tenant
    }

    /// Token directories.
    pub fn directories(&self) -> &IdDirectories {
        &self.directories
    }

    /// Payload marshaler resolver.
    pub fn resolver(&self) -> &MarshalerResolver {
        &self.resolver
    }

    /// The table pool.
    pub fn pool(&self) -> &TablePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicestore_codec::PayloadEncoding;
    use devicestore_storage::MemorySubstrate;

    #[test]
    fn open_ensures_tables_under_tenant() {
        let substrate = Arc::new(MemorySubstrate::new());
        let ctx = StoreContext::open(
            Arc::clone(&substrate) as Arc<dyn Substrate>,
            StoreConfig::new().tenant("acme").table_prefix("iot"),
        )
        .unwrap();

        assert_eq!(ctx.tenant(), "acme");
        assert!(substrate.row_count("acme", "iot_devices").is_some());
        assert!(substrate.row_count("default", "iot_devices").is_none());
    }

    #[test]
    fn resolver_follows_configured_encoding() {
        let substrate: Arc<dyn Substrate> = Arc::new(MemorySubstrate::new());
        let ctx = StoreContext::open(
            substrate,
            StoreConfig::new().payload_encoding(PayloadEncoding::Json),
        )
        .unwrap();
        assert_eq!(
            ctx.resolver().writer().indicator(),
            vec![PayloadEncoding::Json.indicator()]
        );
    }

    #[test]
    fn table_lease_is_released() {
        let substrate: Arc<dyn Substrate> = Arc::new(MemorySubstrate::new());
        let ctx = StoreContext::open(substrate, StoreConfig::default()).unwrap();
        {
            let _lease = ctx.table(Table::Areas).unwrap();
            assert_eq!(ctx.pool().checked_out(), 1);
        }
        assert_eq!(ctx.pool().checked_out(), 0);
    }
}
