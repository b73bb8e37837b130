//! The device management facade.

use crate::config::StoreConfig;
use crate::context::StoreContext;
use crate::error::StoreResult;
use crate::store::{
    AreaStore, AreaTypeStore, DeviceAssignmentStore, DeviceCommandStore, DeviceGroupElementStore,
    DeviceGroupStore, DeviceStatusStore, DeviceStore, DeviceStreamStore, DeviceTypeStore, ZoneStore,
};
use devicestore_codec::MarshalerResolver;
use devicestore_storage::Substrate;
use std::sync::Arc;

/// Entry point for device management persistence.
///
/// `DeviceManagement` owns a [`StoreContext`] and hands out the per-family
/// stores, which borrow it. It is `Sync`, so one instance can serve every
/// thread of a process.
///
/// ```rust,ignore
/// use devicestore_core::{DeviceManagement, EntityStore, StoreConfig};
/// use devicestore_core::model::AreaRequest;
/// use devicestore_storage::MemorySubstrate;
/// use std::sync::Arc;
///
/// let dm = DeviceManagement::open(Arc::new(MemorySubstrate::new()), StoreConfig::new())?;
/// let area = dm.areas().create(&AreaRequest {
///     name: Some("Warehouse 7".into()),
///     ..AreaRequest::default()
/// })?;
/// assert_eq!(dm.areas().require(&area.token)?, area);
/// ```
#[derive(Debug)]
pub struct DeviceManagement {
    ctx: StoreContext,
}

impl DeviceManagement {
    /// Opens the store, ensuring every table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be created.
    pub fn open(substrate: Arc<dyn Substrate>, config: StoreConfig) -> StoreResult<Self> {
        let ctx = StoreContext::open(substrate, config)?;
        tracing::info!(tenant = %ctx.tenant(), "device management store opened");
        Ok(Self { ctx })
    }

    /// Opens the store with a caller-built marshaler resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be created.
    pub fn with_resolver(
        substrate: Arc<dyn Substrate>,
        config: StoreConfig,
        resolver: MarshalerResolver,
    ) -> StoreResult<Self> {
        let ctx = StoreContext::with_resolver(substrate, config, resolver)?;
        tracing::info!(tenant = %ctx.tenant(), "device management store opened");
        Ok(Self { ctx })
    }

    /// The shared store context.
    #[must_use]
    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }

    /// Area types.
    #[must_use]
    pub fn area_types(&self) -> AreaTypeStore<'_> {
        AreaTypeStore::new(&self.ctx)
    }

    /// Areas.
    #[must_use]
    pub fn areas(&self) -> AreaStore<'_> {
        AreaStore::new(&self.ctx)
    }

    /// Zones.
    #[must_use]
    pub fn zones(&self) -> ZoneStore<'_> {
        ZoneStore::new(&self.ctx)
    }

    /// Device types.
    #[must_use]
    pub fn device_types(&self) -> DeviceTypeStore<'_> {
        DeviceTypeStore::new(&self.ctx)
    }

    /// Device commands.
    #[must_use]
    pub fn commands(&self) -> DeviceCommandStore<'_> {
        DeviceCommandStore::new(&self.ctx)
    }

    /// Device statuses.
    #[must_use]
    pub fn statuses(&self) -> DeviceStatusStore<'_> {
        DeviceStatusStore::new(&self.ctx)
    }

    /// Devices.
    #[must_use]
    pub fn devices(&self) -> DeviceStore<'_> {
        DeviceStore::new(&self.ctx)
    }

    /// Device assignments.
    #[must_use]
    pub fn assignments(&self) -> DeviceAssignmentStore<'_> {
        DeviceAssignmentStore::new(&self.ctx)
    }

    /// Device groups.
    #[must_use]
    pub fn groups(&self) -> DeviceGroupStore<'_> {
        DeviceGroupStore::new(&self.ctx)
    }

    /// Group membership.
    #[must_use]
    pub fn group_elements(&self) -> DeviceGroupElementStore<'_> {
        DeviceGroupElementStore::new(&self.ctx)
    }

    /// Device streams.
    #[must_use]
    pub fn streams(&self) -> DeviceStreamStore<'_> {
        DeviceStreamStore::new(&self.ctx)
    }
}
