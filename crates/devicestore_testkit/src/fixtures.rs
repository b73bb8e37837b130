//! Test fixtures and store helpers.
//!
//! Provides an in-memory [`DeviceManagement`] whose substrate stays
//! reachable for fault injection and resource checks, plus request
//! builders for common entities.

use devicestore_codec::PayloadEncoding;
use devicestore_core::model::{
    Area, AreaType, DeviceAssignment, DeviceGroup, DeviceType, Device, Zone,
};
use devicestore_core::schema::Table;
use devicestore_core::{DeviceManagement, EntityStore, StoreConfig};
use devicestore_storage::{MemorySubstrate, Substrate, SubstrateStats};
use std::sync::Arc;

/// Tenant used by [`TestStore::new`].
pub const TEST_TENANT: &str = "test";

/// A device management store over a fresh in-memory substrate.
pub struct TestStore {
    substrate: Arc<MemorySubstrate>,
    dm: DeviceManagement,
}

impl TestStore {
    /// Creates a store with the default configuration under [`TEST_TENANT`].
    pub fn new() -> Self {
        Self::with_config(StoreConfig::new().tenant(TEST_TENANT))
    }

    /// Creates a store that writes payloads with `encoding`.
    pub fn with_encoding(encoding: PayloadEncoding) -> Self {
        Self::with_config(StoreConfig::new().tenant(TEST_TENANT).payload_encoding(encoding))
    }

    /// Creates a store with a custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        let substrate = Arc::new(MemorySubstrate::new());
        let dm = DeviceManagement::open(Arc::clone(&substrate) as Arc<dyn Substrate>, config)
            .expect("Failed to open test store");
        Self { substrate, dm }
    }

    /// Opens a second store over the same substrate with another config.
    pub fn reopen(&self, config: StoreConfig) -> DeviceManagement {
        DeviceManagement::open(Arc::clone(&self.substrate) as Arc<dyn Substrate>, config)
            .expect("Failed to reopen test store")
    }

    /// The underlying substrate.
    pub fn substrate(&self) -> &MemorySubstrate {
        &self.substrate
    }

    /// The substrate's resource counters.
    pub fn stats(&self) -> Arc<SubstrateStats> {
        self.substrate.stats()
    }

    /// Number of rows in one of the store's tables.
    pub fn rows(&self, table: Table) -> usize {
        let ctx = self.dm.context();
        self.substrate
            .row_count(ctx.tenant(), &ctx.pool().table_name(table))
            .unwrap_or_default()
    }

    /// Asserts that no table lease or cursor is still held.
    pub fn assert_released(&self) {
        assert_eq!(self.dm.context().pool().checked_out(), 0, "table lease leaked");
        assert_eq!(self.stats().open_cursors(), 0, "cursor leaked");
    }

    /// Runs `f` with substrate writes failing.
    pub fn with_failing_writes<R>(&self, f: impl FnOnce(&DeviceManagement) -> R) -> R {
        self.substrate.set_fail_writes(true);
        let result = f(&self.dm);
        self.substrate.set_fail_writes(false);
        result
    }

    /// Runs `f` with substrate reads failing.
    pub fn with_failing_reads<R>(&self, f: impl FnOnce(&DeviceManagement) -> R) -> R {
        self.substrate.set_fail_reads(true);
        let result = f(&self.dm);
        self.substrate.set_fail_reads(false);
        result
    }

    /// Creates an area type.
    pub fn sample_area_type(&self, name: &str) -> AreaType {
        self.area_types()
            .create(&requests::area_type(name))
            .expect("Failed to create area type")
    }

    /// Creates a root area.
    pub fn sample_area(&self, name: &str) -> Area {
        self.areas()
            .create(&requests::area(name))
            .expect("Failed to create area")
    }

    /// Creates a zone in an area.
    pub fn sample_zone(&self, area_token: &str, name: &str) -> Zone {
        self.zones()
            .create(&requests::zone(area_token, name))
            .expect("Failed to create zone")
    }

    /// Creates a device type.
    pub fn sample_device_type(&self, name: &str) -> DeviceType {
        self.device_types()
            .create(&requests::device_type(name))
            .expect("Failed to create device type")
    }

    /// Creates a device of a fresh device type.
    pub fn sample_device(&self) -> Device {
        let device_type = self.sample_device_type("sample");
        self.devices()
            .create(&requests::device(&device_type.token))
            .expect("Failed to create device")
    }

    /// Assigns a device to an area.
    pub fn sample_assignment(&self, device_token: &str, area_token: &str) -> DeviceAssignment {
        self.assignments()
            .create(&requests::assignment(device_token, area_token))
            .expect("Failed to create assignment")
    }

    /// Creates a device group.
    pub fn sample_group(&self, name: &str) -> DeviceGroup {
        self.groups()
            .create(&requests::group(name))
            .expect("Failed to create group")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = DeviceManagement;

    fn deref(&self) -> &Self::Target {
        &self.dm
    }
}

/// Minimal valid requests for each family.
pub mod requests {
    use devicestore_core::model::{
        AreaRequest, AreaTypeRequest, DeviceAssignmentRequest, DeviceCommandRequest,
        DeviceGroupRequest, DeviceRequest, DeviceStatusRequest, DeviceStreamRequest,
        DeviceTypeRequest, ZoneRequest,
    };

    /// An area type request.
    pub fn area_type(name: &str) -> AreaTypeRequest {
        AreaTypeRequest {
            name: Some(name.to_string()),
            ..AreaTypeRequest::default()
        }
    }

    /// A root area request.
    pub fn area(name: &str) -> AreaRequest {
        AreaRequest {
            name: Some(name.to_string()),
            ..AreaRequest::default()
        }
    }

    /// A nested area request.
    pub fn child_area(parent_token: &str, name: &str) -> AreaRequest {
        AreaRequest {
            parent_area_token: Some(parent_token.to_string()),
            ..area(name)
        }
    }

    /// A zone request.
    pub fn zone(area_token: &str, name: &str) -> ZoneRequest {
        ZoneRequest {
            area_token: Some(area_token.to_string()),
            name: Some(name.to_string()),
            ..ZoneRequest::default()
        }
    }

    /// A device type request.
    pub fn device_type(name: &str) -> DeviceTypeRequest {
        DeviceTypeRequest {
            name: Some(name.to_string()),
            ..DeviceTypeRequest::default()
        }
    }

    /// A command request.
    pub fn command(device_type_token: &str, namespace: &str, name: &str) -> DeviceCommandRequest {
        DeviceCommandRequest {
            device_type_token: Some(device_type_token.to_string()),
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..DeviceCommandRequest::default()
        }
    }

    /// A status request.
    pub fn status(device_type_token: &str, code: &str) -> DeviceStatusRequest {
        DeviceStatusRequest {
            device_type_token: Some(device_type_token.to_string()),
            code: Some(code.to_string()),
            name: Some(code.to_string()),
            ..DeviceStatusRequest::default()
        }
    }

    /// A device request.
    pub fn device(device_type_token: &str) -> DeviceRequest {
        DeviceRequest {
            device_type_token: Some(device_type_token.to_string()),
            ..DeviceRequest::default()
        }
    }

    /// An assignment request.
    pub fn assignment(device_token: &str, area_token: &str) -> DeviceAssignmentRequest {
        DeviceAssignmentRequest {
            device_token: Some(device_token.to_string()),
            area_token: Some(area_token.to_string()),
            ..DeviceAssignmentRequest::default()
        }
    }

    /// A stream request.
    pub fn stream(assignment_token: &str, stream_id: &str) -> DeviceStreamRequest {
        DeviceStreamRequest {
            assignment_token: Some(assignment_token.to_string()),
            stream_id: Some(stream_id.to_string()),
            ..DeviceStreamRequest::default()
        }
    }

    /// A group request.
    pub fn group(name: &str) -> DeviceGroupRequest {
        DeviceGroupRequest {
            name: Some(name.to_string()),
            ..DeviceGroupRequest::default()
        }
    }
}
