//! Core type definitions for DeviceStore.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The entity families persisted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityFamily {
    /// Area type.
    AreaType,
    /// Area (site).
    Area,
    /// Zone within an area.
    Zone,
    /// Device type (specification).
    DeviceType,
    /// Command defined on a device type.
    DeviceCommand,
    /// Status defined on a device type.
    DeviceStatus,
    /// Device.
    Device,
    /// Assignment of a device to an area.
    DeviceAssignment,
    /// Device group.
    DeviceGroup,
    /// Element of a device group.
    DeviceGroupElement,
    /// Data stream attached to an assignment.
    DeviceStream,
}

impl EntityFamily {
    /// Human-readable family name, used in error messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AreaType => "area type",
            Self::Area => "area",
            Self::Zone => "zone",
            Self::DeviceType => "device type",
            Self::DeviceCommand => "device command",
            Self::DeviceStatus => "device status",
            Self::Device => "device",
            Self::DeviceAssignment => "device assignment",
            Self::DeviceGroup => "device group",
            Self::DeviceGroupElement => "device group element",
            Self::DeviceStream => "device stream",
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
