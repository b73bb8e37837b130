//! Entity and request types.
//!
//! Entities are what the stores persist and return. Requests carry the
//! caller's fields for create and update alike: on update, `None` leaves
//! the current value untouched.

mod area;
mod assignment;
mod device;
mod group;

pub use area::{Area, AreaRequest, AreaType, AreaTypeRequest, Zone, ZoneRequest};
pub use assignment::{
    AssignmentState, AssignmentStatus, DeviceAssignment, DeviceAssignmentRequest, DeviceStream,
    DeviceStreamRequest,
};
pub use device::{
    CommandParameter, ContainerPolicy, Device, DeviceCommand, DeviceCommandRequest, DeviceRequest,
    DeviceStatus, DeviceStatusRequest, DeviceType, DeviceTypeRequest, ParameterType,
};
pub use group::{DeviceGroup, DeviceGroupElement, DeviceGroupElementRequest, DeviceGroupRequest};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form string metadata attached to entities.
pub type Metadata = BTreeMap<String, String>;

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Elevation in meters.
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl Location {
    /// Creates a location without elevation.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }
}

/// Common bookkeeping shared by every persisted entity.
pub trait PersistentEntity {
    /// External token.
    fn token(&self) -> &str;

    /// Creation time in millis.
    fn created_date(&self) -> u64;

    /// True if the entity carries the soft-delete marker.
    fn is_deleted(&self) -> bool;

    /// Sets the soft-delete flag from the row's marker column.
    fn set_deleted(&mut self, deleted: bool);
}

macro_rules! persistent_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::model::PersistentEntity for $ty {
                fn token(&self) -> &str {
                    &self.token
                }

                fn created_date(&self) -> u64 {
                    self.created_date
                }

                fn is_deleted(&self) -> bool {
                    self.deleted
                }

                fn set_deleted(&mut self, deleted: bool) {
                    self.deleted = deleted;
                }
            }
        )+
    };
}

persistent_entity!(
    AreaType,
    Area,
    Zone,
    DeviceType,
    DeviceCommand,
    DeviceStatus,
    Device,
    DeviceAssignment,
    DeviceGroup,
    DeviceStream,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_elevation_defaults_to_none() {
        let location: Location =
            serde_json::from_str(r#"{"latitude": 33.75, "longitude": -84.39}"#).unwrap();
        assert_eq!(location, Location::new(33.75, -84.39));
    }

    #[test]
    fn deleted_flag_through_trait() {
        let mut zone = Zone {
            token: "z".into(),
            area_token: "a".into(),
            name: "dock".into(),
            ..Zone::default()
        };
        assert!(!zone.is_deleted());
        zone.set_deleted(true);
        assert!(zone.is_deleted());
        assert_eq!(PersistentEntity::token(&zone), "z");
    }
}
