use super::Metadata;
use serde::{Deserialize, Serialize};

/// A named collection of devices and nested groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroup {
    /// External token.
    pub token: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Roles the group plays.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Creation time in millis.
    pub created_date: u64,
    /// Last update time in millis.
    #[serde(default)]
    pub updated_date: Option<u64>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
}

/// Fields for creating or updating a [`DeviceGroup`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroupRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Display name, required on create.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Roles.
    pub roles: Option<Vec<String>>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}

/// One member of a group: a device or a nested group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroupElement {
    /// Owning group.
    pub group_token: String,
    /// Position in the group, allocated in insertion order.
    pub index: i64,
    /// Referenced device.
    #[serde(default)]
    pub device_token: Option<String>,
    /// Referenced nested group.
    #[serde(default)]
    pub nested_group_token: Option<String>,
    /// Roles the member plays within the group.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Fields for adding a [`DeviceGroupElement`].
///
/// Exactly one of `device_token` and `nested_group_token` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroupElementRequest {
    /// Device to add.
    pub device_token: Option<String>,
    /// Group to nest.
    pub nested_group_token: Option<String>,
    /// Roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl DeviceGroupElementRequest {
    /// An element referencing a device.
    pub fn device(token: impl Into<String>) -> Self {
        Self {
            device_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// An element referencing a nested group.
    pub fn group(token: impl Into<String>) -> Self {
        Self {
            nested_group_token: Some(token.into()),
            ..Self::default()
        }
    }
}
