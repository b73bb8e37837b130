use super::Metadata;
use serde::{Deserialize, Serialize};

/// Whether devices of a type may contain other devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerPolicy {
    /// The device stands alone.
    #[default]
    Standalone,
    /// The device may have nested child devices.
    Composite,
}

/// A device specification: the model every device of this type follows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
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
    /// Container policy.
    #[serde(default)]
    pub container_policy: ContainerPolicy,
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

/// Fields for creating or updating a [`DeviceType`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTypeRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Display name, required on create.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Container policy.
    pub container_policy: Option<ContainerPolicy>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}

/// Wire type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    /// 64-bit float.
    Double,
    /// 32-bit float.
    Float,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
}

/// One parameter of a device command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandParameter {
    /// Parameter name.
    pub name: String,
    /// Wire type.
    pub parameter_type: ParameterType,
    /// Whether callers must supply it.
    #[serde(default)]
    pub required: bool,
}

/// A command devices of a type understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    /// External token.
    pub token: String,
    /// Owning device type.
    pub device_type_token: String,
    /// Namespace, unique together with `name` within a device type.
    #[serde(default)]
    pub namespace: String,
    /// Command name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Parameters.
    #[serde(default)]
    pub parameters: Vec<CommandParameter>,
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

/// Fields for creating or updating a [`DeviceCommand`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommandRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Owning device type, required on create. Ignored on update.
    pub device_type_token: Option<String>,
    /// Namespace.
    pub namespace: Option<String>,
    /// Command name, required on create.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Parameters.
    pub parameters: Option<Vec<CommandParameter>>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}

/// A status code devices of a type may report, with display hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// External token.
    pub token: String,
    /// Owning device type.
    pub device_type_token: String,
    /// Status code, unique within a device type.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Background color.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Foreground color.
    #[serde(default)]
    pub foreground_color: Option<String>,
    /// Border color.
    #[serde(default)]
    pub border_color: Option<String>,
    /// Icon identifier.
    #[serde(default)]
    pub icon: Option<String>,
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

/// Fields for creating or updating a [`DeviceStatus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Owning device type, required on create. Ignored on update.
    pub device_type_token: Option<String>,
    /// Status code, required on create.
    pub code: Option<String>,
    /// Display name, required on create.
    pub name: Option<String>,
    /// Background color.
    pub background_color: Option<String>,
    /// Foreground color.
    pub foreground_color: Option<String>,
    /// Border color.
    pub border_color: Option<String>,
    /// Icon identifier.
    pub icon: Option<String>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}

/// A physical or virtual device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// External token.
    pub token: String,
    /// Device type token.
    pub device_type_token: String,
    /// Parent device for composite devices.
    #[serde(default)]
    pub parent_device_token: Option<String>,
    /// Free-form comments.
    #[serde(default)]
    pub comments: Option<String>,
    /// Last reported status code.
    #[serde(default)]
    pub status: Option<String>,
    /// Active assignment, taken from the device row's side column on read.
    #[serde(skip)]
    pub active_assignment_token: Option<String>,
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

/// Fields for creating or updating a [`Device`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Device type token, required on create; must resolve.
    pub device_type_token: Option<String>,
    /// Parent device token; must resolve when given.
    pub parent_device_token: Option<String>,
    /// Comments.
    pub comments: Option<String>,
    /// Status code.
    pub status: Option<String>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}
