use super::{Location, Metadata};
use serde::{Deserialize, Serialize};

/// Lifecycle of an assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentStatus {
    /// The device is assigned and reporting.
    #[default]
    Active,
    /// The device is assigned but has stopped reporting.
    Missing,
    /// The assignment has ended.
    Released,
}

impl AssignmentStatus {
    /// Single-byte code stored in the status column.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Active => b'A',
            Self::Missing => b'M',
            Self::Released => b'R',
        }
    }

    /// Parses a status column code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b'A' => Some(Self::Active),
            b'M' => Some(Self::Missing),
            b'R' => Some(Self::Released),
            _ => None,
        }
    }
}

/// Presence tracking for an assignment, written separately from its payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentState {
    /// Last time any event arrived for the assignment.
    #[serde(default)]
    pub last_interaction_date: Option<u64>,
    /// When the device was flagged missing, if it is.
    #[serde(default)]
    pub presence_missing_date: Option<u64>,
    /// Last reported location.
    #[serde(default)]
    pub last_location: Option<Location>,
}

/// The association of a device with an area over a period of time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceAssignment {
    /// External token.
    pub token: String,
    /// Assigned device.
    pub device_token: String,
    /// Area the device is assigned to.
    pub area_token: String,
    /// Status. The status column overrides the payload on read.
    #[serde(default)]
    pub status: AssignmentStatus,
    /// Start of the assignment in millis.
    pub active_date: u64,
    /// End of the assignment in millis.
    #[serde(default)]
    pub released_date: Option<u64>,
    /// Presence state. The state columns override the payload on read.
    #[serde(default)]
    pub state: Option<AssignmentState>,
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

impl DeviceAssignment {
    /// Returns true unless the assignment has been released.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != AssignmentStatus::Released
    }
}

/// Fields for creating or updating a [`DeviceAssignment`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceAssignmentRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Device to assign, required on create. Ignored on update.
    pub device_token: Option<String>,
    /// Area to assign to, required on create. Ignored on update.
    pub area_token: Option<String>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}

/// A named data stream attached to an assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStream {
    /// External token.
    pub token: String,
    /// Owning assignment.
    pub assignment_token: String,
    /// Stream id, unique within the assignment.
    pub stream_id: String,
    /// MIME type of the stream's chunks.
    #[serde(default)]
    pub content_type: Option<String>,
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

/// Fields for creating or updating a [`DeviceStream`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStreamRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Owning assignment, required on create. Ignored on update.
    pub assignment_token: Option<String>,
    /// Stream id, required on create. Ignored on update.
    pub stream_id: Option<String>,
    /// MIME type.
    pub content_type: Option<String>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}
