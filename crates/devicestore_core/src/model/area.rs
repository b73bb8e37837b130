use super::{Location, Metadata};
use serde::{Deserialize, Serialize};

/// A category of areas, such as "warehouse" or "campus".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaType {
    /// External token.
    pub token: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
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
    /// Soft-delete flag, taken from the row marker on read.
    #[serde(default)]
    pub deleted: bool,
}

/// Fields for creating or updating an [`AreaType`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaTypeRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Display name, required on create.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Icon identifier.
    pub icon: Option<String>,
    /// Metadata, replacing the current map on update.
    pub metadata: Option<Metadata>,
}

/// A physical site. Areas may nest under a parent area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// External token.
    pub token: String,
    /// Area type token.
    #[serde(default)]
    pub area_type_token: Option<String>,
    /// Parent area token; `None` for root areas.
    #[serde(default)]
    pub parent_area_token: Option<String>,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Boundary polygon.
    #[serde(default)]
    pub bounds: Vec<Location>,
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

/// Fields for creating or updating an [`Area`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Area type token; must resolve when given.
    pub area_type_token: Option<String>,
    /// Parent area token; must resolve when given.
    pub parent_area_token: Option<String>,
    /// Display name, required on create.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Boundary polygon.
    pub bounds: Option<Vec<Location>>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}

/// A region inside an area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// External token.
    pub token: String,
    /// Owning area.
    pub area_token: String,
    /// Display name.
    pub name: String,
    /// Boundary polygon.
    #[serde(default)]
    pub bounds: Vec<Location>,
    /// Border color.
    #[serde(default)]
    pub border_color: Option<String>,
    /// Fill color.
    #[serde(default)]
    pub fill_color: Option<String>,
    /// Fill opacity in `0.0..=1.0`.
    #[serde(default)]
    pub opacity: Option<f64>,
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

/// Fields for creating or updating a [`Zone`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRequest {
    /// Token to use instead of a generated one. Ignored on update.
    pub token: Option<String>,
    /// Owning area, required on create. Ignored on update.
    pub area_token: Option<String>,
    /// Display name, required on create.
    pub name: Option<String>,
    /// Boundary polygon.
    pub bounds: Option<Vec<Location>>,
    /// Border color.
    pub border_color: Option<String>,
    /// Fill color.
    pub fill_color: Option<String>,
    /// Fill opacity.
    pub opacity: Option<f64>,
    /// Metadata.
    pub metadata: Option<Metadata>,
}
