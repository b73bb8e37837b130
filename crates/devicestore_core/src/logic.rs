//! Entity construction from requests.
//!
//! Pure functions that turn a request (plus the current entity, for
//! updates) into the value a store persists. They never touch the
//! substrate: token resolution and key allocation happen in the stores.
//!
//! Create functions validate required fields. Update functions overwrite
//! only the fields a request sets and stamp `updated_date`. Both reject
//! coordinates and opacities that are not finite.

use crate::error::Precondition;
use crate::model::{
    Area, AreaRequest, AreaType, AreaTypeRequest, AssignmentState, AssignmentStatus, Device, DeviceAssignment,
    DeviceAssignmentRequest, DeviceCommand, DeviceCommandRequest, DeviceGroup,
    DeviceGroupElement, DeviceGroupElementRequest, DeviceGroupRequest, DeviceRequest,
    DeviceStatus, DeviceStatusRequest, DeviceStream, DeviceStreamRequest, DeviceType,
    DeviceTypeRequest, Location, Zone, ZoneRequest,
};
use crate::types::EntityFamily;

/// Result of entity construction.
pub type LogicResult<T> = Result<T, Precondition>;

/// Returns a required string field, rejecting missing or blank values.
///
/// # Errors
///
/// Returns `MissingField` if the value is absent or blank.
pub fn require_field(
    family: EntityFamily,
    field: &'static str,
    value: Option<&String>,
) -> LogicResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(Precondition::MissingField { family, field }),
    }
}

fn require_finite(family: EntityFamily, field: &'static str, value: f64) -> LogicResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Precondition::NonFiniteValue { family, field })
    }
}

fn check_location(family: EntityFamily, location: &Location) -> LogicResult<()> {
    require_finite(family, "latitude", location.latitude)?;
    require_finite(family, "longitude", location.longitude)?;
    if let Some(elevation) = location.elevation {
        require_finite(family, "elevation", elevation)?;
    }
    Ok(())
}

/// Rejects bounds with a NaN or infinite coordinate.
///
/// # Errors
///
/// Returns `NonFiniteValue` naming the offending coordinate.
pub fn check_bounds(family: EntityFamily, bounds: &[Location]) -> LogicResult<()> {
    bounds.iter().try_for_each(|l| check_location(family, l))
}

/// Rejects presence state whose last location is not finite.
///
/// # Errors
///
/// Returns `NonFiniteValue` naming the offending coordinate.
pub fn check_assignment_state(state: &AssignmentState) -> LogicResult<()> {
    match &state.last_location {
        Some(location) => check_location(EntityFamily::DeviceAssignment, location),
        None => Ok(()),
    }
}

fn check_opacity(opacity: Option<f64>) -> LogicResult<()> {
    match opacity {
        Some(value) => require_finite(EntityFamily::Zone, "opacity", value),
        None => Ok(()),
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// Builds a new area type.
///
/// # Errors
///
/// Returns `MissingField` if the name is missing.
pub fn area_type(request: &AreaTypeRequest, token: String, now: u64) -> LogicResult<AreaType> {
    Ok(AreaType {
        token,
        name: require_field(EntityFamily::AreaType, "name", request.name.as_ref())?,
        description: request.description.clone(),
        icon: request.icon.clone(),
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to an area type.
#[must_use]
pub fn update_area_type(existing: &AreaType, request: &AreaTypeRequest, now: u64) -> AreaType {
    let mut updated = existing.clone();
    set(&mut updated.name, &request.name);
    set_opt(&mut updated.description, &request.description);
    set_opt(&mut updated.icon, &request.icon);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Builds a new area. Referenced tokens are resolved by the caller.
///
/// # Errors
///
/// Returns `MissingField` if the name is missing or `NonFiniteValue` for
/// bad bounds.
pub fn area(request: &AreaRequest, token: String, now: u64) -> LogicResult<Area> {
    let bounds = request.bounds.clone().unwrap_or_default();
    check_bounds(EntityFamily::Area, &bounds)?;
    Ok(Area {
        token,
        area_type_token: request.area_type_token.clone(),
        parent_area_token: request.parent_area_token.clone(),
        name: require_field(EntityFamily::Area, "name", request.name.as_ref())?,
        description: request.description.clone(),
        image_url: request.image_url.clone(),
        bounds,
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to an area.
///
/// # Errors
///
/// Returns `NonFiniteValue` for bad bounds.
pub fn update_area(existing: &Area, request: &AreaRequest, now: u64) -> LogicResult<Area> {
    if let Some(bounds) = &request.bounds {
        check_bounds(EntityFamily::Area, bounds)?;
    }
    let mut updated = existing.clone();
    set_opt(&mut updated.area_type_token, &request.area_type_token);
    set_opt(&mut updated.parent_area_token, &request.parent_area_token);
    set(&mut updated.name, &request.name);
    set_opt(&mut updated.description, &request.description);
    set_opt(&mut updated.image_url, &request.image_url);
    set(&mut updated.bounds, &request.bounds);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    Ok(updated)
}

/// Builds a new zone.
///
/// # Errors
///
/// Returns `MissingField` if the area token or name is missing, or
/// `NonFiniteValue` for bad bounds or opacity.
pub fn zone(request: &ZoneRequest, token: String, now: u64) -> LogicResult<Zone> {
    let bounds = request.bounds.clone().unwrap_or_default();
    check_bounds(EntityFamily::Zone, &bounds)?;
    check_opacity(request.opacity)?;
    Ok(Zone {
        token,
        area_token: require_field(EntityFamily::Zone, "area_token", request.area_token.as_ref())?,
        name: require_field(EntityFamily::Zone, "name", request.name.as_ref())?,
        bounds,
        border_color: request.border_color.clone(),
        fill_color: request.fill_color.clone(),
        opacity: request.opacity,
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a zone. The owning area never changes.
///
/// # Errors
///
/// Returns `NonFiniteValue` for bad bounds or opacity.
pub fn update_zone(existing: &Zone, request: &ZoneRequest, now: u64) -> LogicResult<Zone> {
    if let Some(bounds) = &request.bounds {
        check_bounds(EntityFamily::Zone, bounds)?;
    }
    check_opacity(request.opacity)?;
    let mut updated = existing.clone();
    set(&mut updated.name, &request.name);
    set(&mut updated.bounds, &request.bounds);
    set_opt(&mut updated.border_color, &request.border_color);
    set_opt(&mut updated.fill_color, &request.fill_color);
    set_opt(&mut updated.opacity, &request.opacity);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    Ok(updated)
}

/// Builds a new device type.
///
/// # Errors
///
/// Returns `MissingField` if the name is missing.
pub fn device_type(request: &DeviceTypeRequest, token: String, now: u64) -> LogicResult<DeviceType> {
    Ok(DeviceType {
        token,
        name: require_field(EntityFamily::DeviceType, "name", request.name.as_ref())?,
        description: request.description.clone(),
        image_url: request.image_url.clone(),
        container_policy: request.container_policy.unwrap_or_default(),
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a device type.
#[must_use]
pub fn update_device_type(existing: &DeviceType, request: &DeviceTypeRequest, now: u64) -> DeviceType {
    let mut updated = existing.clone();
    set(&mut updated.name, &request.name);
    set_opt(&mut updated.description, &request.description);
    set_opt(&mut updated.image_url, &request.image_url);
    set(&mut updated.container_policy, &request.container_policy);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Builds a new device command.
///
/// # Errors
///
/// Returns `MissingField` if the device type token or name is missing.
pub fn device_command(
    request: &DeviceCommandRequest,
    token: String,
    now: u64,
) -> LogicResult<DeviceCommand> {
    let family = EntityFamily::DeviceCommand;
    Ok(DeviceCommand {
        token,
        device_type_token: require_field(
            family,
            "device_type_token",
            request.device_type_token.as_ref(),
        )?,
        namespace: request.namespace.clone().unwrap_or_default(),
        name: require_field(family, "name", request.name.as_ref())?,
        description: request.description.clone(),
        parameters: request.parameters.clone().unwrap_or_default(),
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a device command.
#[must_use]
pub fn update_device_command(
    existing: &DeviceCommand,
    request: &DeviceCommandRequest,
    now: u64,
) -> DeviceCommand {
    let mut updated = existing.clone();
    set(&mut updated.namespace, &request.namespace);
    set(&mut updated.name, &request.name);
    set_opt(&mut updated.description, &request.description);
    set(&mut updated.parameters, &request.parameters);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Builds a new device status.
///
/// # Errors
///
/// Returns `MissingField` if the device type token, code or name is missing.
pub fn device_status(
    request: &DeviceStatusRequest,
    token: String,
    now: u64,
) -> LogicResult<DeviceStatus> {
    let family = EntityFamily::DeviceStatus;
    Ok(DeviceStatus {
        token,
        device_type_token: require_field(
            family,
            "device_type_token",
            request.device_type_token.as_ref(),
        )?,
        code: require_field(family, "code", request.code.as_ref())?,
        name: require_field(family, "name", request.name.as_ref())?,
        background_color: request.background_color.clone(),
        foreground_color: request.foreground_color.clone(),
        border_color: request.border_color.clone(),
        icon: request.icon.clone(),
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a device status.
#[must_use]
pub fn update_device_status(
    existing: &DeviceStatus,
    request: &DeviceStatusRequest,
    now: u64,
) -> DeviceStatus {
    let mut updated = existing.clone();
    set(&mut updated.code, &request.code);
    set(&mut updated.name, &request.name);
    set_opt(&mut updated.background_color, &request.background_color);
    set_opt(&mut updated.foreground_color, &request.foreground_color);
    set_opt(&mut updated.border_color, &request.border_color);
    set_opt(&mut updated.icon, &request.icon);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Builds a new device.
///
/// # Errors
///
/// Returns `MissingField` if the device type token is missing.
pub fn device(request: &DeviceRequest, token: String, now: u64) -> LogicResult<Device> {
    Ok(Device {
        token,
        device_type_token: require_field(
            EntityFamily::Device,
            "device_type_token",
            request.device_type_token.as_ref(),
        )?,
        parent_device_token: request.parent_device_token.clone(),
        comments: request.comments.clone(),
        status: request.status.clone(),
        active_assignment_token: None,
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a device.
#[must_use]
pub fn update_device(existing: &Device, request: &DeviceRequest, now: u64) -> Device {
    let mut updated = existing.clone();
    set(&mut updated.device_type_token, &request.device_type_token);
    set_opt(&mut updated.parent_device_token, &request.parent_device_token);
    set_opt(&mut updated.comments, &request.comments);
    set_opt(&mut updated.status, &request.status);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Builds a new, active assignment.
///
/// # Errors
///
/// Returns `MissingField` if the device or area token is missing.
pub fn device_assignment(
    request: &DeviceAssignmentRequest,
    token: String,
    now: u64,
) -> LogicResult<DeviceAssignment> {
    let family = EntityFamily::DeviceAssignment;
    Ok(DeviceAssignment {
        token,
        device_token: require_field(family, "device_token", request.device_token.as_ref())?,
        area_token: require_field(family, "area_token", request.area_token.as_ref())?,
        status: AssignmentStatus::Active,
        active_date: now,
        released_date: None,
        state: None,
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to an assignment. Only metadata is mutable here;
/// status and state have their own operations.
#[must_use]
pub fn update_device_assignment(
    existing: &DeviceAssignment,
    request: &DeviceAssignmentRequest,
    now: u64,
) -> DeviceAssignment {
    let mut updated = existing.clone();
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Marks an assignment released.
///
/// # Errors
///
/// Returns `AssignmentNotActive` if it was already released.
pub fn release_assignment(existing: &DeviceAssignment, now: u64) -> LogicResult<DeviceAssignment> {
    if !existing.is_active() {
        return Err(Precondition::AssignmentNotActive {
            assignment_token: existing.token.clone(),
        });
    }
    let mut released = existing.clone();
    released.status = AssignmentStatus::Released;
    released.released_date = Some(now);
    released.updated_date = Some(now);
    Ok(released)
}

/// Builds a new device group.
///
/// # Errors
///
/// Returns `MissingField` if the name is missing.
pub fn device_group(request: &DeviceGroupRequest, token: String, now: u64) -> LogicResult<DeviceGroup> {
    Ok(DeviceGroup {
        token,
        name: require_field(EntityFamily::DeviceGroup, "name", request.name.as_ref())?,
        description: request.description.clone(),
        image_url: request.image_url.clone(),
        roles: request.roles.clone().unwrap_or_default(),
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a device group.
#[must_use]
pub fn update_device_group(existing: &DeviceGroup, request: &DeviceGroupRequest, now: u64) -> DeviceGroup {
    let mut updated = existing.clone();
    set(&mut updated.name, &request.name);
    set_opt(&mut updated.description, &request.description);
    set_opt(&mut updated.image_url, &request.image_url);
    set(&mut updated.roles, &request.roles);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

/// Checks that an element request references exactly one member and that
/// the member is not the group itself.
///
/// # Errors
///
/// Returns `InvalidGroupElement` or `SelfReferencingGroup`.
pub fn validate_group_element(group_token: &str, request: &DeviceGroupElementRequest) -> LogicResult<()> {
    match (&request.device_token, &request.nested_group_token) {
        (Some(_), None) => Ok(()),
        (None, Some(nested)) if nested == group_token => Err(Precondition::SelfReferencingGroup {
            group_token: group_token.to_string(),
        }),
        (None, Some(_)) => Ok(()),
        _ => Err(Precondition::InvalidGroupElement),
    }
}

/// Builds a group element at an allocated index.
///
/// # Errors
///
/// Returns the errors of [`validate_group_element`].
pub fn group_element(
    group_token: &str,
    index: i64,
    request: &DeviceGroupElementRequest,
) -> LogicResult<DeviceGroupElement> {
    validate_group_element(group_token, request)?;
    Ok(DeviceGroupElement {
        group_token: group_token.to_string(),
        index,
        device_token: request.device_token.clone(),
        nested_group_token: request.nested_group_token.clone(),
        roles: request.roles.clone(),
    })
}

/// Builds a new device stream.
///
/// # Errors
///
/// Returns `MissingField` if the assignment token or stream id is missing.
pub fn device_stream(request: &DeviceStreamRequest, token: String, now: u64) -> LogicResult<DeviceStream> {
    let family = EntityFamily::DeviceStream;
    Ok(DeviceStream {
        token,
        assignment_token: require_field(family, "assignment_token", request.assignment_token.as_ref())?,
        stream_id: require_field(family, "stream_id", request.stream_id.as_ref())?,
        content_type: request.content_type.clone(),
        metadata: request.metadata.clone().unwrap_or_default(),
        created_date: now,
        updated_date: None,
        deleted: false,
    })
}

/// Applies an update to a device stream. The stream id never changes.
#[must_use]
pub fn update_device_stream(existing: &DeviceStream, request: &DeviceStreamRequest, now: u64) -> DeviceStream {
    let mut updated = existing.clone();
    set_opt(&mut updated.content_type, &request.content_type);
    set(&mut updated.metadata, &request.metadata);
    updated.updated_date = Some(now);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    #[test]
    fn blank_name_is_rejected() {
        let request = AreaTypeRequest {
            name: Some("   ".into()),
            ..AreaTypeRequest::default()
        };
        assert_eq!(
            area_type(&request, "t".into(), 1).unwrap_err(),
            Precondition::MissingField {
                family: EntityFamily::AreaType,
                field: "name"
            }
        );
    }

    #[test]
    fn update_only_touches_set_fields() {
        let request = AreaRequest {
            name: Some("Plant 1".into()),
            description: Some("north".into()),
            ..AreaRequest::default()
        };
        let area = area(&request, "a".into(), 10).unwrap();

        let mut metadata = Metadata::new();
        metadata.insert("k".into(), "v".into());
        let update = AreaRequest {
            metadata: Some(metadata.clone()),
            ..AreaRequest::default()
        };
        let updated = update_area(&area, &update, 20).unwrap();

        assert_eq!(updated.name, "Plant 1");
        assert_eq!(updated.description.as_deref(), Some("north"));
        assert_eq!(updated.metadata, metadata);
        assert_eq!(updated.created_date, 10);
        assert_eq!(updated.updated_date, Some(20));
    }

    #[test]
    fn zone_requires_area() {
        let request = ZoneRequest {
            name: Some("dock".into()),
            ..ZoneRequest::default()
        };
        assert!(matches!(
            zone(&request, "z".into(), 1),
            Err(Precondition::MissingField { field: "area_token", .. })
        ));
    }

    #[test]
    fn non_finite_geometry_is_rejected() {
        let request = ZoneRequest {
            area_token: Some("a".into()),
            name: Some("dock".into()),
            opacity: Some(f64::INFINITY),
            ..ZoneRequest::default()
        };
        assert_eq!(
            zone(&request, "z".into(), 1).unwrap_err(),
            Precondition::NonFiniteValue {
                family: EntityFamily::Zone,
                field: "opacity"
            }
        );

        let request = AreaRequest {
            name: Some("Yard".into()),
            bounds: Some(vec![Location::new(1.0, 2.0), Location::new(f64::NAN, 2.0)]),
            ..AreaRequest::default()
        };
        assert!(matches!(
            area(&request, "a".into(), 1),
            Err(Precondition::NonFiniteValue { field: "latitude", .. })
        ));

        let existing = area(&AreaRequest { bounds: None, ..request }, "a".into(), 1).unwrap();
        let mut high = Location::new(1.0, 2.0);
        high.elevation = Some(f64::NEG_INFINITY);
        let update = AreaRequest {
            bounds: Some(vec![high]),
            ..AreaRequest::default()
        };
        assert!(matches!(
            update_area(&existing, &update, 2),
            Err(Precondition::NonFiniteValue { field: "elevation", .. })
        ));

        let state = AssignmentState {
            last_interaction_date: None,
            presence_missing_date: None,
            last_location: Some(Location::new(0.0, f64::INFINITY)),
        };
        assert_eq!(
            check_assignment_state(&state),
            Err(Precondition::NonFiniteValue {
                family: EntityFamily::DeviceAssignment,
                field: "longitude"
            })
        );
    }

    #[test]
    fn release_is_one_way() {
        let request = DeviceAssignmentRequest {
            device_token: Some("d".into()),
            area_token: Some("a".into()),
            ..DeviceAssignmentRequest::default()
        };
        let assignment = device_assignment(&request, "x".into(), 5).unwrap();
        assert!(assignment.is_active());

        let released = release_assignment(&assignment, 9).unwrap();
        assert_eq!(released.status, AssignmentStatus::Released);
        assert_eq!(released.released_date, Some(9));
        assert!(matches!(
            release_assignment(&released, 10),
            Err(Precondition::AssignmentNotActive { .. })
        ));
    }

    #[test]
    fn group_element_references_exactly_one_member() {
        assert!(validate_group_element("g", &DeviceGroupElementRequest::device("d")).is_ok());
        assert!(validate_group_element("g", &DeviceGroupElementRequest::group("h")).is_ok());
        assert_eq!(
            validate_group_element("g", &DeviceGroupElementRequest::default()),
            Err(Precondition::InvalidGroupElement)
        );
        let both = DeviceGroupElementRequest {
            device_token: Some("d".into()),
            nested_group_token: Some("h".into()),
            roles: Vec::new(),
        };
        assert_eq!(
            validate_group_element("g", &both),
            Err(Precondition::InvalidGroupElement)
        );
        assert_eq!(
            validate_group_element("g", &DeviceGroupElementRequest::group("g")),
            Err(Precondition::SelfReferencingGroup {
                group_token: "g".into()
            })
        );
    }

    #[test]
    fn stream_update_keeps_stream_id() {
        let request = DeviceStreamRequest {
            assignment_token: Some("x".into()),
            stream_id: Some("video".into()),
            ..DeviceStreamRequest::default()
        };
        let stream = device_stream(&request, "s".into(), 1).unwrap();
        let update = DeviceStreamRequest {
            stream_id: Some("audio".into()),
            content_type: Some("video/mp4".into()),
            ..DeviceStreamRequest::default()
        };
        let updated = update_device_stream(&stream, &update, 2);
        assert_eq!(updated.stream_id, "video");
        assert_eq!(updated.content_type.as_deref(), Some("video/mp4"));
    }
}
