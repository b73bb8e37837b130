//! Property-based test generators using proptest.
//!
//! Strategies produce requests that pass validation, so properties can
//! focus on storage behavior.

use devicestore_core::model::{
    AreaRequest, AssignmentState, CommandParameter, DeviceGroupRequest, Location, Metadata,
    ParameterType, ZoneRequest,
};
use devicestore_core::SearchCriteria;
use proptest::prelude::*;

/// Strategy for caller-supplied tokens.
pub fn token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,23}").expect("Invalid regex")
}

/// Strategy for non-blank display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,31}").expect("Invalid regex")
}

/// Strategy for entity metadata.
pub fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        ".{0,16}",
        0..4,
    )
}

/// Strategy for locations with finite coordinates.
pub fn location_strategy() -> impl Strategy<Value = Location> {
    (-90.0f64..90.0, -180.0f64..180.0, prop::option::of(-500.0f64..9000.0)).prop_map(
        |(latitude, longitude, elevation)| Location {
            latitude,
            longitude,
            elevation,
        },
    )
}

/// Strategy for root area requests.
pub fn area_request_strategy() -> impl Strategy<Value = AreaRequest> {
    (
        name_strategy(),
        prop::option::of(".{0,32}"),
        prop::collection::vec(location_strategy(), 0..5),
        metadata_strategy(),
    )
        .prop_map(|(name, description, bounds, metadata)| AreaRequest {
            name: Some(name),
            description,
            bounds: Some(bounds),
            metadata: Some(metadata),
            ..AreaRequest::default()
        })
}

/// Strategy for zone requests in `area_token`.
pub fn zone_request_strategy(area_token: String) -> impl Strategy<Value = ZoneRequest> {
    (
        name_strategy(),
        prop::collection::vec(location_strategy(), 0..5),
        prop::option::of(0.0f64..1.0),
    )
        .prop_map(move |(name, bounds, opacity)| ZoneRequest {
            area_token: Some(area_token.clone()),
            name: Some(name),
            bounds: Some(bounds),
            opacity,
            ..ZoneRequest::default()
        })
}

/// Strategy for command parameter lists.
pub fn parameters_strategy() -> impl Strategy<Value = Vec<CommandParameter>> {
    let parameter_type = prop_oneof![
        Just(ParameterType::Double),
        Just(ParameterType::Int64),
        Just(ParameterType::String),
        Just(ParameterType::Bool),
    ];
    prop::collection::vec(
        (name_strategy(), parameter_type, any::<bool>()).prop_map(|(name, parameter_type, required)| {
            CommandParameter {
                name,
                parameter_type,
                required,
            }
        }),
        0..4,
    )
}

/// Strategy for group requests.
pub fn group_request_strategy() -> impl Strategy<Value = DeviceGroupRequest> {
    (
        name_strategy(),
        prop::collection::vec("[a-z]{1,8}", 0..3),
        metadata_strategy(),
    )
        .prop_map(|(name, roles, metadata)| DeviceGroupRequest {
            name: Some(name),
            roles: Some(roles),
            metadata: Some(metadata),
            ..DeviceGroupRequest::default()
        })
}

/// Strategy for assignment presence state.
pub fn assignment_state_strategy() -> impl Strategy<Value = AssignmentState> {
    (
        prop::option::of(0u64..4_000_000_000_000),
        prop::option::of(0u64..4_000_000_000_000),
        prop::option::of(location_strategy()),
    )
        .prop_map(|(last_interaction_date, presence_missing_date, last_location)| AssignmentState {
            last_interaction_date,
            presence_missing_date,
            last_location,
        })
}

/// Strategy for paging criteria; a page size of zero means unpaged.
pub fn paging_strategy() -> impl Strategy<Value = SearchCriteria> {
    (1usize..5, 0usize..6).prop_map(|(page, size)| SearchCriteria::new(page, size))
}
