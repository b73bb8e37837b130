//! Create, read, soft delete and force delete across every family.

use devicestore_codec::PayloadEncoding;
use devicestore_core::model::{
    AssignmentState, CommandParameter, DeviceGroupElementRequest, Location, ParameterType,
};
use devicestore_core::schema::Table;
use devicestore_core::{
    EntityFamily, EntityStore, Precondition, StoreConfig, StreamSearchCriteria, ZoneSearchCriteria,
    SearchCriteria,
};
use devicestore_testkit::prelude::*;
use std::collections::BTreeMap;

fn exercise_every_family(store: &TestStore) {
    let area_type = store.sample_area_type("Warehouse");
    assert_eq!(store.area_types().require(&area_type.token).unwrap(), area_type);

    let mut area_request = requests::area("Atlanta DC");
    area_request.area_type_token = Some(area_type.token.clone());
    area_request.bounds = Some(vec![Location::new(33.75, -84.39), Location::new(33.76, -84.38)]);
    area_request.metadata = Some(BTreeMap::from([("region".to_string(), "south".to_string())]));
    let area = store.areas().create(&area_request).unwrap();
    assert_eq!(store.areas().require(&area.token).unwrap(), area);

    let child = store
        .areas()
        .create(&requests::child_area(&area.token, "Dock 4"))
        .unwrap();
    assert_eq!(store.areas().require(&child.token).unwrap(), child);

    let mut zone_request = requests::zone(&area.token, "Cold storage");
    zone_request.opacity = Some(0.4);
    let zone = store.zones().create(&zone_request).unwrap();
    assert_eq!(store.zones().require(&zone.token).unwrap(), zone);

    let device_type = store.sample_device_type("Tracker");
    assert_eq!(store.device_types().require(&device_type.token).unwrap(), device_type);

    let mut command_request = requests::command(&device_type.token, "fw", "update");
    command_request.parameters = Some(vec![CommandParameter {
        name: "version".into(),
        parameter_type: ParameterType::String,
        required: true,
    }]);
    let command = store.commands().create(&command_request).unwrap();
    assert_eq!(store.commands().require(&command.token).unwrap(), command);

    let status = store
        .statuses()
        .create(&requests::status(&device_type.token, "ok"))
        .unwrap();
    assert_eq!(store.statuses().require(&status.token).unwrap(), status);

    let device = store.devices().create(&requests::device(&device_type.token)).unwrap();
    assert_eq!(store.devices().require(&device.token).unwrap(), device);

    let assignment = store.sample_assignment(&device.token, &area.token);
    assert_eq!(store.assignments().require(&assignment.token).unwrap(), assignment);

    let state = AssignmentState {
        last_interaction_date: Some(1_700_000_000_000),
        presence_missing_date: None,
        last_location: Some(Location::new(1.0, 2.0)),
    };
    let updated = store.assignments().update_state(&assignment.token, &state).unwrap();
    assert_eq!(store.assignments().require(&assignment.token).unwrap(), updated);

    let stream = store
        .streams()
        .create(&requests::stream(&assignment.token, "telemetry"))
        .unwrap();
    assert_eq!(store.streams().require(&stream.token).unwrap(), stream);

    let group = store.sample_group("Fleet");
    assert_eq!(store.groups().require(&group.token).unwrap(), group);

    let elements = store
        .group_elements()
        .add_elements(&group.token, &[DeviceGroupElementRequest::device(&device.token)])
        .unwrap();
    assert_eq!(
        store.group_elements().get_element(&group.token, elements[0].index).unwrap(),
        Some(elements[0].clone())
    );
}

#[test]
fn every_family_reads_back_what_was_written_with_json() {
    init_test_logging();
    let store = TestStore::with_encoding(PayloadEncoding::Json);
    exercise_every_family(&store);
    store.assert_released();
}

#[test]
fn every_family_reads_back_what_was_written_with_cbor() {
    init_test_logging();
    let store = TestStore::with_encoding(PayloadEncoding::Cbor);
    exercise_every_family(&store);
    store.assert_released();
}

#[test]
fn rows_written_with_one_encoding_read_under_another() {
    let store = TestStore::with_encoding(PayloadEncoding::Json);
    let area = store.sample_area("Mixed");
    let zone = store.sample_zone(&area.token, "Old zone");

    let cbor = store.reopen(
        StoreConfig::new()
            .tenant(TEST_TENANT)
            .payload_encoding(PayloadEncoding::Cbor),
    );
    let newer = cbor.zones().create(&requests::zone(&area.token, "New zone")).unwrap();

    let listed = store
        .zones()
        .list(&ZoneSearchCriteria::for_area(&area.token), false)
        .unwrap();
    assert_eq!(listed.results, vec![newer, zone]);
}

#[test]
fn soft_delete_hides_from_lists_unless_asked() {
    let store = TestStore::new();
    let area = store.sample_area("Yard");
    let kept = store.sample_zone(&area.token, "kept");
    let dropped = store.sample_zone(&area.token, "dropped");

    let before = store.zones().delete(&dropped.token, false).unwrap();
    assert_eq!(before, dropped);

    let criteria = ZoneSearchCriteria::for_area(&area.token);
    let visible = store.zones().list(&criteria, false).unwrap();
    assert_eq!(visible.results, vec![kept.clone()]);

    let all = store.zones().list(&criteria, true).unwrap();
    assert_eq!(all.num_results, 2);
    let deleted = all.results.iter().find(|z| z.token == dropped.token).unwrap();
    assert!(deleted.deleted);
    assert!(store.zones().require(&dropped.token).unwrap().deleted);
    assert_eq!(store.rows(Table::Areas), 3);
}

#[test]
fn force_delete_frees_token_for_reuse() {
    let store = TestStore::new();
    let mut request = requests::area_type("Plant");
    request.token = Some("plant".into());
    let first = store.area_types().create(&request).unwrap();

    let removed = store.area_types().delete("plant", true).unwrap();
    assert_eq!(removed, first);
    assert_eq!(store.area_types().get_by_token("plant").unwrap(), None);
    assert_eq!(store.rows(Table::AreaTypes), 0);

    request.name = Some("Plant v2".into());
    let second = store.area_types().create(&request).unwrap();
    assert_eq!(second.token, "plant");
    assert_eq!(store.area_types().require("plant").unwrap().name, "Plant v2");
}

#[test]
fn force_deleted_child_token_can_be_reused() {
    let store = TestStore::new();
    let area = store.sample_area("Yard");
    let mut request = requests::zone(&area.token, "gate");
    request.token = Some("gate".into());
    store.zones().create(&request).unwrap();

    let err = store.zones().create(&request).unwrap_err();
    assert!(matches!(
        err.precondition(),
        Some(Precondition::DuplicateToken { family: EntityFamily::Zone, .. })
    ));

    store.zones().delete("gate", true).unwrap();
    assert_eq!(store.zones().get_by_token("gate").unwrap(), None);
    let again = store.zones().create(&request).unwrap();
    assert_eq!(store.zones().require("gate").unwrap(), again);
}

#[test]
fn unknown_tokens_are_not_found_or_invalid() {
    let store = TestStore::new();
    assert_eq!(store.devices().get_by_token("missing").unwrap(), None);
    assert!(store
        .devices()
        .require("missing")
        .unwrap_err()
        .is_invalid_token(EntityFamily::Device));

    let err = store
        .zones()
        .create(&requests::zone("no-such-area", "z"))
        .unwrap_err();
    assert!(err.is_invalid_token(EntityFamily::Area));

    let err = store
        .streams()
        .list(&StreamSearchCriteria::for_assignment("nope"), false)
        .unwrap_err();
    assert!(err.is_invalid_token(EntityFamily::DeviceAssignment));
}

#[test]
fn paging_splits_listing() {
    let store = TestStore::new();
    let area = store.sample_area("Yard");
    for i in 0..5 {
        store.sample_zone(&area.token, &format!("z{i}"));
    }

    let mut criteria = ZoneSearchCriteria::for_area(&area.token);
    criteria.paging = SearchCriteria::new(2, 2);
    let page = store.zones().list(&criteria, false).unwrap();
    assert_eq!(page.num_results, 5);
    let names: Vec<_> = page.results.iter().map(|z| z.name.as_str()).collect();
    assert_eq!(names, ["z2", "z1"]);
}

#[test]
fn non_finite_geometry_is_rejected_without_writing() {
    let store = TestStore::new();
    let area = store.sample_area("Yard");
    let zone = store.sample_zone(&area.token, "dock");
    let rows = store.rows(Table::Areas);

    let mut request = requests::zone(&area.token, "glare");
    request.token = Some("glare".into());
    request.opacity = Some(f64::INFINITY);
    let err = store.zones().create(&request).unwrap_err();
    assert_eq!(
        err.precondition(),
        Some(&Precondition::NonFiniteValue {
            family: EntityFamily::Zone,
            field: "opacity",
        })
    );

    request.opacity = None;
    request.bounds = Some(vec![Location::new(f64::INFINITY, 0.0)]);
    let err = store.zones().create(&request).unwrap_err();
    assert!(matches!(
        err.precondition(),
        Some(Precondition::NonFiniteValue { field: "latitude", .. })
    ));
    assert_eq!(store.rows(Table::Areas), rows);
    assert_eq!(store.zones().get_by_token("glare").unwrap(), None);

    let mut update = requests::zone(&area.token, "dock");
    update.opacity = Some(f64::NAN);
    assert!(store.zones().update(&zone.token, &update).is_err());
    assert_eq!(store.zones().require(&zone.token).unwrap(), zone);

    let mut area_update = requests::area("Yard");
    area_update.bounds = Some(vec![Location::new(1.0, f64::NEG_INFINITY)]);
    let err = store.areas().update(&area.token, &area_update).unwrap_err();
    assert!(matches!(
        err.precondition(),
        Some(Precondition::NonFiniteValue { family: EntityFamily::Area, .. })
    ));

    // Everything stored still decodes.
    let listed = store
        .zones()
        .list(&ZoneSearchCriteria::for_area(&area.token), false)
        .unwrap();
    assert_eq!(listed.results, vec![zone]);
    store.assert_released();
}

#[test]
fn non_finite_last_location_is_rejected() {
    let store = TestStore::new();
    let area = store.sample_area("Yard");
    let device = store.sample_device();
    let assignment = store.sample_assignment(&device.token, &area.token);

    let state = AssignmentState {
        last_interaction_date: Some(1_000),
        presence_missing_date: None,
        last_location: Some(Location::new(f64::NAN, 10.0)),
    };
    let err = store.assignments().update_state(&assignment.token, &state).unwrap_err();
    assert!(matches!(
        err.precondition(),
        Some(Precondition::NonFiniteValue {
            family: EntityFamily::DeviceAssignment,
            ..
        })
    ));
    assert_eq!(store.assignments().require(&assignment.token).unwrap(), assignment);
}

#[test]
fn far_page_is_empty_but_counted() {
    let store = TestStore::new();
    let area = store.sample_area("Yard");
    for i in 0..3 {
        store.sample_zone(&area.token, &format!("z{i}"));
    }

    let mut criteria = ZoneSearchCriteria::for_area(&area.token);
    criteria.paging = SearchCriteria::new(usize::MAX, 2);
    let page = store.zones().list(&criteria, false).unwrap();
    assert_eq!(page.num_results, 3);
    assert!(page.results.is_empty());

    criteria.paging = SearchCriteria::new(1, usize::MAX);
    assert_eq!(store.zones().list(&criteria, false).unwrap().results.len(), 3);
}
