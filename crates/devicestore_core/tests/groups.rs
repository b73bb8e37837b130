//! Device groups and their elements.

use devicestore_core::model::DeviceGroupElementRequest;
use devicestore_core::schema::Table;
use devicestore_core::{EntityFamily, EntityStore, GroupSearchCriteria, Precondition, SearchCriteria};
use devicestore_testkit::prelude::*;
use proptest::prelude::*;

#[test]
fn force_delete_removes_group_and_elements() {
    init_test_logging();
    let store = TestStore::new();
    let group = store.sample_group("Fleet");
    let nested = store.sample_group("Spares");
    let a = store.sample_device();
    let b = store.sample_device();

    let added = store
        .group_elements()
        .add_elements(
            &group.token,
            &[
                DeviceGroupElementRequest::device(&a.token),
                DeviceGroupElementRequest::device(&b.token),
                DeviceGroupElementRequest::group(&nested.token),
            ],
        )
        .unwrap();
    assert_eq!(added.len(), 3);
    // Fleet row, its three elements and the Spares row.
    assert_eq!(store.rows(Table::Groups), 5);

    let removed = store.groups().delete(&group.token, true).unwrap();
    assert_eq!(removed, group);
    assert_eq!(store.rows(Table::Groups), 1);
    assert_eq!(store.groups().get_by_token(&group.token).unwrap(), None);

    let listed = store
        .group_elements()
        .list_elements(&group.token, &SearchCriteria::all())
        .unwrap();
    assert!(listed.is_empty());
    assert!(listed.results.is_empty());
    store.assert_released();
}

#[test]
fn soft_delete_keeps_elements() {
    let store = TestStore::new();
    let group = store.sample_group("Fleet");
    let device = store.sample_device();
    store
        .group_elements()
        .add_elements(&group.token, &[DeviceGroupElementRequest::device(&device.token)])
        .unwrap();

    store.groups().delete(&group.token, false).unwrap();
    assert!(store.groups().require(&group.token).unwrap().deleted);
    let elements = store
        .group_elements()
        .list_elements(&group.token, &SearchCriteria::all())
        .unwrap();
    assert_eq!(elements.num_results, 1);
}

#[test]
fn malformed_elements_are_rejected() {
    let store = TestStore::new();
    let group = store.sample_group("Fleet");
    let device = store.sample_device();

    let both = DeviceGroupElementRequest {
        device_token: Some(device.token.clone()),
        nested_group_token: Some(group.token.clone()),
        roles: Vec::new(),
    };
    let err = store
        .group_elements()
        .add_elements(&group.token, &[both])
        .unwrap_err();
    assert_eq!(err.precondition(), Some(&Precondition::InvalidGroupElement));

    let err = store
        .group_elements()
        .add_elements(&group.token, &[DeviceGroupElementRequest::group(&group.token)])
        .unwrap_err();
    assert!(matches!(
        err.precondition(),
        Some(Precondition::SelfReferencingGroup { .. })
    ));

    let err = store
        .group_elements()
        .add_elements(
            &group.token,
            &[
                DeviceGroupElementRequest::device(&device.token),
                DeviceGroupElementRequest::device("ghost"),
            ],
        )
        .unwrap_err();
    assert!(err.is_invalid_token(EntityFamily::Device));
    assert_eq!(store.rows(Table::Groups), 1);
}

#[test]
fn removed_indexes_are_not_reused() {
    let store = TestStore::new();
    let group = store.sample_group("Fleet");
    let devices: Vec<_> = (0..3).map(|_| store.sample_device()).collect();
    let requests: Vec<_> = devices
        .iter()
        .map(|d| DeviceGroupElementRequest::device(&d.token))
        .collect();

    let added = store.group_elements().add_elements(&group.token, &requests).unwrap();
    let indexes: Vec<_> = added.iter().map(|e| e.index).collect();
    assert_eq!(indexes, [1, 2, 3]);

    let removed = store
        .group_elements()
        .remove_elements(&group.token, &[3, 7])
        .unwrap();
    assert_eq!(removed, vec![added[2].clone()]);

    let again = store
        .group_elements()
        .add_elements(&group.token, &requests[..1])
        .unwrap();
    assert_eq!(again[0].index, 4);

    let listed = store
        .group_elements()
        .list_elements(&group.token, &SearchCriteria::all())
        .unwrap();
    let indexes: Vec<_> = listed.results.iter().map(|e| e.index).collect();
    assert_eq!(indexes, [1, 2, 4]);
    assert_eq!(store.group_elements().get_element(&group.token, 3).unwrap(), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn role_filter_matches_generated_groups(
        requests in prop::collection::vec(group_request_strategy(), 1..8),
        role in "[a-z]{1,8}",
    ) {
        let store = TestStore::new();
        for request in &requests {
            store.groups().create(request).unwrap();
        }

        let criteria = GroupSearchCriteria {
            role: Some(role.clone()),
            paging: SearchCriteria::all(),
        };
        let listed = store.groups().list(&criteria, false).unwrap();
        let expected = requests
            .iter()
            .filter(|r| r.roles.as_ref().is_some_and(|roles| roles.contains(&role)))
            .count();
        prop_assert_eq!(listed.num_results, expected);
        prop_assert!(listed.results.iter().all(|g| g.roles.contains(&role)));
    }
}
