use super::*;
use mnlist_test_utils::fixtures::{self, participant_id, participant_record};
use mnlist_test_utils::{assert_err, assert_matches, assert_ok};

fn list_with(n: u64) -> ParticipantList {
    let mut list = ParticipantList::new(Hash256::ZERO, 0);
    for i in 0..n {
        list = assert_ok!(list.with_added(participant_record(i, i, 0)));
    }
    list
}

#[test]
fn test_with_added_indexes_everything() {
    let list = list_with(3);
    assert_eq!(list.all_count(), 3);
    assert_eq!(list.valid_count(), 3);
    assert_eq!(list.total_registered_count(), 3);
    // collateral, service, owner key and operator key per participant
    assert_eq!(list.unique_property_count(), 12);

    let rec = list.get_by_internal_id(1).unwrap();
    assert_eq!(rec.participant_id, participant_id(1));
    assert_eq!(
        list.get_by_service(&fixtures::service(2)).unwrap().participant_id,
        participant_id(2)
    );
    assert_eq!(
        list.get_by_collateral(&fixtures::collateral(0)).unwrap().internal_id,
        0
    );
    assert!(list
        .get_by_operator_key(&fixtures::operator_key(7))
        .is_none());
}

#[test]
fn test_mutators_leave_receiver_untouched() {
    let before = list_with(2);
    let after = assert_ok!(before.with_removed(&participant_id(0)));
    assert_eq!(before.all_count(), 2);
    assert_eq!(after.all_count(), 1);
    assert!(before.get(&participant_id(0)).is_some());
    assert!(after.get_by_internal_id(0).is_none());
    assert_eq!(after.total_registered_count(), 2, "count never decreases");
}

#[test]
fn test_duplicate_service_is_rejected() {
    let list = list_with(1);
    let mut clash = participant_record(5, 5, 0);
    let mut state = (*clash.state).clone();
    state.service = fixtures::service(0);
    clash.state = Arc::new(state);

    let err = assert_err!(list.with_added(clash));
    assert_matches!(
        err,
        RegistryError::DuplicateUniqueProperty { ref owner, .. } if *owner == participant_id(0)
    );
}

#[test]
fn test_duplicate_participant_id_is_rejected() {
    let list = list_with(1);
    let err = assert_err!(list.with_added(participant_record(0, 9, 0)));
    assert_matches!(err, RegistryError::DuplicateUniqueProperty { .. });
}

#[test]
fn test_update_reindexes_only_changed_properties() {
    let list = list_with(2);
    let delta = StateDelta {
        service: Some(fixtures::service(50)),
        ..Default::default()
    };
    let updated = assert_ok!(list.with_updated(&participant_id(0), &delta));
    assert!(updated.get_by_service(&fixtures::service(0)).is_none());
    assert_eq!(
        updated.get_by_service(&fixtures::service(50)).unwrap().internal_id,
        0
    );
    assert_eq!(updated.unique_property_count(), list.unique_property_count());
    assert_eq!(updated.get(&participant_id(0)).unwrap().internal_id, 0);

    // Taking a value held by someone else fails.
    let steal = StateDelta {
        service: Some(fixtures::service(1)),
        ..Default::default()
    };
    assert_err!(list.with_updated(&participant_id(0), &steal));
}

#[test]
fn test_batch_update_allows_swaps() {
    let list = list_with(2);
    let a = list.get(&participant_id(0)).unwrap();
    let b = list.get(&participant_id(1)).unwrap();
    let mut a_state = (*a.state).clone();
    let mut b_state = (*b.state).clone();
    std::mem::swap(&mut a_state.service, &mut b_state.service);

    let swapped = assert_ok!(list.with_states(&[
        (participant_id(0), Arc::new(a_state)),
        (participant_id(1), Arc::new(b_state)),
    ]));
    assert_eq!(
        swapped.get_by_service(&fixtures::service(1)).unwrap().participant_id,
        participant_id(0)
    );
}

#[test]
fn test_null_values_are_not_indexed() {
    let list = list_with(1);
    let delta = StateDelta {
        service: Some(ServiceAddr::NULL),
        operator_key: Some(OperatorKey::default()),
        ..Default::default()
    };
    let reset = assert_ok!(list.with_updated(&participant_id(0), &delta));
    assert_eq!(reset.unique_property_count(), 2);
    assert!(!reset.has_unique_property(UniqueProperty::Service(&ServiceAddr::NULL)));

    // A second participant with a null service is fine.
    let mut other = participant_record(1, 1, 0);
    let mut state = (*other.state).clone();
    state.service = ServiceAddr::NULL;
    other.state = Arc::new(state);
    assert_ok!(reset.with_added(other));
}

#[test]
fn test_remove_unknown_fails() {
    let list = list_with(1);
    let err = assert_err!(list.with_removed(&participant_id(42)));
    assert_matches!(err, RegistryError::UnknownParticipant(_));
}

#[test]
fn test_from_records_rebuilds_indexes() {
    let list = list_with(4);
    let removed = assert_ok!(list.with_removed(&participant_id(3)));
    let records: Vec<_> = removed.iter().map(|r| (**r).clone()).collect();
    let rebuilt = assert_ok!(ParticipantList::from_records(
        removed.block_hash(),
        removed.height(),
        removed.total_registered_count(),
        records,
    ));
    assert_eq!(rebuilt, removed);
    assert_eq!(rebuilt.total_registered_count(), 4);
}
