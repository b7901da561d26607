//! Randomised invariants of the registry algebra.

use mnlist_state::{DiffEngine, ParticipantList, PoseEngine};
use mnlist_test_utils::fixtures::{self, participant_record};
use mnlist_types::app::{Hash256, StateDelta};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Register,
    /// Registers a participant and revokes it again.
    Churn,
    Revoke(usize),
    MoveService(usize, u16),
    Penalize(usize, u32),
    Decay,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Register),
        1 => Just(Op::Churn),
        1 => any::<usize>().prop_map(Op::Revoke),
        2 => (any::<usize>(), 0u16..32).prop_map(|(i, s)| Op::MoveService(i, s)),
        2 => (any::<usize>(), 1u32..80).prop_map(|(i, p)| Op::Penalize(i, p)),
        1 => Just(Op::Decay),
    ]
}

fn pick(list: &ParticipantList, idx: usize) -> Option<Hash256> {
    let n = list.all_count();
    if n == 0 {
        return None;
    }
    list.iter().nth(idx % n).map(|r| r.participant_id)
}

/// Runs one operation; an operation the registry rejects leaves the list as it was.
fn step(list: &ParticipantList, op: &Op, next_seed: &mut u64, height: i64) -> ParticipantList {
    let list = list.clone();
    let pose = PoseEngine::default();
    let result = match op {
        Op::Register => {
            *next_seed += 1;
            list.with_added(participant_record(*next_seed, list.total_registered_count(), height))
        }
        Op::Churn => {
            *next_seed += 1;
            let id = fixtures::participant_id(*next_seed);
            list.with_added(participant_record(*next_seed, list.total_registered_count(), height))
                .and_then(|l| l.with_removed(&id))
        }
        Op::Revoke(i) => match pick(&list, *i) {
            Some(id) => list.with_removed(&id),
            None => Ok(list.clone()),
        },
        Op::MoveService(i, s) => match pick(&list, *i) {
            Some(id) => list.with_updated(
                &id,
                &StateDelta {
                    service: Some(fixtures::service(10_000 + u64::from(*s))),
                    ..Default::default()
                },
            ),
            None => Ok(list.clone()),
        },
        Op::Penalize(i, p) => match pick(&list, *i) {
            Some(id) => pose.penalize(&list, &id, *p),
            None => Ok(list.clone()),
        },
        Op::Decay => pose.decay_all(&list),
    };
    result.unwrap_or(list)
}

/// Runs a block's worth of operations on top of `list`.
fn block(list: &ParticipantList, ops: &[Op], next_seed: &mut u64, height: i64) -> ParticipantList {
    let stamped = list.with_block(fixtures::block_hash(height, 0), height);
    ops.iter()
        .fold(stamped, |acc, op| step(&acc, op, next_seed, height))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn internal_ids_never_change(ops in proptest::collection::vec(op(), 1..40)) {
        let mut list = ParticipantList::new(Hash256::ZERO, 0);
        let mut seed = 0u64;
        let mut assigned: HashMap<Hash256, u64> = HashMap::new();
        let mut ever_used = std::collections::HashSet::new();

        for (h, op) in ops.iter().enumerate() {
            let before_total = list.total_registered_count();
            list = block(&list, std::slice::from_ref(op), &mut seed, h as i64 + 1);
            prop_assert!(list.total_registered_count() >= before_total);

            for record in list.iter() {
                let id = *assigned.entry(record.participant_id).or_insert(record.internal_id);
                prop_assert_eq!(id, record.internal_id);
                ever_used.insert(record.internal_id);
                prop_assert!(record.internal_id < list.total_registered_count());
            }
        }
        // Internal ids are never reused by a different participant.
        prop_assert_eq!(ever_used.len(), assigned.len());
    }

    #[test]
    fn apply_then_undo_round_trips(
        blocks in proptest::collection::vec(proptest::collection::vec(op(), 1..5), 1..30)
    ) {
        let mut list = ParticipantList::new(Hash256::ZERO, 0);
        let mut seed = 0u64;
        for (h, ops) in blocks.iter().enumerate() {
            let next = block(&list, ops, &mut seed, h as i64 + 1);
            let diff = DiffEngine::diff(&list, &next);
            prop_assert_eq!(diff.total_before, list.total_registered_count());
            prop_assert_eq!(diff.total_after, next.total_registered_count());

            let applied = DiffEngine::apply(&list, &diff).unwrap();
            prop_assert_eq!(&applied.with_block(next.block_hash(), next.height()), &next);

            let undone = DiffEngine::undo(&next, &diff, &list).unwrap();
            prop_assert_eq!(&undone, &list);

            prop_assert!(!DiffEngine::diff(&next, &next).has_changes());
            list = next;
        }
    }
}
