//! Multi-block transition sequences, checked against the diff algebra.

use mnlist_consensus::TransitionBuilder;
use mnlist_state::{DiffEngine, ParticipantList, PoseStatus};
use mnlist_test_utils::fixtures::{
    self, commitment, participant_id, register_tx, revoke_tx, update_service_tx, BlockBuilder,
};
use mnlist_test_utils::assert_ok;
use mnlist_test_utils::randomness::TestRng;
use mnlist_types::app::BlockContents;
use mnlist_types::config::RegistryConfig;

fn run(builder: &TransitionBuilder, blocks: &[BlockContents]) -> Vec<ParticipantList> {
    let mut versions = vec![ParticipantList::new(fixtures::block_hash(0, 0), 0)];
    for block in blocks {
        let prev = versions.last().unwrap();
        let out = assert_ok!(builder.build_next(prev, block));
        versions.push(out.list.with_block_hash(block.block_hash));
    }
    versions
}

#[test]
fn every_step_is_undoable() {
    let builder = TransitionBuilder::default();
    let members: Vec<_> = (0..4).map(participant_id).collect();
    let blocks = vec![
        BlockBuilder::new(1)
            .tx(register_tx(0))
            .tx(register_tx(1))
            .tx(register_tx(2))
            .tx(register_tx(3))
            .build(),
        BlockBuilder::new(2).tx(update_service_tx(1, fixtures::service(50))).build(),
        BlockBuilder::new(3)
            .commitment(commitment(&members, &[participant_id(3)]))
            .build(),
        BlockBuilder::new(4).tx(revoke_tx(2)).tx(register_tx(4)).build(),
        BlockBuilder::new(5).spend(fixtures::collateral(0)).build(),
    ];
    let versions = run(&builder, &blocks);

    for pair in versions.windows(2) {
        let (prior, current) = (&pair[0], &pair[1]);
        let diff = DiffEngine::diff(prior, current);
        let applied = assert_ok!(DiffEngine::apply(prior, &diff));
        assert_eq!(applied.with_block(current.block_hash(), current.height()), *current);
        assert_eq!(assert_ok!(DiffEngine::undo(current, &diff, prior)), *prior);
    }

    let tip = versions.last().unwrap();
    assert_eq!(tip.height(), 5);
    assert_eq!(tip.all_count(), 3);
    assert_eq!(tip.total_registered_count(), 5);
    assert_eq!(tip.get(&participant_id(4)).unwrap().internal_id, 4);
    assert_eq!(
        assert_ok!(builder.pose().status(tip, &participant_id(3))),
        PoseStatus::Active(64)
    );
}

#[test]
fn repeated_commitment_failures_ban_and_exclude_from_quorums() {
    let builder = TransitionBuilder::default();
    let members: Vec<_> = (0..3).map(participant_id).collect();
    let mut blocks = vec![BlockBuilder::new(1)
        .tx(register_tx(0))
        .tx(register_tx(1))
        .tx(register_tx(2))
        .build()];
    for h in 2..=3 {
        blocks.push(
            BlockBuilder::new(h)
                .commitment(commitment(&members, &[participant_id(2)]))
                .build(),
        );
    }
    let versions = run(&builder, &blocks);
    let tip = versions.last().unwrap();

    assert_eq!(
        assert_ok!(builder.pose().status(tip, &participant_id(2))),
        PoseStatus::Banned(3)
    );
    assert_eq!(tip.valid_count(), 2);
    let quorum = tip.calculate_quorum(10, &tip.block_hash());
    assert_eq!(quorum.len(), 2);
    assert!(quorum.iter().all(|r| r.participant_id != participant_id(2)));
}

#[test]
fn activation_height_defers_processing() {
    let config = RegistryConfig {
        activation_height: 3,
        ..Default::default()
    };
    let builder = TransitionBuilder::new(&config);
    let blocks = vec![
        BlockBuilder::new(1).tx(register_tx(0)).build(),
        BlockBuilder::new(2).tx(register_tx(1)).build(),
        BlockBuilder::new(3).tx(register_tx(2)).build(),
    ];
    let versions = run(&builder, &blocks);
    assert_eq!(versions[2].all_count(), 0);
    assert_eq!(versions[2].height(), 2);
    assert_eq!(versions[3].all_count(), 1);
    assert_eq!(versions[3].get(&participant_id(2)).unwrap().internal_id, 0);
}

#[test]
fn random_chains_keep_identities_stable() {
    let builder = TransitionBuilder::default();
    let mut rng = TestRng::new(7);
    let mut list = ParticipantList::new(fixtures::block_hash(0, 0), 0);
    let mut next_seed = 0u64;

    for height in 1..60i64 {
        let mut block = BlockBuilder::new(height);
        if rng.gen_bool(0.6) {
            block = block.tx(register_tx(next_seed));
            next_seed += 1;
        }
        if next_seed > 0 && rng.gen_bool(0.2) {
            block = block.tx(revoke_tx(rng.gen_range(0, next_seed)));
        }
        if next_seed > 0 && rng.gen_bool(0.3) {
            let who = rng.gen_range(0, next_seed);
            block = block.tx(update_service_tx(who, fixtures::service(1_000 + height as u64)));
        }
        let out = assert_ok!(builder.build_next(&list, &block.build()));
        for record in out.list.iter() {
            if let Some(before) = list.get(&record.participant_id) {
                assert_eq!(before.internal_id, record.internal_id);
            }
            assert!(record.internal_id < out.list.total_registered_count());
        }
        assert!(out.list.total_registered_count() >= list.total_registered_count());
        list = out.list;
    }
}
