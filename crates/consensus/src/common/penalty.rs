// Path: crates/consensus/src/common/penalty.rs
//! PoSe punishment of quorum members that failed to contribute to a commitment.

use mnlist_state::{ParticipantList, PoseEngine};
use mnlist_types::app::{Hash256, QuorumCommitment};
use mnlist_types::error::RegistryError;
use mnlist_types::Result;

/// A pure function that selects the members of `commitment` to punish.
///
/// Returns:
/// - `Ok(offenders)`: failed members still present and not yet banned, in
///   quorum order, without duplicates.
/// - `Err(MalformedTransition)` if the validity bitmap does not cover the
///   member list.
pub(crate) fn compute_commitment_offenders(
    list: &ParticipantList,
    commitment: &QuorumCommitment,
) -> Result<Vec<Hash256>> {
    if commitment.members.len() != commitment.valid_members.len() {
        return Err(RegistryError::MalformedTransition(format!(
            "commitment {} has {} members but {} validity bits",
            commitment.quorum_hash.short(),
            commitment.members.len(),
            commitment.valid_members.len()
        )));
    }

    let mut offenders: Vec<Hash256> = Vec::new();
    for member in commitment.invalid_members() {
        // Members may have been revoked since the quorum formed.
        let Some(record) = list.get(member) else {
            continue;
        };
        if record.state.is_banned() || offenders.contains(member) {
            continue;
        }
        offenders.push(*member);
    }
    Ok(offenders)
}

/// Punishes every failed member of `commitment` by `percent` percent of the
/// ban threshold. A thin, stateful wrapper around `compute_commitment_offenders`.
///
/// The threshold is recomputed before each punishment, so a ban earlier in
/// the same commitment lowers the charge for the members after it.
pub fn apply_commitment_penalties(
    engine: &PoseEngine,
    list: &ParticipantList,
    commitment: &QuorumCommitment,
    percent: u32,
) -> Result<ParticipantList> {
    if commitment.is_null() {
        return Ok(list.clone());
    }
    let offenders = compute_commitment_offenders(list, commitment)?;
    let mut next = list.clone();
    for offender in &offenders {
        let penalty = engine.percent_of_max(&next, percent);
        next = engine.penalize(&next, offender, penalty)?;
    }
    if !offenders.is_empty() {
        log::info!(
            "[Penalty] Commitment {} punished {} of {} members at height {}",
            commitment.quorum_hash.short(),
            offenders.len(),
            commitment.members.len(),
            next.height()
        );
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnlist_state::PoseStatus;
    use mnlist_test_utils::fixtures::{commitment, participant_id, participant_record};
    use mnlist_test_utils::{assert_err, assert_ok};

    fn list_with(n: u64) -> ParticipantList {
        let mut list = ParticipantList::new(Hash256::ZERO, 4);
        for i in 0..n {
            list = assert_ok!(list.with_added(participant_record(i, i, 0)));
        }
        list
    }

    #[test]
    fn test_offenders_skip_unknown_and_valid_members() {
        let list = list_with(3);
        let members = vec![participant_id(0), participant_id(1), participant_id(99)];
        let qc = commitment(&members, &[participant_id(1), participant_id(99)]);
        let offenders = assert_ok!(compute_commitment_offenders(&list, &qc));
        assert_eq!(offenders, vec![participant_id(1)]);
    }

    #[test]
    fn test_bitmap_length_mismatch_is_malformed() {
        let list = list_with(1);
        let mut qc = commitment(&[participant_id(0)], &[]);
        qc.valid_members.push(true);
        let err = assert_err!(compute_commitment_offenders(&list, &qc));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_penalty_is_two_thirds_of_threshold() {
        let list = list_with(3);
        let engine = PoseEngine::default();
        let qc = commitment(&[participant_id(0), participant_id(2)], &[participant_id(2)]);
        let next = assert_ok!(apply_commitment_penalties(&engine, &list, &qc, 66));
        assert_eq!(
            assert_ok!(engine.status(&next, &participant_id(2))),
            PoseStatus::Active(66)
        );
        // A second failure crosses the threshold.
        let next = assert_ok!(apply_commitment_penalties(&engine, &next, &qc, 66));
        assert_eq!(
            assert_ok!(engine.status(&next, &participant_id(2))),
            PoseStatus::Banned(4)
        );
    }
}
