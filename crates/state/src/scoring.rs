// Path: crates/state/src/scoring.rs

//! Deterministic orderings over a registry version: quorum scores and the
//! payment rotation.
//!
//! Map iteration order is never consensus-relevant; every ordering here is
//! an explicit sort with a `participant_id` tiebreak.

use crate::registry::ParticipantList;
use mnlist_types::app::{Hash256, ParticipantRecord};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The quorum score of a participant for a round: SHA-256 over the
/// participant id followed by the modifier.
pub fn score(participant_id: &Hash256, modifier: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(participant_id.as_ref());
    hasher.update(modifier.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash256(out)
}

impl ParticipantList {
    /// Scores every valid participant and returns `(score, participant_id)`
    /// pairs in ascending order. Scores compare as big-endian 256-bit
    /// integers, which is plain byte order.
    pub fn score_all(&self, modifier: &Hash256) -> Vec<(Hash256, Hash256)> {
        let mut scores = Vec::with_capacity(self.all_count());
        self.for_each(true, |record| {
            scores.push((score(&record.participant_id, modifier), record.participant_id));
        });
        scores.sort_unstable();
        scores
    }

    /// The first `max_size` valid participants in score order.
    pub fn calculate_quorum(&self, max_size: usize, modifier: &Hash256) -> Vec<Arc<ParticipantRecord>> {
        self.score_all(modifier)
            .into_iter()
            .take(max_size)
            .filter_map(|(_, id)| self.get(&id).cloned())
            .collect()
    }

    /// The valid participant due for payment next: the one whose payment
    /// anchor is oldest, ties broken by participant id.
    pub fn next_payee(&self) -> Option<Arc<ParticipantRecord>> {
        self.iter()
            .filter(|record| record.is_valid())
            .min_by_key(|record| (record.state.payment_anchor(), record.participant_id))
            .cloned()
    }

    /// The next `count` payees, assuming one payment per block starting at
    /// the block after this version and no other registry changes.
    pub fn projected_payees(&self, count: usize) -> Vec<Arc<ParticipantRecord>> {
        let mut queue: BTreeSet<(i64, Hash256)> = BTreeSet::new();
        self.for_each(true, |record| {
            queue.insert((record.state.payment_anchor(), record.participant_id));
        });

        let mut payees = Vec::with_capacity(count.min(queue.len()));
        let mut height = self.height();
        while payees.len() < count {
            let Some((_, id)) = queue.pop_first() else {
                break;
            };
            height += 1;
            if let Some(record) = self.get(&id) {
                payees.push(Arc::clone(record));
            }
            queue.insert((height, id));
        }
        payees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::ban_if_not_banned;
    use mnlist_test_utils::assert_ok;
    use mnlist_test_utils::fixtures::{participant_id, participant_record};
    use mnlist_types::app::StateDelta;

    fn list_with(n: u64) -> ParticipantList {
        let mut list = ParticipantList::new(Hash256::ZERO, 100);
        for i in 0..n {
            list = assert_ok!(list.with_added(participant_record(i, i, i as i64)));
        }
        list
    }

    #[test]
    fn test_scores_are_sorted_and_pure() {
        let list = list_with(20);
        let modifier = Hash256([3; 32]);
        let a = list.score_all(&modifier);
        let b = list.score_all(&modifier);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert_ne!(a, list.score_all(&Hash256([4; 32])));
    }

    #[test]
    fn test_quorum_skips_banned() {
        let list = list_with(10);
        let modifier = Hash256([9; 32]);
        let quorum = list.calculate_quorum(3, &modifier);
        assert_eq!(quorum.len(), 3);

        let first = quorum[0].participant_id;
        let banned = assert_ok!(ban_if_not_banned(&list, &first));
        let quorum2 = banned.calculate_quorum(3, &modifier);
        assert!(quorum2.iter().all(|r| r.participant_id != first));
        assert_eq!(quorum2[0].participant_id, quorum[1].participant_id);
    }

    #[test]
    fn test_next_payee_takes_oldest_anchor() {
        let list = list_with(3);
        assert_eq!(list.next_payee().unwrap().participant_id, participant_id(0));

        let paid = StateDelta {
            last_paid_height: Some(101),
            ..Default::default()
        };
        let list = assert_ok!(list.with_updated(&participant_id(0), &paid));
        assert_eq!(list.next_payee().unwrap().participant_id, participant_id(1));
    }

    #[test]
    fn test_projected_payees_rotate() {
        let list = list_with(3);
        let ids: Vec<_> = list
            .projected_payees(5)
            .iter()
            .map(|r| r.participant_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                participant_id(0),
                participant_id(1),
                participant_id(2),
                participant_id(0),
                participant_id(1)
            ]
        );
        assert!(ParticipantList::default().projected_payees(3).is_empty());
    }
}
