// Path: crates/types/src/app/diff.rs

//! The delta between two consecutive registry versions.

use super::participant::{ParticipantRecord, StateDelta};
use parity_scale_codec::{Compact, Decode, Encode, Input, Output};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The added/updated/removed delta between two registry versions.
///
/// `updated` and `removed` are keyed by internal id; `added` carries full
/// records because the receiver has never seen them. The ordered collections
/// make the canonical encoding independent of how the diff was assembled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryDiff {
    /// Records present in the newer version only, in internal-id order.
    pub added: Vec<Arc<ParticipantRecord>>,
    /// Field-level state changes of records present in both versions.
    pub updated: BTreeMap<u64, StateDelta>,
    /// Internal ids of records present in the older version only.
    pub removed: BTreeSet<u64>,
    /// `total_registered_count` of the older version.
    pub total_before: u64,
    /// `total_registered_count` of the newer version. A block can register and
    /// revoke the same participant, so this may grow with nothing added.
    pub total_after: u64,
}

impl RegistryDiff {
    /// Returns false if the diff is a no-op.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.updated.is_empty()
            || !self.removed.is_empty()
            || self.total_before != self.total_after
    }

    /// The number of participants this diff touches.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

impl Encode for RegistryDiff {
    fn encode_to<O: Output + ?Sized>(&self, dest: &mut O) {
        Compact(self.added.len() as u64).encode_to(dest);
        for record in &self.added {
            record.as_ref().encode_to(dest);
        }
        Compact(self.updated.len() as u64).encode_to(dest);
        for (internal_id, delta) in &self.updated {
            Compact(*internal_id).encode_to(dest);
            delta.encode_to(dest);
        }
        Compact(self.removed.len() as u64).encode_to(dest);
        for internal_id in &self.removed {
            Compact(*internal_id).encode_to(dest);
        }
        Compact(self.total_before).encode_to(dest);
        Compact(self.total_after).encode_to(dest);
    }
}

impl Decode for RegistryDiff {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let added_len = Compact::<u64>::decode(input)?.0;
        let mut added = Vec::new();
        for _ in 0..added_len {
            added.push(Arc::new(ParticipantRecord::decode(input)?));
        }

        let updated_len = Compact::<u64>::decode(input)?.0;
        let mut updated = BTreeMap::new();
        for _ in 0..updated_len {
            let internal_id = Compact::<u64>::decode(input)?.0;
            let delta = StateDelta::decode(input)?;
            if updated.insert(internal_id, delta).is_some() {
                return Err("duplicate internal id in updated set".into());
            }
        }

        let removed_len = Compact::<u64>::decode(input)?.0;
        let mut removed = BTreeSet::new();
        for _ in 0..removed_len {
            if !removed.insert(Compact::<u64>::decode(input)?.0) {
                return Err("duplicate internal id in removed set".into());
            }
        }

        let total_before = Compact::<u64>::decode(input)?.0;
        let total_after = Compact::<u64>::decode(input)?.0;
        if total_after < total_before {
            return Err("total registered count decreases".into());
        }

        Ok(Self {
            added,
            updated,
            removed,
            total_before,
            total_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Hash256, OutPoint, ParticipantState};
    use crate::codec;

    #[test]
    fn empty_diff_has_no_changes() {
        assert!(!RegistryDiff::default().has_changes());
    }

    #[test]
    fn canonical_encoding_rejects_duplicate_removals() {
        let mut diff = RegistryDiff::default();
        diff.added.push(Arc::new(ParticipantRecord::new(
            Hash256([1; 32]),
            0,
            OutPoint::default(),
            ParticipantState::default(),
        )));
        diff.updated.insert(
            4,
            StateDelta {
                pose_penalty: Some(3),
                ..Default::default()
            },
        );
        diff.removed.insert(2);
        diff.total_before = 4;
        diff.total_after = 5;
        let bytes = codec::to_bytes_canonical(&diff).unwrap();
        let decoded: RegistryDiff = codec::from_bytes_canonical(&bytes).unwrap();
        assert_eq!(decoded, diff);

        // Hand-built encoding with the same removed id twice.
        let mut bad = Vec::new();
        Compact(0u64).encode_to(&mut bad);
        Compact(0u64).encode_to(&mut bad);
        Compact(2u64).encode_to(&mut bad);
        Compact(7u64).encode_to(&mut bad);
        Compact(7u64).encode_to(&mut bad);
        assert!(codec::from_bytes_canonical::<RegistryDiff>(&bad).is_err());
    }

    #[test]
    fn count_only_diff_has_changes() {
        let diff = RegistryDiff {
            total_before: 1,
            total_after: 2,
            ..Default::default()
        };
        assert!(diff.has_changes());
        assert_eq!(diff.change_count(), 0);

        let mut shrinking = Vec::new();
        for len in [0u64, 0, 0, 2, 1] {
            Compact(len).encode_to(&mut shrinking);
        }
        assert!(codec::from_bytes_canonical::<RegistryDiff>(&shrinking).is_err());
    }
}
