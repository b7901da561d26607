// Path: crates/state/src/diff.rs

//! Diff computation, forward application and single-step undo.

use crate::registry::ParticipantList;
use mnlist_types::app::{Hash256, ParticipantState, RegistryDiff, StateDelta};
use mnlist_types::error::RegistryError;
use mnlist_types::Result;
use std::sync::Arc;

/// Computes, applies and undoes `RegistryDiff`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    /// The delta that turns `from` into `to`.
    ///
    /// Records are matched by participant id through key lookups, so the
    /// result does not depend on traversal order. A participant id that
    /// reappears with a different internal id is reported as removed and added.
    pub fn diff(from: &ParticipantList, to: &ParticipantList) -> RegistryDiff {
        let mut diff = RegistryDiff {
            total_before: from.total_registered_count(),
            total_after: to.total_registered_count(),
            ..Default::default()
        };

        for record in to.iter() {
            match from.get(&record.participant_id) {
                Some(old) if old.internal_id == record.internal_id => {
                    if Arc::ptr_eq(&old.state, &record.state) || old.state == record.state {
                        continue;
                    }
                    let delta = StateDelta::between(&old.state, &record.state);
                    if !delta.is_empty() {
                        diff.updated.insert(record.internal_id, delta);
                    }
                }
                Some(old) => {
                    diff.removed.insert(old.internal_id);
                    diff.added.push(Arc::clone(record));
                }
                None => diff.added.push(Arc::clone(record)),
            }
        }
        for record in from.iter() {
            if !to.get(&record.participant_id).is_some_and(|r| r.internal_id == record.internal_id) {
                diff.removed.insert(record.internal_id);
            }
        }

        diff.added.sort_by_key(|r| r.internal_id);
        diff
    }

    /// Applies `diff` to `base`, all or nothing.
    ///
    /// Removals go first, then state updates as one batch, then additions.
    /// Every value a diff releases is therefore free again before anything in
    /// the same diff claims it. The resulting list keeps `base`'s block stamp
    /// and takes the diff's `total_after`, even when nothing was added.
    pub fn apply(base: &ParticipantList, diff: &RegistryDiff) -> Result<ParticipantList> {
        let mut list = base.clone();

        for internal_id in &diff.removed {
            let id = participant_by_internal_id(&list, *internal_id)?;
            list = list.with_removed(&id)?;
        }

        let mut updates: Vec<(Hash256, Arc<ParticipantState>)> = Vec::with_capacity(diff.updated.len());
        for (internal_id, delta) in &diff.updated {
            let record = list.get_by_internal_id(*internal_id).ok_or_else(|| {
                RegistryError::UnknownParticipant(format!("internal id {}", internal_id))
            })?;
            updates.push((record.participant_id, Arc::new(delta.apply_to(&record.state))));
        }
        list = list.with_states(&updates)?;

        for record in &diff.added {
            list = list.with_added((**record).clone())?;
        }

        if base.total_registered_count() != diff.total_before
            || list.total_registered_count() > diff.total_after
        {
            return Err(RegistryError::invariant(format!(
                "diff counts {}..{} do not fit a list counting {}",
                diff.total_before,
                diff.total_after,
                base.total_registered_count()
            )));
        }
        Ok(list.with_total_registered_count(diff.total_after))
    }

    /// Undoes the diff that produced `current`, yielding the version before it.
    ///
    /// Removed records and the "before" values of updated ones come from
    /// `prior`, the version the diff was computed against. Each delta is
    /// checked against `prior` before it is reverted, so a diff that does not
    /// connect the two versions is rejected rather than half-undone.
    pub fn undo(
        current: &ParticipantList,
        diff: &RegistryDiff,
        prior: &ParticipantList,
    ) -> Result<ParticipantList> {
        if current.total_registered_count() != diff.total_after
            || prior.total_registered_count() != diff.total_before
        {
            return Err(RegistryError::invariant(format!(
                "diff counts {}..{} do not connect versions counting {} and {}",
                diff.total_before,
                diff.total_after,
                prior.total_registered_count(),
                current.total_registered_count()
            )));
        }
        let mut list = current.clone();

        for record in &diff.added {
            list = list.with_removed(&record.participant_id)?;
        }

        let mut reverts: Vec<(Hash256, Arc<ParticipantState>)> = Vec::with_capacity(diff.updated.len());
        for (internal_id, delta) in &diff.updated {
            let now = list.get_by_internal_id(*internal_id).ok_or_else(|| {
                RegistryError::UnknownParticipant(format!("internal id {}", internal_id))
            })?;
            let before = prior.get_by_internal_id(*internal_id).ok_or_else(|| {
                RegistryError::UnknownParticipant(format!("internal id {} in prior version", internal_id))
            })?;
            if before.participant_id != now.participant_id || delta.apply_to(&before.state) != *now.state {
                return Err(RegistryError::invariant(format!(
                    "delta for internal id {} does not connect the two versions",
                    internal_id
                )));
            }
            reverts.push((now.participant_id, Arc::clone(&before.state)));
        }
        list = list.with_states(&reverts)?;

        for internal_id in &diff.removed {
            let record = prior.get_by_internal_id(*internal_id).ok_or_else(|| {
                RegistryError::UnknownParticipant(format!("internal id {} in prior version", internal_id))
            })?;
            list = list.with_added((**record).clone())?;
        }

        Ok(list
            .with_total_registered_count(diff.total_before)
            .with_block(prior.block_hash(), prior.height()))
    }
}

fn participant_by_internal_id(list: &ParticipantList, internal_id: u64) -> Result<Hash256> {
    list.get_by_internal_id(internal_id)
        .map(|r| r.participant_id)
        .ok_or_else(|| RegistryError::UnknownParticipant(format!("internal id {}", internal_id)))
}
