// Path: crates/state/src/pose.rs

//! Proof-of-service penalty accrual, decay and banning.
//!
//! Each participant is either `Active(score)` or `Banned`. A ban is sticky:
//! decay never lifts it, only a service update that revives the participant.
//! The ban threshold scales with the number of valid participants and is
//! recomputed at every point of use, never cached per height.

use crate::registry::ParticipantList;
use mnlist_types::app::{Hash256, ParticipantState};
use mnlist_types::config::RegistryConfig;
use mnlist_types::Result;
use std::sync::Arc;

/// The PoSe state of a single participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseStatus {
    /// Eligible, carrying the given penalty score.
    Active(u32),
    /// Banned since the given height.
    Banned(i64),
}

impl PoseStatus {
    /// Reads the status from a state value.
    pub fn of(state: &ParticipantState) -> Self {
        match state.pose_ban_height {
            Some(height) => Self::Banned(height),
            None => Self::Active(state.pose_penalty),
        }
    }
}

/// Parameters and operations of the PoSe state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseEngine {
    min_max_penalty: u32,
}

impl Default for PoseEngine {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PoseEngine {
    /// Creates an engine whose ban threshold never drops below `min_max_penalty`.
    pub fn new(min_max_penalty: u32) -> Self {
        Self {
            min_max_penalty: min_max_penalty.max(1),
        }
    }

    /// Creates an engine from the registry configuration.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.min_max_pose_penalty)
    }

    /// The ban threshold for `list`: the number of valid participants, but at
    /// least the configured floor.
    pub fn max_penalty(&self, list: &ParticipantList) -> u32 {
        let valid = u32::try_from(list.valid_count()).unwrap_or(u32::MAX);
        valid.max(self.min_max_penalty)
    }

    /// `percent` percent of the current ban threshold, rounded down.
    pub fn percent_of_max(&self, list: &ParticipantList, percent: u32) -> u32 {
        let max = u64::from(self.max_penalty(list));
        u32::try_from(max * u64::from(percent) / 100).unwrap_or(u32::MAX)
    }

    /// Adds `penalty` to a participant's score and bans it once the score
    /// reaches the threshold. Banned participants and zero penalties are
    /// left alone.
    pub fn penalize(
        &self,
        list: &ParticipantList,
        participant_id: &Hash256,
        penalty: u32,
    ) -> Result<ParticipantList> {
        let record = list.get_required(participant_id)?;
        let max = self.max_penalty(list);
        let Some(state) = compute_penalty_update(&record.state, penalty, max, list.height()) else {
            return Ok(list.clone());
        };
        if state.is_banned() {
            tracing::info!(
                target: "pose",
                participant = %participant_id.short(),
                height = list.height(),
                penalty = state.pose_penalty,
                max_penalty = max,
                "participant banned"
            );
        } else {
            tracing::debug!(
                target: "pose",
                participant = %participant_id.short(),
                old = record.state.pose_penalty,
                new = state.pose_penalty,
                max_penalty = max,
                "participant punished"
            );
        }
        list.with_state(participant_id, Arc::new(state))
    }

    /// Lowers one participant's score by a single point.
    pub fn decay(&self, list: &ParticipantList, participant_id: &Hash256) -> Result<ParticipantList> {
        let record = list.get_required(participant_id)?;
        match compute_decay(&record.state) {
            Some(state) => list.with_state(participant_id, Arc::new(state)),
            None => Ok(list.clone()),
        }
    }

    /// Lowers every non-banned participant's score by a single point.
    pub fn decay_all(&self, list: &ParticipantList) -> Result<ParticipantList> {
        let mut updates = Vec::new();
        list.for_each(true, |record| {
            if let Some(state) = compute_decay(&record.state) {
                updates.push((record.participant_id, Arc::new(state)));
            }
        });
        if updates.is_empty() {
            return Ok(list.clone());
        }
        list.with_states(&updates)
    }

    /// Current status of a participant.
    pub fn status(&self, list: &ParticipantList, participant_id: &Hash256) -> Result<PoseStatus> {
        Ok(PoseStatus::of(&list.get_required(participant_id)?.state))
    }
}

/// The pure part of `penalize`: the new state, or `None` if nothing changes.
pub fn compute_penalty_update(
    state: &ParticipantState,
    penalty: u32,
    max_penalty: u32,
    height: i64,
) -> Option<ParticipantState> {
    if penalty == 0 || state.is_banned() {
        return None;
    }
    let mut next = state.clone();
    next.pose_penalty = state.pose_penalty.saturating_add(penalty).min(max_penalty);
    if next.pose_penalty >= max_penalty {
        next.pose_ban_height = Some(height);
    }
    Some(next)
}

/// The pure part of `decay`: the new state, or `None` if nothing changes.
pub fn compute_decay(state: &ParticipantState) -> Option<ParticipantState> {
    if state.is_banned() || state.pose_penalty == 0 {
        return None;
    }
    let mut next = state.clone();
    next.pose_penalty -= 1;
    Some(next)
}

/// Bans a participant at the list's height unless it is already banned.
pub fn ban_if_not_banned(list: &ParticipantList, participant_id: &Hash256) -> Result<ParticipantList> {
    let record = list.get_required(participant_id)?;
    if record.state.is_banned() {
        return Ok(list.clone());
    }
    let mut state = (*record.state).clone();
    state.pose_ban_height = Some(list.height());
    tracing::info!(
        target: "pose",
        participant = %participant_id.short(),
        height = list.height(),
        "participant banned"
    );
    list.with_state(participant_id, Arc::new(state))
}

/// Lifts a ban: clears the penalty and records the revival height.
pub fn revive(list: &ParticipantList, participant_id: &Hash256) -> Result<ParticipantList> {
    let record = list.get_required(participant_id)?;
    if !record.state.is_banned() {
        return Ok(list.clone());
    }
    let mut state = (*record.state).clone();
    state.pose_penalty = 0;
    state.pose_ban_height = None;
    state.pose_revived_height = Some(list.height());
    tracing::info!(
        target: "pose",
        participant = %participant_id.short(),
        height = list.height(),
        "participant revived"
    );
    list.with_state(participant_id, Arc::new(state))
}
