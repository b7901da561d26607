// Path: crates/consensus/src/transition.rs
//! Builds the next registry version from the previous one and a block.

use crate::common::penalty::apply_commitment_penalties;
use mnlist_state::{pose, ParticipantList, PoseEngine};
use mnlist_types::app::{
    BlockContents, Hash256, ParticipantRecord, ParticipantState, SpecialTransaction,
    MAX_OPERATOR_REWARD,
};
use mnlist_types::config::RegistryConfig;
use mnlist_types::error::RegistryError;
use mnlist_types::Result;
use std::sync::Arc;

/// The result of folding one block into the registry.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The next registry version, stamped with the block height. The block
    /// hash is left null for the caller to stamp.
    pub list: ParticipantList,
    /// Transactions that were skipped, by index in the block, with the reason.
    pub rejected: Vec<(usize, RegistryError)>,
}

impl TransitionOutcome {
    /// Returns true if every transaction was applied.
    pub fn all_applied(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Folds blocks into registry versions.
#[derive(Debug, Clone)]
pub struct TransitionBuilder {
    pose: PoseEngine,
    commitment_penalty_percent: u32,
    activation_height: i64,
}

impl Default for TransitionBuilder {
    fn default() -> Self {
        Self::new(&RegistryConfig::default())
    }
}

impl TransitionBuilder {
    /// Creates a builder from the registry configuration.
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            pose: PoseEngine::from_config(config),
            commitment_penalty_percent: config.commitment_penalty_percent,
            activation_height: config.activation_height,
        }
    }

    /// The PoSe engine the builder punishes with.
    pub fn pose(&self) -> &PoseEngine {
        &self.pose
    }

    /// Produces the registry version after `block`.
    ///
    /// Stages, in order: PoSe decay, payment of the previous version's payee,
    /// removal of participants whose collateral was spent, the special
    /// transactions in block order, a second spent-collateral sweep for
    /// participants registered in this block, then quorum commitment penalties.
    ///
    /// A malformed transaction or commitment fails the whole call and no
    /// version is produced. Any other per-transaction failure (a unique
    /// property collision, an unknown participant) skips that transaction
    /// and is reported in `rejected`.
    pub fn build_next(&self, prev: &ParticipantList, block: &BlockContents) -> Result<TransitionOutcome> {
        if block.height != prev.height() + 1 {
            return Err(RegistryError::MalformedTransition(format!(
                "block at height {} does not follow registry at height {}",
                block.height,
                prev.height()
            )));
        }
        let mut list = prev.with_block(Hash256::ZERO, block.height);
        if block.height < self.activation_height {
            return Ok(TransitionOutcome {
                list,
                rejected: Vec::new(),
            });
        }

        list = self.pose.decay_all(&list)?;

        if let Some(payee) = prev.next_payee() {
            if let Some(current) = list.get(&payee.participant_id) {
                let mut state = (*current.state).clone();
                state.last_paid_height = block.height;
                list = list.with_state(&payee.participant_id, Arc::new(state))?;
            }
        }

        list = remove_spent_collateral(&list, block)?;

        let mut rejected = Vec::new();
        for (index, tx) in block.transactions.iter().enumerate() {
            match self.apply_transaction(&list, tx, block.height) {
                Ok(next) => list = next,
                Err(e) if e.is_fatal() => {
                    tracing::warn!(
                        target: "transition",
                        height = block.height,
                        index,
                        kind = tx.kind(),
                        error = %e,
                        "block rejected"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(
                        target: "transition",
                        height = block.height,
                        index,
                        kind = tx.kind(),
                        error = %e,
                        "transaction skipped"
                    );
                    rejected.push((index, e));
                }
            }
        }

        // Participants registered by this block may have their collateral
        // spent in it too.
        list = remove_spent_collateral(&list, block)?;

        for commitment in &block.commitments {
            list = apply_commitment_penalties(
                &self.pose,
                &list,
                commitment,
                self.commitment_penalty_percent,
            )?;
        }

        Ok(TransitionOutcome { list, rejected })
    }

    fn apply_transaction(
        &self,
        list: &ParticipantList,
        tx: &SpecialTransaction,
        height: i64,
    ) -> Result<ParticipantList> {
        match tx {
            SpecialTransaction::Register {
                participant_id,
                collateral,
                service,
                owner_key,
                operator_key,
                voting_key,
                payout_script,
                operator_reward,
            } => {
                if collateral.is_null() {
                    return Err(RegistryError::MalformedTransition(format!(
                        "registration {} references no collateral",
                        participant_id.short()
                    )));
                }
                if owner_key.is_null() || payout_script.is_empty() {
                    return Err(RegistryError::MalformedTransition(format!(
                        "registration {} lacks an owner key or payout script",
                        participant_id.short()
                    )));
                }
                if *operator_reward > MAX_OPERATOR_REWARD {
                    return Err(RegistryError::MalformedTransition(format!(
                        "operator reward {} above {}",
                        operator_reward, MAX_OPERATOR_REWARD
                    )));
                }

                let state = ParticipantState {
                    registered_height: height,
                    owner_key: *owner_key,
                    operator_key: operator_key.clone(),
                    voting_key: *voting_key,
                    service: *service,
                    payout_script: payout_script.clone(),
                    operator_reward: *operator_reward,
                    ..Default::default()
                };
                let internal_id = list.total_registered_count();
                let next = list.with_added(ParticipantRecord::new(
                    *participant_id,
                    internal_id,
                    *collateral,
                    state,
                ))?;
                tracing::info!(
                    target: "transition",
                    participant = %participant_id.short(),
                    internal_id,
                    height,
                    "participant registered"
                );
                Ok(next)
            }
            SpecialTransaction::UpdateService {
                participant_id,
                service,
                operator_payout_script,
            } => {
                let record = list.get_required(participant_id)?;
                let mut state = (*record.state).clone();
                state.service = *service;
                state.operator_payout_script = operator_payout_script.clone();
                let revive = state.is_banned()
                    && !state.operator_key.is_null()
                    && !state.owner_key.is_null()
                    && !state.voting_key.is_null();
                let next = list.with_state(participant_id, Arc::new(state))?;
                if revive {
                    pose::revive(&next, participant_id)
                } else {
                    Ok(next)
                }
            }
            SpecialTransaction::UpdateRegistrar {
                participant_id,
                operator_key,
                voting_key,
                payout_script,
            } => {
                if payout_script.is_empty() {
                    return Err(RegistryError::MalformedTransition(format!(
                        "registrar update {} has an empty payout script",
                        participant_id.short()
                    )));
                }
                let record = list.get_required(participant_id)?;
                let mut state = (*record.state).clone();
                let operator_changed = state.operator_key != *operator_key;
                if operator_changed {
                    state.reset_operator_fields();
                }
                state.operator_key = operator_key.clone();
                state.voting_key = *voting_key;
                state.payout_script = payout_script.clone();
                let next = list.with_state(participant_id, Arc::new(state))?;
                if operator_changed {
                    pose::ban_if_not_banned(&next, participant_id)
                } else {
                    Ok(next)
                }
            }
            SpecialTransaction::Revoke {
                participant_id,
                reason,
            } => {
                let next = list.with_removed(participant_id)?;
                tracing::info!(
                    target: "transition",
                    participant = %participant_id.short(),
                    reason,
                    height,
                    "participant revoked"
                );
                Ok(next)
            }
        }
    }
}

fn remove_spent_collateral(list: &ParticipantList, block: &BlockContents) -> Result<ParticipantList> {
    let mut list = list.clone();
    for outpoint in &block.spent_collaterals {
        let Some(record) = list.get_by_collateral(outpoint) else {
            continue;
        };
        let id = record.participant_id;
        tracing::info!(
            target: "transition",
            participant = %id.short(),
            height = block.height,
            "collateral spent, removing participant"
        );
        list = list.with_removed(&id)?;
    }
    Ok(list)
}
