// Path: crates/types/src/app/transition.rs

//! Normalized block contents consumed by the transition builder.
//!
//! Payload parsing and signature checks happen upstream. These types carry only
//! the fields the registry reads.

use super::hash::Hash256;
use super::participant::{KeyId, OperatorKey, OutPoint, Script, ServiceAddr};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A special transaction, already validated for signatures and fees.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecialTransaction {
    /// Registers a new participant.
    Register {
        /// Hash of the registering transaction, which becomes the participant id.
        participant_id: Hash256,
        /// Collateral locked for the participant.
        collateral: OutPoint,
        /// Announced service address (may be null).
        service: ServiceAddr,
        /// Owner key id.
        owner_key: KeyId,
        /// Operator public key.
        operator_key: OperatorKey,
        /// Voting key id.
        voting_key: KeyId,
        /// Owner payout script.
        payout_script: Script,
        /// Operator reward in basis points.
        operator_reward: u16,
    },
    /// The operator announces a (new) service address.
    UpdateService {
        /// Target participant.
        participant_id: Hash256,
        /// New service address.
        service: ServiceAddr,
        /// New operator payout script.
        operator_payout_script: Script,
    },
    /// The owner replaces the operator key, voting key or payout script.
    UpdateRegistrar {
        /// Target participant.
        participant_id: Hash256,
        /// New operator key.
        operator_key: OperatorKey,
        /// New voting key.
        voting_key: KeyId,
        /// New owner payout script.
        payout_script: Script,
    },
    /// The operator revokes its service.
    Revoke {
        /// Target participant.
        participant_id: Hash256,
        /// Reason code.
        reason: u16,
    },
}

impl SpecialTransaction {
    /// The participant this transaction refers to.
    pub fn participant_id(&self) -> &Hash256 {
        match self {
            Self::Register { participant_id, .. }
            | Self::UpdateService { participant_id, .. }
            | Self::UpdateRegistrar { participant_id, .. }
            | Self::Revoke { participant_id, .. } => participant_id,
        }
    }

    /// A short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::UpdateService { .. } => "update_service",
            Self::UpdateRegistrar { .. } => "update_registrar",
            Self::Revoke { .. } => "revoke",
        }
    }
}

/// A final quorum commitment mined in a block.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct QuorumCommitment {
    /// Hash identifying the quorum.
    pub quorum_hash: Hash256,
    /// Quorum members, in quorum order.
    pub members: Vec<Hash256>,
    /// `valid_members[i]` is true if `members[i]` contributed validly.
    pub valid_members: Vec<bool>,
}

impl QuorumCommitment {
    /// Returns true for a null commitment (no quorum formed).
    pub fn is_null(&self) -> bool {
        self.members.is_empty()
    }

    /// Members that failed to contribute.
    pub fn invalid_members(&self) -> impl Iterator<Item = &Hash256> {
        self.members
            .iter()
            .zip(self.valid_members.iter())
            .filter_map(|(member, valid)| (!*valid).then_some(member))
    }
}

/// Everything the registry needs from one connected block.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockContents {
    /// Height of the block.
    pub height: i64,
    /// Hash of the block.
    pub block_hash: Hash256,
    /// Hash of the parent block.
    pub prev_block_hash: Hash256,
    /// Special transactions, in block order.
    #[serde(default)]
    pub transactions: Vec<SpecialTransaction>,
    /// Quorum commitments mined in this block.
    #[serde(default)]
    pub commitments: Vec<QuorumCommitment>,
    /// Outpoints spent by any transaction in this block.
    #[serde(default)]
    pub spent_collaterals: Vec<OutPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_members_follow_the_bitmap() {
        let commitment = QuorumCommitment {
            quorum_hash: Hash256([7; 32]),
            members: vec![Hash256([1; 32]), Hash256([2; 32]), Hash256([3; 32])],
            valid_members: vec![true, false, false],
        };
        let invalid: Vec<_> = commitment.invalid_members().copied().collect();
        assert_eq!(invalid, vec![Hash256([2; 32]), Hash256([3; 32])]);
    }

    #[test]
    fn block_contents_parse_from_json() {
        let json = format!(
            r#"{{
                "height": 5,
                "block_hash": "{h}",
                "prev_block_hash": "{p}",
                "transactions": [
                    {{ "kind": "revoke", "participant_id": "{h}", "reason": 1 }}
                ]
            }}"#,
            h = Hash256([5; 32]),
            p = Hash256([4; 32]),
        );
        let block: BlockContents = serde_json::from_str(&json).unwrap();
        assert_eq!(block.height, 5);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].kind(), "revoke");
        assert!(block.commitments.is_empty());
    }
}
