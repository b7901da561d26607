//! Test fixtures for reproducible tests
//!
//! Every helper is a pure function of its numeric seed, so two calls with the
//! same `n` describe the same participant and different `n` never collide on
//! a unique property.

use mnlist_types::app::{
    sha256, BlockContents, Hash256, KeyId, OperatorKey, OutPoint, ParticipantRecord,
    ParticipantState, QuorumCommitment, Script, ServiceAddr, SpecialTransaction,
};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

fn derived(label: &str, n: u64) -> Hash256 {
    sha256(format!("{}-{}", label, n))
}

/// The participant id of fixture participant `n`.
pub fn participant_id(n: u64) -> Hash256 {
    derived("participant", n)
}

/// The collateral of fixture participant `n`.
pub fn collateral(n: u64) -> OutPoint {
    OutPoint::new(derived("collateral", n), (n % 4) as u32)
}

/// A distinct IPv4 service address for `n`.
pub fn service(n: u64) -> ServiceAddr {
    let b = n.to_be_bytes();
    let [.., b1, b2, b3] = b;
    let ip = Ipv4Addr::new(10, b1, b2, b3);
    ServiceAddr::from(SocketAddr::V4(SocketAddrV4::new(ip, 9999)))
}

fn key_id(label: &str, n: u64) -> KeyId {
    let mut out = [0u8; 20];
    out.copy_from_slice(derived(label, n).0.get(..20).unwrap_or(&[0u8; 20]));
    KeyId(out)
}

/// The owner key of fixture participant `n`.
pub fn owner_key(n: u64) -> KeyId {
    key_id("owner", n)
}

/// The voting key of fixture participant `n`.
pub fn voting_key(n: u64) -> KeyId {
    key_id("voting", n)
}

/// A 48-byte operator key for `n`.
pub fn operator_key(n: u64) -> OperatorKey {
    let mut bytes = derived("operator", n).0.to_vec();
    bytes.extend_from_slice(derived("operator-tail", n).0.get(..16).unwrap_or_default());
    OperatorKey(bytes)
}

/// A pay-to-key-hash style payout script for `n`.
pub fn payout_script(n: u64) -> Script {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(&owner_key(n).0);
    script.extend_from_slice(&[0x88, 0xac]);
    Script(script)
}

/// The full state of fixture participant `n`, registered at `height`.
pub fn participant_state(n: u64, height: i64) -> ParticipantState {
    ParticipantState {
        registered_height: height,
        owner_key: owner_key(n),
        operator_key: operator_key(n),
        voting_key: voting_key(n),
        service: service(n),
        payout_script: payout_script(n),
        operator_reward: 0,
        ..Default::default()
    }
}

/// A record for fixture participant `n` with the given internal id.
pub fn participant_record(n: u64, internal_id: u64, height: i64) -> ParticipantRecord {
    ParticipantRecord::new(
        participant_id(n),
        internal_id,
        collateral(n),
        participant_state(n, height),
    )
}

/// A registration of fixture participant `n`.
pub fn register_tx(n: u64) -> SpecialTransaction {
    let state = participant_state(n, 0);
    SpecialTransaction::Register {
        participant_id: participant_id(n),
        collateral: collateral(n),
        service: state.service,
        owner_key: state.owner_key,
        operator_key: state.operator_key,
        voting_key: state.voting_key,
        payout_script: state.payout_script,
        operator_reward: 0,
    }
}

/// A service update moving participant `n` to `service`.
pub fn update_service_tx(n: u64, service: ServiceAddr) -> SpecialTransaction {
    SpecialTransaction::UpdateService {
        participant_id: participant_id(n),
        service,
        operator_payout_script: Script::default(),
    }
}

/// A registrar update giving participant `n` the operator key of `operator_seed`.
pub fn update_registrar_tx(n: u64, operator_seed: u64) -> SpecialTransaction {
    SpecialTransaction::UpdateRegistrar {
        participant_id: participant_id(n),
        operator_key: operator_key(operator_seed),
        voting_key: voting_key(n),
        payout_script: payout_script(n),
    }
}

/// A revocation of participant `n`.
pub fn revoke_tx(n: u64) -> SpecialTransaction {
    SpecialTransaction::Revoke {
        participant_id: participant_id(n),
        reason: 1,
    }
}

/// A commitment where every member except `failed` contributed.
pub fn commitment(members: &[Hash256], failed: &[Hash256]) -> QuorumCommitment {
    QuorumCommitment {
        quorum_hash: sha256(members.iter().flat_map(|m| m.0).collect::<Vec<u8>>()),
        members: members.to_vec(),
        valid_members: members.iter().map(|m| !failed.contains(m)).collect(),
    }
}

/// The hash of the block at `height` on fork `fork` (0 is the main chain).
pub fn block_hash(height: i64, fork: u8) -> Hash256 {
    sha256(format!("block-{}-{}", fork, height))
}

/// Builder for `BlockContents`.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    contents: BlockContents,
}

impl BlockBuilder {
    /// A main-chain block at `height` whose parent is the main-chain block below it.
    pub fn new(height: i64) -> Self {
        let prev = if height > 0 {
            block_hash(height - 1, 0)
        } else {
            Hash256::ZERO
        };
        Self {
            contents: BlockContents {
                height,
                block_hash: block_hash(height, 0),
                prev_block_hash: prev,
                ..Default::default()
            },
        }
    }

    /// Moves the block onto fork `fork`, keeping its parent.
    pub fn fork(mut self, fork: u8) -> Self {
        self.contents.block_hash = block_hash(self.contents.height, fork);
        self
    }

    /// Overrides the parent hash.
    pub fn parent(mut self, prev: Hash256) -> Self {
        self.contents.prev_block_hash = prev;
        self
    }

    /// Appends a special transaction.
    pub fn tx(mut self, tx: SpecialTransaction) -> Self {
        self.contents.transactions.push(tx);
        self
    }

    /// Appends a quorum commitment.
    pub fn commitment(mut self, commitment: QuorumCommitment) -> Self {
        self.contents.commitments.push(commitment);
        self
    }

    /// Marks an outpoint as spent in this block.
    pub fn spend(mut self, outpoint: OutPoint) -> Self {
        self.contents.spent_collaterals.push(outpoint);
        self
    }

    /// Finishes the block.
    pub fn build(self) -> BlockContents {
        self.contents
    }
}

/// A main-chain block at `height` with no registry activity.
pub fn empty_block(height: i64) -> BlockContents {
    BlockBuilder::new(height).build()
}
