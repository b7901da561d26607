// Path: crates/types/src/app/participant.rs

//! Participant identity, mutable state, and field-level state deltas.
//!
//! A `ParticipantRecord` is never mutated once it is published in a registry
//! version. Its mutable part, `ParticipantState`, is held behind an `Arc` and is
//! replaced wholesale on every change, so several registry versions can share
//! the same state value without ever observing a half-applied update.

use super::hash::Hash256;
use parity_scale_codec::{Compact, Decode, Encode, Input, Output};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

/// The maximum operator reward, in basis points (100.00%).
pub const MAX_OPERATOR_REWARD: u16 = 10_000;

/// A reference to a transaction output (the participant's collateral).
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct OutPoint {
    /// Hash of the funding transaction.
    pub tx_hash: Hash256,
    /// Output index within the funding transaction.
    pub index: u32,
}

impl OutPoint {
    /// Creates a new outpoint.
    pub fn new(tx_hash: Hash256, index: u32) -> Self {
        Self { tx_hash, index }
    }

    /// An outpoint with a zero transaction hash references nothing.
    pub fn is_null(&self) -> bool {
        self.tx_hash.is_null()
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tx_hash.short(), self.index)
    }
}

/// A network service address, stored as an IPv6 (or IPv4-mapped) address and port.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServiceAddr {
    /// The 16-byte IPv6 representation of the address.
    pub ip: [u8; 16],
    /// The TCP port.
    pub port: u16,
}

impl ServiceAddr {
    /// The unset address.
    pub const NULL: ServiceAddr = ServiceAddr {
        ip: [0u8; 16],
        port: 0,
    };

    /// Returns true if neither an address nor a port is set.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Converts back into a socket address.
    pub fn to_socket_addr(&self) -> SocketAddr {
        let v6 = Ipv6Addr::from(self.ip);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };
        SocketAddr::new(ip, self.port)
    }
}

impl From<SocketAddr> for ServiceAddr {
    fn from(addr: SocketAddr) -> Self {
        let v6 = match addr.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        Self {
            ip: v6.octets(),
            port: addr.port(),
        }
    }
}

impl fmt::Debug for ServiceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_socket_addr())
    }
}

impl Serialize for ServiceAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_socket_addr().to_string())
    }
}

impl<'de> Deserialize<'de> for ServiceAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<SocketAddr>()
            .map(ServiceAddr::from)
            .map_err(serde::de::Error::custom)
    }
}

/// A 20-byte key identifier (owner and voting keys).
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct KeyId(#[serde(with = "hex::serde")] pub [u8; 20]);

impl KeyId {
    /// Returns true if the key id is all zeroes.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.0))
    }
}

/// The operator's public key, kept as opaque bytes. Verification happens elsewhere.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct OperatorKey(#[serde(with = "hex::serde")] pub Vec<u8>);

impl OperatorKey {
    /// An empty key marks an operator that has been reset.
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperatorKey({})", hex::encode(&self.0))
    }
}

/// An output script used for payouts.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Script(#[serde(with = "hex::serde")] pub Vec<u8>);

impl Script {
    /// Returns true if the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

/// The mutable part of a participant. Values of this type are immutable once
/// shared; a change always builds a new value.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticipantState {
    /// Height of the block that carried the registration.
    pub registered_height: i64,
    /// Height at which the participant was last paid, 0 if never.
    pub last_paid_height: i64,
    /// Current proof-of-service penalty score.
    pub pose_penalty: u32,
    /// Height at which the participant was last revived from a ban.
    pub pose_revived_height: Option<i64>,
    /// Height at which the participant was banned. `Some` means banned.
    pub pose_ban_height: Option<i64>,
    /// Owner key id. Unique across live participants.
    pub owner_key: KeyId,
    /// Operator public key. Unique across live participants.
    pub operator_key: OperatorKey,
    /// Voting key id.
    pub voting_key: KeyId,
    /// Announced service address. Unique across live participants.
    pub service: ServiceAddr,
    /// Owner payout script.
    pub payout_script: Script,
    /// Operator payout script, empty if the operator is paid through the owner.
    pub operator_payout_script: Script,
    /// Operator share of the reward in basis points.
    pub operator_reward: u16,
}

impl ParticipantState {
    /// Returns true if the participant is PoSe-banned.
    pub fn is_banned(&self) -> bool {
        self.pose_ban_height.is_some()
    }

    /// Clears everything the operator announced. Used when the operator is
    /// replaced.
    pub fn reset_operator_fields(&mut self) {
        self.operator_key = OperatorKey::default();
        self.service = ServiceAddr::NULL;
        self.operator_payout_script = Script::default();
    }

    /// The height that anchors this participant's position in the payment
    /// rotation: the latest of its registration, revival and last payment.
    pub fn payment_anchor(&self) -> i64 {
        let revived = self.pose_revived_height.unwrap_or(-1);
        self.last_paid_height
            .max(self.registered_height)
            .max(revived)
    }
}

macro_rules! define_state_delta {
    ($($field:ident : $ty:ty),* $(,)?) => {
        /// A field-level delta over `ParticipantState`. Only fields that changed
        /// carry a value, which keeps diffs compact on disk and on the wire.
        #[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
        pub struct StateDelta {
            $(
                #[doc = concat!("New value of `", stringify!($field), "`, if it changed.")]
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl StateDelta {
            /// Computes the delta that turns `old` into `new`.
            pub fn between(old: &ParticipantState, new: &ParticipantState) -> Self {
                let mut delta = Self::default();
                $(
                    if old.$field != new.$field {
                        delta.$field = Some(new.$field.clone());
                    }
                )*
                delta
            }

            /// Builds a new state by patching the changed fields onto `base`.
            pub fn apply_to(&self, base: &ParticipantState) -> ParticipantState {
                let mut state = base.clone();
                $(
                    if let Some(value) = &self.$field {
                        state.$field = value.clone();
                    }
                )*
                state
            }

            /// Returns true if no field changed.
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }

            /// Names of the fields this delta touches.
            pub fn changed_fields(&self) -> Vec<&'static str> {
                let mut fields = Vec::new();
                $(
                    if self.$field.is_some() {
                        fields.push(stringify!($field));
                    }
                )*
                fields
            }
        }
    };
}

define_state_delta! {
    registered_height: i64,
    last_paid_height: i64,
    pose_penalty: u32,
    pose_revived_height: Option<i64>,
    pose_ban_height: Option<i64>,
    owner_key: KeyId,
    operator_key: OperatorKey,
    voting_key: KeyId,
    service: ServiceAddr,
    payout_script: Script,
    operator_payout_script: Script,
    operator_reward: u16,
}

/// One participant: identity plus a shared snapshot of its state.
///
/// `internal_id` is assigned once at registration and carried verbatim through
/// every later state change (`with_state` copies the id, never reassigns it).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    /// Stable external identifier, the hash of the registering transaction.
    pub participant_id: Hash256,
    /// Dense sequence number, never reused.
    pub internal_id: u64,
    /// The collateral that must stay unspent for the record to stay live.
    pub collateral: OutPoint,
    /// Shared, immutable state snapshot.
    pub state: Arc<ParticipantState>,
}

impl ParticipantRecord {
    /// Creates a record for a freshly registered participant.
    pub fn new(
        participant_id: Hash256,
        internal_id: u64,
        collateral: OutPoint,
        state: ParticipantState,
    ) -> Self {
        Self {
            participant_id,
            internal_id,
            collateral,
            state: Arc::new(state),
        }
    }

    /// Copies the record with a replacement state, preserving identity and internal id.
    pub fn with_state(&self, state: Arc<ParticipantState>) -> Self {
        Self {
            participant_id: self.participant_id,
            internal_id: self.internal_id,
            collateral: self.collateral,
            state,
        }
    }

    /// Returns true unless the participant is PoSe-banned.
    pub fn is_valid(&self) -> bool {
        !self.state.is_banned()
    }
}

impl Encode for ParticipantRecord {
    fn size_hint(&self) -> usize {
        32 + 9 + self.collateral.size_hint() + self.state.size_hint()
    }

    fn encode_to<O: Output + ?Sized>(&self, dest: &mut O) {
        self.participant_id.encode_to(dest);
        Compact(self.internal_id).encode_to(dest);
        self.collateral.encode_to(dest);
        self.state.as_ref().encode_to(dest);
    }
}

impl Decode for ParticipantRecord {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let participant_id = Hash256::decode(input)?;
        let internal_id = Compact::<u64>::decode(input)?.0;
        let collateral = OutPoint::decode(input)?;
        let state = ParticipantState::decode(input)?;
        Ok(Self {
            participant_id,
            internal_id,
            collateral,
            state: Arc::new(state),
        })
    }
}
