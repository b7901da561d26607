// Path: crates/state/src/registry/unique.rs

//! Unique properties: fields at most one live participant may hold.

use mnlist_types::app::{hash_encoded, Hash256, KeyId, OperatorKey, OutPoint, ParticipantState, ServiceAddr};

/// A borrowed unique property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueProperty<'a> {
    /// The collateral outpoint.
    Collateral(&'a OutPoint),
    /// The announced service address.
    Service(&'a ServiceAddr),
    /// The owner key id.
    OwnerKey(&'a KeyId),
    /// The operator public key.
    OperatorKey(&'a OperatorKey),
}

impl<'a> UniqueProperty<'a> {
    fn tag(&self) -> u8 {
        match self {
            Self::Collateral(_) => 0,
            Self::Service(_) => 1,
            Self::OwnerKey(_) => 2,
            Self::OperatorKey(_) => 3,
        }
    }

    /// Null values (unset address, reset operator key) are never indexed.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Collateral(v) => v.is_null(),
            Self::Service(v) => v.is_null(),
            Self::OwnerKey(v) => v.is_null(),
            Self::OperatorKey(v) => v.is_null(),
        }
    }

    /// The index key: SHA-256 over the kind tag and the SCALE-encoded value.
    pub fn index_key(&self) -> Hash256 {
        match self {
            Self::Collateral(v) => hash_encoded(&(self.tag(), *v)),
            Self::Service(v) => hash_encoded(&(self.tag(), *v)),
            Self::OwnerKey(v) => hash_encoded(&(self.tag(), *v)),
            Self::OperatorKey(v) => hash_encoded(&(self.tag(), *v)),
        }
    }

    /// A human-readable label for errors and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Collateral(v) => format!("collateral {:?}", v),
            Self::Service(v) => format!("service {:?}", v),
            Self::OwnerKey(v) => format!("owner_key {}", hex::encode(v.0)),
            Self::OperatorKey(v) => format!("operator_key {}", hex::encode(&v.0)),
        }
    }
}

/// The state-carried unique properties, in a fixed order.
pub(crate) fn state_properties(state: &ParticipantState) -> [UniqueProperty<'_>; 3] {
    [
        UniqueProperty::Service(&state.service),
        UniqueProperty::OwnerKey(&state.owner_key),
        UniqueProperty::OperatorKey(&state.operator_key),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_never_share_an_index_key() {
        let owner = KeyId([0u8; 20]);
        let service = ServiceAddr::NULL;
        assert_ne!(
            UniqueProperty::OwnerKey(&owner).index_key(),
            UniqueProperty::Service(&service).index_key()
        );
        assert!(UniqueProperty::Service(&service).is_null());
        assert!(UniqueProperty::OperatorKey(&OperatorKey::default()).is_null());
    }
}
