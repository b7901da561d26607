// Path: crates/state/src/registry/mod.rs

//! The versioned participant list.
//!
//! A `ParticipantList` is one registry version. All mutators are pure: they
//! return a new list and leave the receiver untouched, sharing every index
//! subtree they did not change.

mod unique;

pub use unique::UniqueProperty;

use crate::tree::PersistentMap;
use mnlist_types::app::{
    Hash256, KeyId, OperatorKey, OutPoint, ParticipantRecord, ParticipantState, ServiceAddr,
    StateDelta,
};
use mnlist_types::error::RegistryError;
use mnlist_types::Result;
use std::sync::Arc;
use unique::state_properties;

/// Owner of a unique property value, with the number of slots holding it.
type PropertyOwner = (Hash256, u32);

/// One immutable version of the participant registry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ParticipantList {
    block_hash: Hash256,
    height: i64,
    total_registered_count: u64,
    by_id: PersistentMap<Hash256, Arc<ParticipantRecord>>,
    by_internal_id: PersistentMap<u64, Hash256>,
    unique_properties: PersistentMap<Hash256, PropertyOwner>,
}

impl std::fmt::Debug for ParticipantList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantList")
            .field("block_hash", &self.block_hash)
            .field("height", &self.height)
            .field("total_registered_count", &self.total_registered_count)
            .field("all", &self.all_count())
            .field("valid", &self.valid_count())
            .finish()
    }
}

impl ParticipantList {
    /// Creates an empty list stamped with a block.
    pub fn new(block_hash: Hash256, height: i64) -> Self {
        Self {
            block_hash,
            height,
            ..Default::default()
        }
    }

    /// Rebuilds a list from persisted records, re-deriving every index.
    pub fn from_records<I>(
        block_hash: Hash256,
        height: i64,
        total_registered_count: u64,
        records: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = ParticipantRecord>,
    {
        let mut list = Self::new(block_hash, height);
        for record in records {
            list = list.with_added(record)?;
        }
        if list.total_registered_count > total_registered_count {
            return Err(RegistryError::invariant(format!(
                "snapshot count {} below highest internal id {}",
                total_registered_count, list.total_registered_count
            )));
        }
        list.total_registered_count = total_registered_count;
        Ok(list)
    }

    /// Hash of the block this version belongs to.
    pub fn block_hash(&self) -> Hash256 {
        self.block_hash
    }

    /// Height of the block this version belongs to.
    pub fn height(&self) -> i64 {
        self.height
    }

    /// Number of participants ever registered. Never decreases.
    pub fn total_registered_count(&self) -> u64 {
        self.total_registered_count
    }

    /// Returns a copy stamped with another block.
    pub fn with_block(&self, block_hash: Hash256, height: i64) -> Self {
        Self {
            block_hash,
            height,
            ..self.clone()
        }
    }

    /// Returns a copy stamped with another block hash, keeping the height.
    pub fn with_block_hash(&self, block_hash: Hash256) -> Self {
        self.with_block(block_hash, self.height)
    }

    pub(crate) fn with_total_registered_count(&self, total_registered_count: u64) -> Self {
        Self {
            total_registered_count,
            ..self.clone()
        }
    }

    // ---- lookups ----

    /// Looks up a participant by id.
    pub fn get(&self, participant_id: &Hash256) -> Option<&Arc<ParticipantRecord>> {
        self.by_id.get(participant_id)
    }

    /// Looks up a participant by id, failing with `UnknownParticipant`.
    pub fn get_required(&self, participant_id: &Hash256) -> Result<&Arc<ParticipantRecord>> {
        self.get(participant_id)
            .ok_or_else(|| RegistryError::UnknownParticipant(participant_id.to_string()))
    }

    /// Looks up a participant by id, returning it only if it is not banned.
    pub fn get_valid(&self, participant_id: &Hash256) -> Option<&Arc<ParticipantRecord>> {
        self.get(participant_id).filter(|r| r.is_valid())
    }

    /// Looks up a participant by internal id.
    pub fn get_by_internal_id(&self, internal_id: u64) -> Option<&Arc<ParticipantRecord>> {
        self.by_internal_id
            .get(&internal_id)
            .and_then(|id| self.by_id.get(id))
    }

    /// Returns the live participant holding a unique property value.
    pub fn get_by_unique_property(&self, property: UniqueProperty<'_>) -> Option<&Arc<ParticipantRecord>> {
        if property.is_null() {
            return None;
        }
        self.unique_properties
            .get(&property.index_key())
            .and_then(|(owner, _)| self.by_id.get(owner))
    }

    /// Looks up a participant by collateral.
    pub fn get_by_collateral(&self, collateral: &OutPoint) -> Option<&Arc<ParticipantRecord>> {
        self.get_by_unique_property(UniqueProperty::Collateral(collateral))
    }

    /// Looks up a participant by service address.
    pub fn get_by_service(&self, service: &ServiceAddr) -> Option<&Arc<ParticipantRecord>> {
        self.get_by_unique_property(UniqueProperty::Service(service))
    }

    /// Looks up a participant by operator key.
    pub fn get_by_operator_key(&self, key: &OperatorKey) -> Option<&Arc<ParticipantRecord>> {
        self.get_by_unique_property(UniqueProperty::OperatorKey(key))
    }

    /// Looks up a participant by owner key.
    pub fn get_by_owner_key(&self, key: &KeyId) -> Option<&Arc<ParticipantRecord>> {
        self.get_by_unique_property(UniqueProperty::OwnerKey(key))
    }

    /// Returns true if some live participant holds the value.
    pub fn has_unique_property(&self, property: UniqueProperty<'_>) -> bool {
        !property.is_null() && self.unique_properties.contains_key(&property.index_key())
    }

    /// Number of participants, banned ones included.
    pub fn all_count(&self) -> usize {
        self.by_id.len()
    }

    /// Number of participants that are not PoSe-banned.
    pub fn valid_count(&self) -> usize {
        self.by_id.values().filter(|r| r.is_valid()).count()
    }

    /// Iterates over all records in participant-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ParticipantRecord>> {
        self.by_id.values()
    }

    /// Calls `f` for every record, or only for valid ones.
    pub fn for_each<F: FnMut(&Arc<ParticipantRecord>)>(&self, only_valid: bool, mut f: F) {
        for record in self.by_id.values() {
            if !only_valid || record.is_valid() {
                f(record);
            }
        }
    }

    /// Number of entries in the unique-property index.
    pub fn unique_property_count(&self) -> usize {
        self.unique_properties.len()
    }

    // ---- mutators ----

    /// Adds a new participant. Fails if the id, internal id, or any unique
    /// property is already taken.
    pub fn with_added(&self, record: ParticipantRecord) -> Result<Self> {
        let participant_id = record.participant_id;
        if let Some(existing) = self.by_id.get(&participant_id) {
            return Err(RegistryError::DuplicateUniqueProperty {
                property: format!("participant_id {}", participant_id),
                owner: existing.participant_id,
            });
        }
        if self.by_internal_id.contains_key(&record.internal_id) {
            return Err(RegistryError::invariant(format!(
                "internal id {} already assigned",
                record.internal_id
            )));
        }

        let mut props = self.unique_properties.clone();
        props = add_property(&props, UniqueProperty::Collateral(&record.collateral), &participant_id)?;
        for property in state_properties(&record.state) {
            props = add_property(&props, property, &participant_id)?;
        }

        let internal_id = record.internal_id;
        Ok(Self {
            block_hash: self.block_hash,
            height: self.height,
            total_registered_count: self
                .total_registered_count
                .max(internal_id.saturating_add(1)),
            by_id: self.by_id.insert(participant_id, Arc::new(record)),
            by_internal_id: self.by_internal_id.insert(internal_id, participant_id),
            unique_properties: props,
        })
    }

    /// Patches a participant's state with a delta.
    pub fn with_updated(&self, participant_id: &Hash256, delta: &StateDelta) -> Result<Self> {
        let record = self.get_required(participant_id)?;
        let state = delta.apply_to(&record.state);
        self.with_state(participant_id, Arc::new(state))
    }

    /// Replaces a participant's state, re-indexing only the unique
    /// properties that changed.
    pub fn with_state(&self, participant_id: &Hash256, state: Arc<ParticipantState>) -> Result<Self> {
        self.with_states(&[(*participant_id, state)])
    }

    /// Replaces the state of several participants at once.
    ///
    /// All released property values are dropped from the index before any
    /// new value is claimed, so participants may swap values within a batch.
    pub fn with_states(&self, updates: &[(Hash256, Arc<ParticipantState>)]) -> Result<Self> {
        let mut changed = Vec::with_capacity(updates.len());
        for (participant_id, state) in updates {
            let old = self.get_required(participant_id)?;
            if Arc::ptr_eq(&old.state, state) || old.state == *state {
                continue;
            }
            changed.push((old, state));
        }
        if changed.is_empty() {
            return Ok(self.clone());
        }

        let mut props = self.unique_properties.clone();
        for (old, new_state) in &changed {
            for (before, after) in state_properties(&old.state)
                .into_iter()
                .zip(state_properties(new_state))
            {
                if before != after {
                    props = delete_property(&props, before, &old.participant_id)?;
                }
            }
        }
        let mut by_id = self.by_id.clone();
        for (old, new_state) in &changed {
            for (before, after) in state_properties(&old.state)
                .into_iter()
                .zip(state_properties(new_state))
            {
                if before != after {
                    props = add_property(&props, after, &old.participant_id)?;
                }
            }
            by_id = by_id.insert(
                old.participant_id,
                Arc::new(old.with_state(Arc::clone(new_state))),
            );
        }

        Ok(Self {
            by_id,
            unique_properties: props,
            ..self.clone()
        })
    }

    /// Removes a participant. Its internal id is retired, never reused.
    pub fn with_removed(&self, participant_id: &Hash256) -> Result<Self> {
        let record = self.get_required(participant_id)?;

        let mut props = delete_property(
            &self.unique_properties,
            UniqueProperty::Collateral(&record.collateral),
            participant_id,
        )?;
        for property in state_properties(&record.state) {
            props = delete_property(&props, property, participant_id)?;
        }

        Ok(Self {
            block_hash: self.block_hash,
            height: self.height,
            total_registered_count: self.total_registered_count,
            by_id: self.by_id.remove(participant_id),
            by_internal_id: self.by_internal_id.remove(&record.internal_id),
            unique_properties: props,
        })
    }
}

fn add_property(
    props: &PersistentMap<Hash256, PropertyOwner>,
    property: UniqueProperty<'_>,
    owner: &Hash256,
) -> Result<PersistentMap<Hash256, PropertyOwner>> {
    if property.is_null() {
        return Ok(props.clone());
    }
    let key = property.index_key();
    let count = match props.get(&key) {
        Some((existing, _)) if existing != owner => {
            return Err(RegistryError::DuplicateUniqueProperty {
                property: property.describe(),
                owner: *existing,
            })
        }
        Some((_, count)) => count.saturating_add(1),
        None => 1,
    };
    Ok(props.insert(key, (*owner, count)))
}

fn delete_property(
    props: &PersistentMap<Hash256, PropertyOwner>,
    property: UniqueProperty<'_>,
    owner: &Hash256,
) -> Result<PersistentMap<Hash256, PropertyOwner>> {
    if property.is_null() {
        return Ok(props.clone());
    }
    let key = property.index_key();
    match props.get(&key) {
        Some((existing, count)) if existing == owner => {
            if *count <= 1 {
                Ok(props.remove(&key))
            } else {
                Ok(props.insert(key, (*owner, count - 1)))
            }
        }
        _ => Err(RegistryError::invariant(format!(
            "{} not held by {}",
            property.describe(),
            owner
        ))),
    }
}

#[cfg(test)]
mod tests;
