//! Insertion-ordered entity table.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::key::{CanonicalKey, Key, KeyCodec};
use crate::types::SequenceNumber;
use dsim_codec::Timestamp;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct Slot {
    seq: SequenceNumber,
    create_time: Timestamp,
    entity: Entity,
}

/// Maps canonical keys to stored entity snapshots.
///
/// Scans visit slots in the order they were first written. Overwriting a
/// slot keeps its position; removing and re-adding a key moves it to the
/// end.
#[derive(Debug, Default)]
pub struct EntityTable {
    slots: HashMap<CanonicalKey, Slot>,
    order: BTreeMap<SequenceNumber, CanonicalKey>,
    next_seq: SequenceNumber,
}

impl EntityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `key` is stored.
    #[must_use]
    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.slots.contains_key(key)
    }

    /// The entity stored under `key`.
    #[must_use]
    pub fn get(&self, key: &CanonicalKey) -> Option<&Entity> {
        self.slots.get(key).map(|slot| &slot.entity)
    }

    /// When the slot under `key` was first written.
    #[must_use]
    pub fn create_time(&self, key: &CanonicalKey) -> Option<Timestamp> {
        self.slots.get(key).map(|slot| slot.create_time)
    }

    /// Stores `entity` under `key`, overwriting any previous snapshot.
    ///
    /// Returns the slot's creation time: `now` for a new slot, the original
    /// time for an overwrite.
    pub fn put(&mut self, key: CanonicalKey, entity: Entity, now: Timestamp) -> Timestamp {
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.entity = entity;
            return slot.create_time;
        }
        let seq = self.next_seq.advance();
        self.order.insert(seq, key.clone());
        self.slots.insert(
            key,
            Slot {
                seq,
                create_time: now,
                entity,
            },
        );
        now
    }

    /// Removes `key`, returning the entity that was stored.
    pub fn remove(&mut self, key: &CanonicalKey) -> Option<Entity> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.entity)
    }

    /// Drops every entity.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.next_seq = SequenceNumber::default();
    }

    /// Iterates stored entities in insertion order.
    pub fn scan(&self) -> impl Iterator<Item = (&CanonicalKey, &Entity)> + '_ {
        self.order.values().filter_map(move |key| {
            self.slots.get(key).map(|slot| (key, &slot.entity))
        })
    }

    /// Looks up `keys` and returns owned copies of the entities found.
    ///
    /// A key equal to the one right before it is skipped; non-adjacent
    /// repeats are returned again. Missing keys are left out.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if `keys` is empty or a key is
    /// malformed.
    pub fn lookup(&self, keys: &[Key]) -> CoreResult<Vec<Entity>> {
        if keys.is_empty() {
            return Err(CoreError::invalid_argument(
                "At least one Key object is required.",
            ));
        }
        let mut found = Vec::with_capacity(keys.len());
        let mut previous: Option<CanonicalKey> = None;
        for key in keys {
            let canonical = KeyCodec::serialize(key)?;
            if previous.as_ref() == Some(&canonical) {
                continue;
            }
            if let Some(entity) = self.get(&canonical) {
                found.push(entity.clone());
            }
            previous = Some(canonical);
        }
        Ok(found)
    }
}
