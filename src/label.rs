//! Bidirectional mapping between external 64-bit labels and dense internal
//! 32-bit ids, shared by HGraph and SINDI so both subsystems expose the same
//! caller-facing identity space regardless of their internal node/doc layout.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by [`LabelTable`] operations.
#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    /// `update_label` was asked to retarget a label that is already live.
    #[error("label {0} is already in use")]
    LabelInUse(u64),

    /// The internal id referenced does not exist in the table.
    #[error("internal id {0} not found")]
    IdNotFound(u32),
}

/// Internal id returned when a label isn't present (or is tombstoned and
/// `allow_tombstone` was false).
pub const NOT_FOUND: u32 = u32::MAX;

/// Bidirectional label <-> internal id map with tombstones and duplicate-id
/// chains.
///
/// `labels[id]` is the external label for internal id `id`. `reverse` maps
/// label back to id for O(1) lookup. `tombstones` marks ids whose label has
/// been removed without reclaiming the slot (internal ids are append-only,
/// matching the graph's own node numbering).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LabelTable {
    labels: Vec<u64>,
    #[serde(skip)]
    reverse: HashMap<u64, u32>,
    tombstones: BitVec,
    /// `duplicates[id]` is the next id in a circular chain of ids sharing
    /// `labels[id]`, or `id` itself if it has no duplicates. Only populated
    /// when duplicate compression is enabled by the caller.
    #[serde(default)]
    duplicates: Vec<u32>,
}

impl LabelTable {
    /// Creates an empty label table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the `label -> id` reverse map from `labels` and `tombstones`.
    ///
    /// Called after deserialization, since the reverse map isn't persisted.
    pub fn rebuild_reverse_map(&mut self) {
        self.reverse.clear();
        for (id, &label) in self.labels.iter().enumerate() {
            if !self.tombstones[id] {
                self.reverse.insert(label, id as u32);
            }
        }
    }

    /// Number of internal id slots, live or tombstoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the table has no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Appends a new `(id, label)` pair. `id` must equal the current length
    /// (ids are assigned densely); the table grows by exactly one slot.
    pub fn insert(&mut self, id: u32, label: u64) {
        let idx = id as usize;
        if idx >= self.labels.len() {
            self.labels.resize(idx + 1, 0);
            self.tombstones.resize(idx + 1, false);
            self.duplicates.resize(idx + 1, 0);
        }
        self.labels[idx] = label;
        self.duplicates[idx] = id;
        self.reverse.insert(label, id);
    }

    /// Looks up the internal id for `label`.
    ///
    /// Returns [`NOT_FOUND`] if the label was never inserted, or if it is
    /// tombstoned and `allow_tombstone` is false.
    #[must_use]
    pub fn get_id_by_label(&self, label: u64, allow_tombstone: bool) -> u32 {
        let Some(&id) = self.reverse.get(&label) else {
            return NOT_FOUND;
        };
        if !allow_tombstone && self.is_tombstoned(id) {
            return NOT_FOUND;
        }
        id
    }

    /// Returns the external label for `id`, if the slot exists.
    #[must_use]
    pub fn label_of(&self, id: u32) -> Option<u64> {
        self.labels.get(id as usize).copied()
    }

    fn is_tombstoned(&self, id: u32) -> bool {
        let idx = id as usize;
        idx < self.tombstones.len() && self.tombstones[idx]
    }

    /// Flips the tombstone bit for each label in `labels` that is currently
    /// live, removing it from the reverse map. Returns the number actually
    /// flipped (labels not found, or already tombstoned, don't count).
    pub fn mark_remove(&mut self, labels: &[u64]) -> usize {
        let mut flipped = 0;
        for &label in labels {
            let id = self.get_id_by_label(label, false);
            if id == NOT_FOUND {
                continue;
            }
            self.tombstones.set(id as usize, true);
            self.reverse.remove(&label);
            flipped += 1;
        }
        flipped
    }

    /// Retargets the label of internal id `old_id` from its current label
    /// to `new_label`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::LabelInUse`] if `new_label` is already live
    /// under a different id, or [`LabelError::IdNotFound`] if `old_id`
    /// doesn't exist.
    pub fn update_label(&mut self, old_id: u32, new_label: u64) -> Result<(), LabelError> {
        let idx = old_id as usize;
        if idx >= self.labels.len() {
            return Err(LabelError::IdNotFound(old_id));
        }
        if self.get_id_by_label(new_label, false) != NOT_FOUND {
            return Err(LabelError::LabelInUse(new_label));
        }
        let old_label = self.labels[idx];
        self.reverse.remove(&old_label);
        self.labels[idx] = new_label;
        self.reverse.insert(new_label, old_id);
        Ok(())
    }

    /// Merges `other`'s entries into `self`, mapping each of `other`'s
    /// internal ids through `id_map_fn` to obtain the id it should occupy
    /// in `self`. Tombstones are preserved across the merge.
    pub fn merge_other(&mut self, other: &Self, id_map_fn: impl Fn(u32) -> u32) {
        for (old_id, &label) in other.labels.iter().enumerate() {
            let old_id = old_id as u32;
            let new_id = id_map_fn(old_id);
            self.insert(new_id, label);
            if other.is_tombstoned(old_id) {
                self.tombstones.set(new_id as usize, true);
                self.reverse.remove(&label);
            }
        }
    }

    /// Threads `cur` into the circular duplicate-id chain that currently
    /// contains `prev`, so lookups on their shared label can walk every id.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::IdNotFound`] if either id is out of range.
    pub fn set_duplicate_id(&mut self, prev: u32, cur: u32) -> Result<(), LabelError> {
        if prev as usize >= self.duplicates.len() {
            return Err(LabelError::IdNotFound(prev));
        }
        if cur as usize >= self.duplicates.len() {
            return Err(LabelError::IdNotFound(cur));
        }
        let next = self.duplicates[prev as usize];
        self.duplicates[prev as usize] = cur;
        self.duplicates[cur as usize] = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_roundtrips() {
        let mut table = LabelTable::new();
        table.insert(0, 100);
        table.insert(1, 200);
        assert_eq!(table.get_id_by_label(100, false), 0);
        assert_eq!(table.get_id_by_label(200, false), 1);
        assert_eq!(table.get_id_by_label(999, false), NOT_FOUND);
    }

    #[test]
    fn mark_remove_tombstones_and_reports_count() {
        let mut table = LabelTable::new();
        table.insert(0, 100);
        table.insert(1, 200);
        assert_eq!(table.mark_remove(&[100, 999]), 1);
        assert_eq!(table.get_id_by_label(100, false), NOT_FOUND);
        assert_eq!(table.get_id_by_label(100, true), 0);
    }

    #[test]
    fn update_label_rejects_live_target() {
        let mut table = LabelTable::new();
        table.insert(0, 100);
        table.insert(1, 200);
        assert_eq!(
            table.update_label(0, 200),
            Err(LabelError::LabelInUse(200))
        );
        table.update_label(0, 300).unwrap();
        assert_eq!(table.get_id_by_label(300, false), 0);
        assert_eq!(table.get_id_by_label(100, false), NOT_FOUND);
    }

    #[test]
    fn rebuild_reverse_map_skips_tombstones() {
        let mut table = LabelTable::new();
        table.insert(0, 100);
        table.insert(1, 200);
        table.mark_remove(&[100]);
        table.rebuild_reverse_map();
        assert_eq!(table.get_id_by_label(100, false), NOT_FOUND);
        assert_eq!(table.get_id_by_label(200, false), 1);
    }

    #[test]
    fn merge_other_preserves_tombstones_under_remapped_ids() {
        let mut a = LabelTable::new();
        a.insert(0, 1);
        a.insert(1, 2);

        let mut b = LabelTable::new();
        b.insert(0, 10);
        b.insert(1, 20);
        b.mark_remove(&[20]);

        a.merge_other(&b, |old_id| old_id + 2);
        assert_eq!(a.get_id_by_label(10, false), 2);
        assert_eq!(a.get_id_by_label(20, false), NOT_FOUND);
        assert_eq!(a.get_id_by_label(20, true), 3);
    }

    #[test]
    fn set_duplicate_id_threads_circular_chain() {
        let mut table = LabelTable::new();
        table.insert(0, 42);
        table.insert(1, 42);
        table.insert(2, 42);
        table.set_duplicate_id(0, 1).unwrap();
        table.set_duplicate_id(1, 2).unwrap();

        assert_eq!(table.duplicates[0], 1);
        assert_eq!(table.duplicates[1], 2);
        assert_eq!(table.duplicates[2], 0);
    }
}
