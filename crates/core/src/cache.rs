//! Per-import working-snapshot cache.
//!
//! During one import run, consecutive change batches for the same field must
//! build on each other without re-parsing the stored baseline every time.
//! [`SnapshotCache`] holds the current working snapshot per field id as an
//! explicit context object: the caller creates it when a batch run starts
//! and drops (or clears) it when the item import finishes. The surrounding
//! import is single-threaded per item, so no locking is involved.

use std::collections::HashMap;

use crate::checklist::Checklist;

/// Field id -> current working snapshot for one import run.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    snapshots: HashMap<i64, Checklist>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached working snapshot for a field, if any.
    pub fn get(&self, field_id: i64) -> Option<&Checklist> {
        self.snapshots.get(&field_id)
    }

    /// The cached working snapshot for a field, creating it from `init` when
    /// absent.
    pub fn get_or_insert_with(
        &mut self,
        field_id: i64,
        init: impl FnOnce() -> Checklist,
    ) -> &mut Checklist {
        self.snapshots.entry(field_id).or_insert_with(init)
    }

    /// Replace the working snapshot for a field, returning the previous one.
    pub fn put(&mut self, field_id: i64, checklist: Checklist) -> Option<Checklist> {
        self.snapshots.insert(field_id, checklist)
    }

    /// Drop the working snapshot for a field, e.g. after its item import
    /// finished.
    pub fn remove(&mut self, field_id: i64) -> Option<Checklist> {
        self.snapshots.remove(&field_id)
    }

    /// Drop all cached snapshots.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
