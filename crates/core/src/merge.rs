//! Incremental checklist merge engine.
//!
//! Applies a batch of parsed changelog records against the previous snapshot
//! to reconstruct the next one. The engine never fails: records that cannot
//! be resolved (e.g. a modification of an item that was removed locally)
//! are dropped silently, which is exactly the behavior an incremental,
//! eventually-consistent field sync needs — a later change event must not
//! resurrect an item a local edit already deleted.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::cache::SnapshotCache;
use crate::changelog::ItemChange;
use crate::checklist::{unwrap_checklist, wrap_checklist, Checklist};
use crate::mapping::FieldMapping;

/// The result of one merge pass.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Wrapped serialized form of the untouched baseline snapshot.
    pub before: String,
    /// Wrapped serialized form of the merged snapshot.
    pub after: String,
    /// The merged snapshot itself.
    pub checklist: Checklist,
}

/// Applies change batches onto checklist snapshots.
pub struct MergeEngine<'a> {
    mapping: &'a dyn FieldMapping,
}

impl<'a> MergeEngine<'a> {
    pub fn new(mapping: &'a dyn FieldMapping) -> Self {
        Self { mapping }
    }

    /// Apply one batch of change records, in ascending index order, against
    /// a clone of `baseline`.
    ///
    /// `old_changes` is the parsed previous-value side of the same changelog
    /// entry: for renames and removals the log line still names the item by
    /// its pre-change name, so lookups prefer the old record's name.
    /// `target_order` is the currently stored target-side snapshot, whose
    /// item order is re-applied at the end so locally made reorderings
    /// survive incremental updates.
    pub fn apply(
        &self,
        baseline: &Checklist,
        old_changes: &BTreeMap<u32, ItemChange>,
        new_changes: &BTreeMap<u32, ItemChange>,
        target_order: Option<&Checklist>,
    ) -> MergeOutcome {
        info!(
            records = new_changes.len(),
            items = baseline.len(),
            "applying checklist change batch"
        );

        let mut modified = baseline.clone();

        for (index, change) in new_changes {
            let old = old_changes.get(index);

            if change.was_added() {
                change.apply_to(modified.add_item(), self.mapping);
            } else if change.was_removed() {
                let name = old.and_then(ItemChange::name).or_else(|| change.name());
                if let Some(name) = name {
                    if modified.remove_item(name).is_none() {
                        debug!(index, name, "removal target not found");
                    }
                }
            } else if change.was_reordered() {
                modified.reorder_items();
            } else {
                // A plain modification. Items that no longer exist locally
                // must stay removed, so an unresolved lookup drops the record.
                let renamed_from = change
                    .was_renamed()
                    .then(|| old.and_then(ItemChange::name))
                    .flatten();
                let Some(name) = renamed_from.or_else(|| change.name()) else {
                    continue;
                };

                match modified.item_mut(name) {
                    Some(item) => {
                        if !change.is_header() && old.is_some_and(ItemChange::is_header) {
                            item.header = false;
                        }
                        change.apply_to(item, self.mapping);
                    }
                    None => debug!(index, name, "modification target not found, dropped"),
                }
            }
        }

        if let Some(order) = target_order {
            modified.apply_order(order);
        }

        MergeOutcome {
            before: wrap_checklist(baseline),
            after: wrap_checklist(&modified),
            checklist: modified,
        }
    }

    /// Cached entry point for one field's change batch.
    ///
    /// The baseline is the cached working snapshot for `field_id` when one
    /// exists, otherwise the snapshot stored in the target-side field value,
    /// otherwise empty. The merged snapshot is written back to the cache so
    /// consecutive batches for the same field chain: the previous outcome's
    /// `after` equals the next one's `before`.
    pub fn sync_field_change(
        &self,
        cache: &mut SnapshotCache,
        field_id: i64,
        stored_markup: Option<&str>,
        old_changes: &BTreeMap<u32, ItemChange>,
        new_changes: &BTreeMap<u32, ItemChange>,
    ) -> Option<MergeOutcome> {
        if new_changes.is_empty() {
            return None;
        }

        let stored = stored_markup.and_then(unwrap_checklist);
        let baseline = cache
            .get(field_id)
            .cloned()
            .or_else(|| stored.clone())
            .unwrap_or_default();

        let outcome = self.apply(&baseline, old_changes, new_changes, stored.as_ref());
        cache.put(field_id, outcome.checklist.clone());

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::parse_item_changes;
    use crate::checklist::ChecklistItem;
    use crate::mapping::ConfiguredMapping;

    fn names(checklist: &Checklist) -> Vec<&str> {
        checklist
            .items()
            .iter()
            .filter_map(|item| item.name.as_deref())
            .collect()
    }

    fn engine_apply(
        baseline: &Checklist,
        old_log: &str,
        new_log: &str,
        target_order: Option<&Checklist>,
    ) -> MergeOutcome {
        let mapping = ConfiguredMapping::default();
        let engine = MergeEngine::new(&mapping);
        engine.apply(
            baseline,
            &parse_item_changes(old_log),
            &parse_item_changes(new_log),
            target_order,
        )
    }

    #[test]
    fn test_added_item_carries_initial_fields() {
        let outcome = engine_apply(
            &Checklist::default(),
            "",
            "1) [Added, mandatory] (blocked) Build release {05/Feb/2021}(klaus)(High!)",
            None,
        );

        assert_eq!(outcome.checklist.len(), 1);
        let item = outcome.checklist.item("Build release").expect("added item");
        assert!(item.mandatory);
        assert!(!item.checked);
        assert_eq!(item.assignee_ids, Some(vec!["klaus".to_string()]));
        assert_eq!(item.status.as_ref().map(|s| s["name"].clone()), Some("Blocked".into()));
    }

    #[test]
    fn test_remove_after_add() {
        let added = engine_apply(&Checklist::default(), "", "1) [Added] Build release", None);
        assert!(added.checklist.item("Build release").is_some());

        let removed = engine_apply(
            &added.checklist,
            "1) Build release",
            "1) [Removed]",
            None,
        );
        assert!(removed.checklist.item("Build release").is_none());
        assert!(removed.checklist.is_empty());
    }

    #[test]
    fn test_remove_prefers_old_name_over_rename() {
        let baseline = engine_apply(&Checklist::default(), "", "1) [Added] Old name", None).checklist;

        let outcome = engine_apply(&baseline, "1) Old name", "1) [Removed] New name", None);
        assert!(outcome.checklist.is_empty());
    }

    #[test]
    fn test_rename_looks_up_old_name() {
        let baseline = engine_apply(&Checklist::default(), "", "1) [Added] Old name", None).checklist;

        let outcome = engine_apply(&baseline, "1) Old name", "1) [Modified] New name", None);
        assert_eq!(names(&outcome.checklist), vec!["New name"]);
    }

    #[test]
    fn test_modification_of_missing_item_dropped() {
        let baseline = engine_apply(&Checklist::default(), "", "1) [Added] Kept", None).checklist;

        let outcome = engine_apply(&baseline, "", "1) [Checked] Locally removed", None);
        assert_eq!(names(&outcome.checklist), vec!["Kept"]);
    }

    #[test]
    fn test_header_demotion() {
        let baseline =
            engine_apply(&Checklist::default(), "", "1) [Added] [H] Section", None).checklist;
        assert!(baseline.item("Section").is_some_and(|i| i.header));

        let outcome = engine_apply(&baseline, "1) [H] Section", "1) [Modified] Section", None);
        assert!(outcome.checklist.item("Section").is_some_and(|i| !i.header));
    }

    #[test]
    fn test_reorder_record_partitions_pinned_first() {
        let mut baseline = Checklist::default();
        baseline.add_item().name = Some("local".to_string());
        let pinned = baseline.add_item();
        pinned.name = Some("option".to_string());
        pinned.pinned = true;

        let outcome = engine_apply(&baseline, "", "Checklist items were reordered", None);
        assert_eq!(names(&outcome.checklist), vec!["option", "local"]);
    }

    #[test]
    fn test_target_order_preserved() {
        let mut baseline = Checklist::default();
        baseline.add_item().name = Some("a".to_string());
        baseline.add_item().name = Some("b".to_string());

        // The target side has b before a; a merge adding c keeps that order.
        let mut target = Checklist::default();
        target.add_item().name = Some("b".to_string());
        target.add_item().name = Some("a".to_string());

        let outcome = engine_apply(&baseline, "", "1) [Added] c", Some(&target));
        assert_eq!(names(&outcome.checklist), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_before_after_serialization() {
        let outcome = engine_apply(&Checklist::default(), "", "1) [Added] Task", None);

        assert_eq!(outcome.before, wrap_checklist(&Checklist::default()));
        assert_eq!(outcome.after, wrap_checklist(&outcome.checklist));
        assert_ne!(outcome.before, outcome.after);
    }

    #[test]
    fn test_sync_field_change_chains_through_cache() {
        let mapping = ConfiguredMapping::default();
        let engine = MergeEngine::new(&mapping);
        let mut cache = SnapshotCache::new();
        let empty = BTreeMap::new();

        let first = engine
            .sync_field_change(
                &mut cache,
                1000,
                None,
                &empty,
                &parse_item_changes("1) [Added] Build"),
            )
            .expect("first batch");

        let second = engine
            .sync_field_change(
                &mut cache,
                1000,
                None,
                &empty,
                &parse_item_changes("2) [Added] Deploy"),
            )
            .expect("second batch");

        assert_eq!(first.after, second.before);
        assert_eq!(names(&second.checklist), vec!["Build", "Deploy"]);
    }

    #[test]
    fn test_sync_field_change_empty_batch() {
        let mapping = ConfiguredMapping::default();
        let engine = MergeEngine::new(&mapping);
        let mut cache = SnapshotCache::new();
        let empty = BTreeMap::new();

        assert!(engine
            .sync_field_change(&mut cache, 1, None, &empty, &empty)
            .is_none());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn test_sync_field_change_baseline_from_stored_markup() {
        let mapping = ConfiguredMapping::default();
        let engine = MergeEngine::new(&mapping);
        let mut cache = SnapshotCache::new();

        let mut stored = Checklist::default();
        let item = stored.add_item();
        item.name = Some("Existing".to_string());
        item.pinned = true;
        let markup = wrap_checklist(&stored);

        let outcome = engine
            .sync_field_change(
                &mut cache,
                7,
                Some(&markup),
                &BTreeMap::new(),
                &parse_item_changes("1) [Checked] Existing"),
            )
            .expect("batch applied");

        assert!(outcome.checklist.item("Existing").is_some_and(|i| i.checked));
    }

    #[test]
    fn test_nameless_modification_ignored() {
        let baseline = engine_apply(&Checklist::default(), "", "1) [Added] Task", None).checklist;
        let outcome = engine_apply(&baseline, "", "2) [Checked]", None);
        assert_eq!(names(&outcome.checklist), vec!["Task"]);
        assert!(outcome.checklist.item("Task").is_some_and(|i| !i.checked));
    }

    #[test]
    fn test_add_item_defaults() {
        let item = ChecklistItem::default();
        assert!(!item.header && !item.mandatory && !item.checked && !item.pinned);
    }
}
