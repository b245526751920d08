//! The checklist snapshot model.
//!
//! A checklist is an ordered list of items, stored on the wiki side as a
//! pretty-printed JSON array wrapped in a fixed plugin envelope inside the
//! document field. [`Checklist`] is one snapshot of that list; the merge
//! engine clones a snapshot, mutates the clone and serializes it back out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::SnapshotError;

/// Wiki plugin envelope around the JSON payload.
pub const PLUGIN_HEADER: &str = "[{Checklist\r\n\r\n";
pub const PLUGIN_FOOTER: &str = "\r\n}]";

/// Marker separating an item name from its description when both travel in
/// one text field.
pub const DESC_SEP: &str = "\n>>";

// ---------------------------------------------------------------------------
// ChecklistItem
// ---------------------------------------------------------------------------

/// One checklist item.
///
/// Boolean attributes are absent-means-false on the wire. `status` and
/// `priority` are loosely typed: the field-mapping collaborator decides
/// whether they are plain names or `{name, style}` / `{id, name}` objects.
/// Fields this model does not know about are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistItem {
    /// Opaque external identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Section heading rather than an actionable row.
    #[serde(skip_serializing_if = "is_false")]
    pub header: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub mandatory: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub checked: bool,

    /// Pinned items sort first and are exempt from reordering and removal
    /// by reorder logic.
    #[serde(skip_serializing_if = "is_false")]
    pub pinned: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,

    /// Stable item identifier used by newer Jira checklist versions for
    /// pinned default options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_item_id: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ChecklistItem {
    /// Whether this item's name equals the given one. Identity across
    /// snapshots is by exact name match.
    fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

/// An ordered snapshot of checklist items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

impl Checklist {
    pub fn new(items: Vec<ChecklistItem>) -> Self {
        Self { items }
    }

    /// Build a snapshot from a JSON value. Anything but an array yields an
    /// empty snapshot; array entries that are not decodable item objects are
    /// pruned here, so a snapshot never holds malformed entries.
    pub fn from_value(value: Value) -> Self {
        let Value::Array(entries) = value else {
            return Self::default();
        };

        let items = entries
            .into_iter()
            .filter(|entry| entry.is_object())
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        Self { items }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.items).unwrap_or_else(|_| Value::Array(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// Append a new empty item and return it for field population.
    pub fn add_item(&mut self) -> &mut ChecklistItem {
        let idx = self.items.len();
        self.items.push(ChecklistItem::default());
        &mut self.items[idx]
    }

    /// First item with the given name, if any.
    pub fn item(&self, name: &str) -> Option<&ChecklistItem> {
        self.items.iter().find(|item| item.is_named(name))
    }

    pub fn item_mut(&mut self, name: &str) -> Option<&mut ChecklistItem> {
        self.items.iter_mut().find(|item| item.is_named(name))
    }

    /// Remove and return the first item with the given name. Returns `None`
    /// when no item matches, including on an empty snapshot.
    pub fn remove_item(&mut self, name: &str) -> Option<ChecklistItem> {
        let idx = self.items.iter().position(|item| item.is_named(name))?;
        Some(self.items.remove(idx))
    }

    /// Re-assert the pinned-first invariant: pinned items move to the front,
    /// both partitions keeping their relative order.
    ///
    /// There is deliberately no further reordering — a "reordered" changelog
    /// entry carries no target order to reconstruct, so this is all the
    /// engine can safely do.
    pub fn reorder_items(&mut self) {
        if self.items.len() <= 1 {
            return;
        }

        let (mut pinned, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| item.pinned);

        pinned.extend(rest);
        self.items = pinned;
    }

    /// Rebuild this snapshot in the item order of `reference`: for each
    /// reference name in turn, the matching own item (if any) is re-appended;
    /// items without a reference position keep their current relative order
    /// at the end. No-op when the reference is empty, equal to this snapshot,
    /// or this snapshot has at most one item.
    pub fn apply_order(&mut self, reference: &Checklist) {
        if reference.is_empty() || self.items.len() <= 1 || self.items == reference.items {
            return;
        }

        let mut reordered = Vec::with_capacity(self.items.len());
        for wanted in &reference.items {
            let Some(name) = wanted.name.as_deref() else {
                continue;
            };
            if let Some(found) = self.remove_item(name) {
                reordered.push(found);
            }
        }

        reordered.append(&mut self.items);
        self.items = reordered;
    }
}

// ---------------------------------------------------------------------------
// Wiki field serialization
// ---------------------------------------------------------------------------

/// Wrap a snapshot into the wiki plugin markup stored in the document field.
pub fn wrap_checklist(checklist: &Checklist) -> String {
    let mut markup = String::with_capacity(1024);
    markup.push_str(PLUGIN_HEADER);

    match serde_json::to_string_pretty(&checklist.items) {
        Ok(json) => markup.push_str(&json),
        Err(error) => warn!(%error, "checklist serialization failed"),
    }

    markup.push_str(PLUGIN_FOOTER);
    markup
}

/// Unwrap the snapshot stored in wiki plugin markup. A missing envelope or
/// an unparsable payload means "no checklist", not an error.
pub fn unwrap_checklist(markup: &str) -> Option<Checklist> {
    let start = markup.find(PLUGIN_HEADER)? + PLUGIN_HEADER.len();
    let end = markup[start..].find(PLUGIN_FOOTER)? + start;

    let payload = markup[start..end].trim();
    let value: Value = serde_json::from_str(payload).ok()?;
    Some(Checklist::from_value(value))
}

/// Read and unwrap the snapshot stored in a wiki field file.
pub fn read_field_file(path: &std::path::Path) -> Result<Option<Checklist>, SnapshotError> {
    let markup = std::fs::read_to_string(path)?;
    Ok(unwrap_checklist(&markup))
}

/// Serialize a snapshot into a wrapped wiki field file.
pub fn write_field_file(
    path: &std::path::Path,
    checklist: &Checklist,
) -> Result<(), SnapshotError> {
    let mut markup = String::with_capacity(1024);
    markup.push_str(PLUGIN_HEADER);
    markup.push_str(&serde_json::to_string_pretty(&checklist.items)?);
    markup.push_str(PLUGIN_FOOTER);

    std::fs::write(path, markup)?;
    Ok(())
}

/// Split a text field into name and description at the [`DESC_SEP`] marker.
/// Without the marker the whole text is the name; blank parts become absent.
pub fn split_description(text: &str) -> (Option<String>, Option<String>) {
    match text.find(DESC_SEP) {
        Some(sep) => (
            trim_to_none(&text[..sep]),
            trim_to_none(&text[sep + DESC_SEP.len()..]),
        ),
        None => (trim_to_none(text), None),
    }
}

/// Join a name and an optional description back into one text field.
pub fn join_description(name: Option<&str>, description: Option<&str>) -> String {
    match description {
        Some(desc) => format!("{}{DESC_SEP}\n{desc}", name.unwrap_or_default()),
        None => name.unwrap_or_default().to_string(),
    }
}

fn trim_to_none(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
