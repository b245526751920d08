//! Parsing of Jira checklist changelog text into structured change records.
//!
//! The Jira side reports checklist edits as free text: one numbered block per
//! changed item (`3) [Modified] New name`), where a block may wrap onto
//! continuation lines (e.g. a renamed item followed by its description).
//! [`parse_item_changes`] splits such text into [`ItemChange`] records keyed
//! by change index, and [`ItemChange::apply_to`] replays one record onto a
//! checklist item.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::checklist::{ChecklistItem, DESC_SEP};
use crate::mapping::FieldMapping;
use crate::markup::checklist_to_wiki;

/// Index under which a standalone "items were reordered" log line is filed.
/// Outside the range Jira uses for per-item change numbering.
pub const REORDER_INDEX: u32 = 9999;

/// Due date formats seen in checklist history, tried in order.
const DUE_DATE_FORMATS: [&str; 4] = ["%d/%b/%y", "%d/%m/%y", "%d/%b/%Y", "%d/%m/%Y"];

/// Opens a new numbered change block: digits followed by `)`.
static BLOCK_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\)(.*)$").expect("block key pattern"));

/// Log phrase reported when the checklist was reordered as a whole.
static REORDER_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)items were reordered").expect("reorder pattern"));

// ---------------------------------------------------------------------------
// ItemChange
// ---------------------------------------------------------------------------

/// One parsed checklist item change from a changelog block.
///
/// `name` and `description` are already translated to wiki markup; `status`,
/// `priority` and `assignee_ids` keep their raw tokens for the field-mapping
/// collaborator to resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemChange {
    name: Option<String>,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    assignee_ids: Option<String>,
    due_date: Option<NaiveDate>,
    changed: BTreeSet<String>,
}

impl ItemChange {
    /// Parse one accumulated change block.
    ///
    /// The block text is consumed in a fixed strip order: a leading bracket
    /// group of change kinds, a `[H]` header marker, a leading `(status)`,
    /// then from the tail `(priority!)`, `(assignees)` and `{due date}`.
    /// Whatever remains is the item name, optionally split into name and
    /// description at the [`DESC_SEP`] marker.
    pub fn from_block(block: &str) -> Self {
        let mut change = Self::default();
        let mut rest = block;

        if rest.starts_with('[') {
            if let Some(close) = rest.find(']') {
                for token in rest[1..close].split(',') {
                    change.add_changed(token);
                }
                rest = rest[close + 1..].trim();
            }
        }

        // Newer checklist versions report the header flag as a second block.
        if let Some(stripped) = rest.strip_prefix("[H]") {
            rest = stripped.trim();
            change.add_changed("H");
        }

        if rest.starts_with('(') {
            if let Some(close) = rest.find(')') {
                change.status = trim_to_none(&rest[1..close]);
                rest = rest[close + 1..].trim();
            }
        }

        if rest.ends_with("!)") {
            if let Some(open) = rest.rfind('(') {
                change.priority = trim_to_none(&rest[open + 1..rest.len() - 2]);
                rest = rest[..open].trim();
            }
        }

        if rest.ends_with(')') {
            if let Some(open) = rest.rfind('(') {
                change.assignee_ids = trim_to_none(&rest[open + 1..rest.len() - 1]);
                rest = rest[..open].trim();
            }
        }

        if rest.ends_with('}') {
            if let Some(open) = rest.rfind('{') {
                change.due_date = trim_to_none(&rest[open + 1..rest.len() - 1])
                    .as_deref()
                    .and_then(decode_due_date);
                rest = rest[..open].trim();
            }
        }

        let name = checklist_to_wiki(rest);
        match name.find(DESC_SEP) {
            Some(sep) => {
                change.description = trim_to_none(&name[sep + DESC_SEP.len()..]);
                change.name = trim_to_none(&name[..sep]);
            }
            None => change.name = trim_to_none(&name),
        }

        change
    }

    /// Record one lower-cased change kind. Adding a new item implicitly also
    /// carries its initial status, priority, due date and assignees.
    fn add_changed(&mut self, kind: &str) {
        let kind = kind.trim();
        if kind.is_empty() {
            return;
        }

        self.changed.insert(kind.to_lowercase());

        if kind.eq_ignore_ascii_case("added") {
            self.changed.insert("status changed".to_string());
            self.changed.insert("priority changed".to_string());
            self.changed.insert("due date changed".to_string());
            self.changed.insert("assigned".to_string());
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    pub fn assignee_ids(&self) -> Option<&str> {
        self.assignee_ids.as_deref()
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Whether the given lower-cased change kind is present.
    pub fn has_changed(&self, kind: &str) -> bool {
        self.changed.contains(kind)
    }

    pub fn is_header(&self) -> bool {
        self.has_changed("h")
    }

    pub fn was_added(&self) -> bool {
        self.has_changed("added")
    }

    pub fn was_renamed(&self) -> bool {
        self.has_changed("modified")
    }

    pub fn was_removed(&self) -> bool {
        self.has_changed("removed")
    }

    pub fn was_reordered(&self) -> bool {
        self.has_changed("reordered")
    }

    /// Replay this change onto a checklist item.
    ///
    /// Status, priority and due date are only touched when their own
    /// "... changed" kind is present; an absent raw token then clears the
    /// field rather than leaving a stale value behind.
    pub fn apply_to(&self, item: &mut ChecklistItem, mapping: &dyn FieldMapping) {
        for kind in &self.changed {
            match kind.as_str() {
                "added" | "modified" => {
                    item.name = self.name.clone();
                    item.description = self.description.clone();
                }
                "h" => item.header = true,
                "checked" => item.checked = true,
                "unchecked" => item.checked = false,
                "mandatory" => item.mandatory = true,
                "optional" => item.mandatory = false,
                "assigned" => {
                    item.assignee_ids = Some(match self.assignee_ids.as_deref() {
                        Some(raw) => raw
                            .split([',', ' '])
                            .map(str::trim)
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .collect(),
                        None => Vec::new(),
                    });
                }
                "unassigned" => item.assignee_ids = None,
                "status changed" => {
                    item.status = self
                        .status
                        .as_deref()
                        .and_then(|raw| mapping.status_value(raw));
                }
                "priority changed" => {
                    item.priority = self
                        .priority
                        .as_deref()
                        .and_then(|raw| mapping.priority_value(raw));
                }
                "due date changed" => item.end_date = self.due_date,
                _ => {}
            }
        }
    }
}

impl std::fmt::Display for ItemChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        if !self.changed.is_empty() {
            write!(f, "[")?;
            for (idx, kind) in self.changed.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{kind}")?;
            }
            write!(f, "]")?;
            first = false;
        }

        if let Some(status) = &self.status {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "({status})")?;
            first = false;
        }

        if let Some(name) = &self.name {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{name}")?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Changelog parsing
// ---------------------------------------------------------------------------

/// Decode a checklist history due date, trying each known format in order.
/// Returns `None` when no format matches; an unparsable date is a gap, not
/// an error.
pub fn decode_due_date(encoded: &str) -> Option<NaiveDate> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return None;
    }

    DUE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(encoded, format).ok())
}

/// Parse a multi-line changelog value into change records keyed by change
/// index, in ascending index order.
///
/// A line whose trimmed form starts with `N)` opens block `N` and submits any
/// previously open block. Other non-blank lines are newline-joined into the
/// open block. A line containing "items were reordered" before any block was
/// opened files a standalone reorder record under [`REORDER_INDEX`]. Blank
/// input yields an empty map.
pub fn parse_item_changes(lines: &str) -> BTreeMap<u32, ItemChange> {
    let mut result = BTreeMap::new();
    if lines.trim().is_empty() {
        return result;
    }

    let mut key: Option<u32> = None;
    let mut val = String::new();

    for line in lines.split(['\n', '\r']).filter(|l| !l.is_empty()) {
        let mut cmd = trim_to_none(line);

        let opener = cmd
            .as_deref()
            .and_then(|c| BLOCK_KEY.captures(c))
            .map(|caps| (caps[1].to_string(), caps[2].to_string()));

        if let Some((digits, remainder)) = opener {
            match digits.parse::<u32>() {
                Ok(new_key) => {
                    // Submit the previous open block before starting the next.
                    if let (Some(k), false) = (key, val.is_empty()) {
                        result.insert(k, ItemChange::from_block(&val));
                        val.clear();
                    }

                    key = Some(new_key);
                    cmd = trim_to_none(&remainder);
                }
                Err(_) => {
                    warn!(line, "change index out of range, treating as continuation");
                }
            }
        }

        if key.is_some() {
            if !val.is_empty() {
                val.push('\n');
                if cmd.is_some() {
                    val.push_str(line);
                }
            } else if let Some(first) = cmd {
                val.push_str(&first);
            }
        } else if REORDER_PHRASE.is_match(line) {
            result.insert(REORDER_INDEX, ItemChange::from_block("[reordered]"));
        }
    }

    // Submit the last open block.
    if let (Some(k), false) = (key, val.is_empty()) {
        result.insert(k, ItemChange::from_block(&val));
    }

    debug!(count = result.len(), "parsed checklist item changes");
    result
}

fn trim_to_none(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
