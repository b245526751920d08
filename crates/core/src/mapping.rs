//! Collaborator seams consumed by the sync core.
//!
//! The core never validates domain values itself: raw status / priority
//! tokens from the changelog are handed to a [`FieldMapping`] and whatever
//! comes back is stored verbatim. Likewise all inbound text runs through a
//! [`TextSanitizer`] before parsing, so storage-layer character restrictions
//! stay out of the parsing code.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::config::MappingConfig;

// ---------------------------------------------------------------------------
// Text sanitization
// ---------------------------------------------------------------------------

/// Hook applied to changelog text and item names before parsing.
pub trait TextSanitizer {
    fn sanitize<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Default hook: no transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSanitizer;

impl TextSanitizer for PassthroughSanitizer {
    fn sanitize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Replaces characters outside the Basic Multilingual Plane with U+FFFD.
/// Needed when the wiki-side storage cannot hold 4-byte sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct BmpSanitizer;

impl TextSanitizer for BmpSanitizer {
    fn sanitize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if text.chars().all(|c| (c as u32) <= 0xFFFF) {
            return Cow::Borrowed(text);
        }

        Cow::Owned(
            text.chars()
                .map(|c| if (c as u32) > 0xFFFF { '\u{FFFD}' } else { c })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Status / priority mapping
// ---------------------------------------------------------------------------

/// Resolves raw changelog tokens into the domain values stored on checklist
/// items. Implementations are trusted; the core does not validate results.
pub trait FieldMapping {
    /// Domain value for a raw status token, or `None` to clear the field.
    fn status_value(&self, raw: &str) -> Option<Value>;

    /// Domain value for a raw priority token, or `None` to clear the field.
    fn priority_value(&self, raw: &str) -> Option<Value>;
}

/// Built-in status styles: style key -> display name.
pub const STATUS_NAMES: [(&str, &str); 3] = [
    ("blocked", "Blocked"),
    ("inProgress", "In Progress"),
    ("notApplicable", "N/A"),
];

/// Built-in priority ladder; the index within the ladder is the priority id.
pub const PRIORITIES: [&str; 6] = ["None", "Highest", "High", "Normal", "Low", "Lowest"];

/// Table-driven [`FieldMapping`], configurable via [`MappingConfig`] and
/// defaulting to the built-in tables.
#[derive(Debug, Clone)]
pub struct ConfiguredMapping {
    /// Status style key -> display name.
    statuses: BTreeMap<String, String>,
    /// Priority names, ordered; index 0 means "no priority".
    priorities: Vec<String>,
}

impl Default for ConfiguredMapping {
    fn default() -> Self {
        Self {
            statuses: STATUS_NAMES
                .iter()
                .map(|(style, name)| (style.to_string(), name.to_string()))
                .collect(),
            priorities: PRIORITIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ConfiguredMapping {
    pub fn from_config(config: &MappingConfig) -> Self {
        let defaults = Self::default();

        Self {
            statuses: if config.status.is_empty() {
                defaults.statuses
            } else {
                config.status.clone()
            },
            priorities: if config.priorities.is_empty() {
                defaults.priorities
            } else {
                config.priorities.clone()
            },
        }
    }
}

impl FieldMapping for ConfiguredMapping {
    /// A token matching a known style key or display name (either case)
    /// becomes a `{name, style}` object; anything else is kept as a plain
    /// name. Blank tokens clear the field.
    fn status_value(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        for (style, name) in &self.statuses {
            if raw.eq_ignore_ascii_case(style) || raw.eq_ignore_ascii_case(name) {
                return Some(json!({ "name": name, "style": style }));
            }
        }

        Some(Value::String(raw.to_string()))
    }

    /// A known priority name resolves to `{id, name}` keeping the raw
    /// casing. Index 0 of the ladder means "no priority"; numeric and
    /// unknown tokens clear the field.
    fn priority_value(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let id = self
            .priorities
            .iter()
            .position(|name| name.eq_ignore_ascii_case(raw))?;
        if id == 0 {
            return None;
        }

        Some(json!({ "id": id, "name": raw }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_sanitizer() {
        let hook = PassthroughSanitizer;
        assert_eq!(hook.sanitize("any 😀 text"), "any 😀 text");
    }

    #[test]
    fn test_bmp_sanitizer_replaces_supplementary_chars() {
        let hook = BmpSanitizer;
        assert_eq!(hook.sanitize("plain text"), "plain text");
        assert!(matches!(hook.sanitize("plain text"), Cow::Borrowed(_)));
        assert_eq!(hook.sanitize("ok 😀 done"), "ok \u{FFFD} done");
    }

    #[test]
    fn test_status_known_style_and_name() {
        let mapping = ConfiguredMapping::default();

        let blocked = mapping.status_value("blocked").expect("known style");
        assert_eq!(blocked["name"], "Blocked");
        assert_eq!(blocked["style"], "blocked");

        let in_progress = mapping.status_value("In Progress").expect("known name");
        assert_eq!(in_progress["style"], "inProgress");
    }

    #[test]
    fn test_status_unknown_kept_as_name() {
        let mapping = ConfiguredMapping::default();
        assert_eq!(
            mapping.status_value("Undefined"),
            Some(Value::String("Undefined".to_string()))
        );
        assert_eq!(mapping.status_value("  "), None);
    }

    #[test]
    fn test_priority_known_name_keeps_casing() {
        let mapping = ConfiguredMapping::default();

        let low = mapping.priority_value("LOW").expect("known priority");
        assert_eq!(low["id"], 4);
        assert_eq!(low["name"], "LOW");
    }

    #[test]
    fn test_priority_rejects_none_numeric_and_unknown() {
        let mapping = ConfiguredMapping::default();
        assert_eq!(mapping.priority_value("None"), None);
        assert_eq!(mapping.priority_value("3"), None);
        assert_eq!(mapping.priority_value("Urgent-ish"), None);
        assert_eq!(mapping.priority_value(" "), None);
    }
}
