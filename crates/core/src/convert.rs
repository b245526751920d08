//! Import/export conversion between the Jira checklist representation and
//! the wiki-side snapshot.
//!
//! The two sides disagree on more than markup: Jira flags header rows as
//! `isHeader`, marks default options with `option` (older versions) or
//! `globalItemId` (newer versions), carries a read-only `rank`, and folds an
//! item's description into its name behind the [`DESC_SEP`] marker. Import
//! normalizes all of that into the typed snapshot model; export reverses it.

use serde_json::Value;
use tracing::debug;

use crate::checklist::{
    join_description, split_description, wrap_checklist, Checklist, ChecklistItem,
};
use crate::mapping::TextSanitizer;
use crate::markup::{checklist_to_wiki, wiki_to_checklist};

/// Convert a Jira checklist (a JSON array of item objects) into a snapshot.
///
/// Per item: `rank` is dropped (read-only on the Jira side), `isHeader`
/// becomes `header`, a present `globalItemId` or a true `option` becomes
/// `pinned`, and the name is sanitized, translated to wiki markup and split
/// into name and description. Non-object entries are discarded.
pub fn import_checklist(checklist: Value, sanitizer: &dyn TextSanitizer) -> Checklist {
    let Value::Array(entries) = checklist else {
        return Checklist::default();
    };

    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        let Value::Object(mut fields) = entry else {
            continue;
        };

        fields.remove("rank");

        let header = take_flag(&mut fields, "isHeader");
        let option = take_flag(&mut fields, "option");
        let global_id = fields.get("globalItemId").and_then(Value::as_i64);

        if header {
            fields.insert("header".to_string(), Value::Bool(true));
        }
        if option || global_id.is_some() {
            fields.insert("pinned".to_string(), Value::Bool(true));
        }

        if let Some(raw_name) = fields.get("name").and_then(Value::as_str) {
            let translated = checklist_to_wiki(&sanitizer.sanitize(raw_name));
            if !translated.trim().is_empty() {
                let (name, description) = split_description(&translated);
                set_or_remove(&mut fields, "name", name);
                set_or_remove(&mut fields, "description", description);
            }
        }

        if let Ok(item) = serde_json::from_value::<ChecklistItem>(Value::Object(fields)) {
            items.push(item);
        }
    }

    debug!(count = items.len(), "imported Jira checklist items");
    Checklist::new(items)
}

/// Convert a Jira checklist straight into the wrapped wiki field markup.
pub fn import_wrapped(checklist: Value, sanitizer: &dyn TextSanitizer) -> String {
    wrap_checklist(&import_checklist(checklist, sanitizer))
}

/// Convert a snapshot back into the Jira checklist representation.
///
/// Reverses [`import_checklist`]: `header` becomes `isHeader`, `pinned`
/// without a `globalItemId` becomes `option`, and name plus description are
/// re-joined and translated back to checklist markup.
pub fn export_checklist(checklist: &Checklist) -> Value {
    let mut entries = Vec::with_capacity(checklist.len());

    for item in checklist.items() {
        let Ok(Value::Object(mut fields)) = serde_json::to_value(item) else {
            continue;
        };

        if take_flag(&mut fields, "header") {
            fields.insert("isHeader".to_string(), Value::Bool(true));
        }
        if take_flag(&mut fields, "pinned") && item.global_item_id.is_none() {
            fields.insert("option".to_string(), Value::Bool(true));
        }

        fields.remove("description");
        let joined = join_description(item.name.as_deref(), item.description.as_deref());
        set_or_remove(
            &mut fields,
            "name",
            Some(wiki_to_checklist(&joined)).filter(|n| !n.is_empty()),
        );

        entries.push(Value::Object(fields));
    }

    debug!(count = entries.len(), "exported Jira checklist items");
    Value::Array(entries)
}

fn take_flag(fields: &mut serde_json::Map<String, Value>, key: &str) -> bool {
    fields
        .remove(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn set_or_remove(fields: &mut serde_json::Map<String, Value>, key: &str, value: Option<String>) {
    match value {
        Some(v) => {
            fields.insert(key.to_string(), Value::String(v));
        }
        None => {
            fields.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{unwrap_checklist, DESC_SEP};
    use crate::mapping::PassthroughSanitizer;
    use serde_json::json;

    #[test]
    fn test_import_translates_and_splits_name() {
        let jira = json!([{
            "id": 1,
            "rank": 3,
            "option": true,
            "mandatory": true,
            "name": format!("Do *something*{DESC_SEP}\nAn **Example** checklist item"),
        }]);

        let checklist = import_checklist(jira, &PassthroughSanitizer);
        assert_eq!(checklist.len(), 1);

        let item = &checklist.items()[0];
        assert_eq!(item.name.as_deref(), Some("Do ''something''"));
        assert_eq!(
            item.description.as_deref(),
            Some("An __Example__ checklist item")
        );
        assert!(item.pinned);
        assert!(!item.header);
        assert!(item.mandatory);
        assert!(!item.checked);
        assert!(item.extra.get("rank").is_none());
    }

    #[test]
    fn test_import_global_item_id_pins() {
        let jira = json!([{"name": "Default option", "globalItemId": 42}]);
        let checklist = import_checklist(jira, &PassthroughSanitizer);

        let item = &checklist.items()[0];
        assert!(item.pinned);
        assert_eq!(item.global_item_id, Some(42));
    }

    #[test]
    fn test_import_header_flag() {
        let jira = json!([{"name": "Section", "isHeader": true}]);
        let checklist = import_checklist(jira, &PassthroughSanitizer);
        assert!(checklist.items()[0].header);
    }

    #[test]
    fn test_import_skips_non_objects() {
        let jira = json!([{"name": "kept"}, "noise", 17]);
        let checklist = import_checklist(jira, &PassthroughSanitizer);
        assert_eq!(checklist.len(), 1);
    }

    #[test]
    fn test_export_joins_name_and_translates() {
        let mut checklist = Checklist::default();
        let item = checklist.add_item();
        item.name = Some("Say ''Hallo''".to_string());
        item.description = Some("Otherwise you are a total __Jerk__!".to_string());
        item.header = true;
        item.pinned = true;
        item.mandatory = true;

        let exported = export_checklist(&checklist);
        let entry = &exported[0];

        assert_eq!(
            entry["name"],
            format!("Say *Hallo*{DESC_SEP}\nOtherwise you are a total **Jerk**!")
        );
        assert_eq!(entry["option"], true);
        assert_eq!(entry["isHeader"], true);
        assert_eq!(entry["mandatory"], true);
        assert!(entry.get("header").is_none());
        assert!(entry.get("pinned").is_none());
        assert!(entry.get("description").is_none());
    }

    #[test]
    fn test_export_pinned_with_global_id_keeps_no_option() {
        let mut checklist = Checklist::default();
        let item = checklist.add_item();
        item.name = Some("Default".to_string());
        item.pinned = true;
        item.global_item_id = Some(7);

        let exported = export_checklist(&checklist);
        assert!(exported[0].get("option").is_none());
        assert_eq!(exported[0]["globalItemId"], 7);
    }

    #[test]
    fn test_import_export_round_trip() {
        let jira = json!([{
            "id": 7,
            "globalItemId": 7,
            "isHeader": true,
            "mandatory": true,
            "checked": true,
            "name": format!("Do *something*{DESC_SEP}\nAn **Example** checklist item"),
        }]);

        let markup = import_wrapped(jira, &PassthroughSanitizer);
        let snapshot = unwrap_checklist(&markup).expect("wrapped snapshot");
        let exported = export_checklist(&snapshot);

        let entry = &exported[0];
        assert_eq!(
            entry["name"],
            format!("Do *something*{DESC_SEP}\nAn **Example** checklist item")
        );
        assert_eq!(entry["globalItemId"], 7);
        assert_eq!(entry["isHeader"], true);
        assert_eq!(entry["mandatory"], true);
        assert_eq!(entry["checked"], true);
        assert!(entry.get("option").is_none());
    }
}
