//! checksync core library.
//!
//! This crate provides the foundational components for bidirectional
//! checklist field synchronization between a Jira "checklist" custom field
//! and a wiki-markup document field: markup dialect translation, changelog
//! parsing, the snapshot model, the incremental merge engine, the
//! field-mapping collaborator seams, the per-import snapshot cache, and
//! configuration.

pub mod cache;
pub mod changelog;
pub mod checklist;
pub mod config;
pub mod convert;
pub mod errors;
pub mod mapping;
pub mod markup;
pub mod merge;

// Re-exports for convenience.
pub use cache::SnapshotCache;
pub use changelog::{parse_item_changes, ItemChange};
pub use checklist::{unwrap_checklist, wrap_checklist, Checklist, ChecklistItem};
pub use config::AppConfig;
pub use mapping::{ConfiguredMapping, FieldMapping, TextSanitizer};
pub use merge::{MergeEngine, MergeOutcome};
