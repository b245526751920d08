//! Error types for the checksync core library.
//!
//! The synchronization core itself is total by design: markup translation
//! never fails, changelog parse gaps degrade to absent fields, and merge
//! records without a resolvable target are dropped. Errors only exist at the
//! boundaries — configuration loading and snapshot file handling — each with
//! its own `thiserror` enum and a top-level [`CoreError`] unifying them.

use thiserror::Error;

/// Unified error type for the core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

/// Errors when moving snapshots across the serialization boundary.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The JSON payload could not be encoded or decoded.
    #[error("snapshot JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic I/O error reading or writing a snapshot file.
    #[error("snapshot I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
