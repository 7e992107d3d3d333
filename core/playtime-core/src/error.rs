//! Error types for playtime-core operations.
//!
//! Ambiguous merges are never errors: they are settled through the
//! [`Prompter`](crate::prompt::Prompter). The types here cover the cases where a
//! run has to stop (corrupted history) or a source has nothing to offer.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Reconciliation Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Fatal invariant violations found while reconciling a snapshot.
///
/// Any of these means the persisted document is corrupted. The caller must
/// abandon the run and must not save the in-memory state.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Play history of game {appid} is not in chronological order")]
    UnorderedHistory { appid: i64 },
}

// ═══════════════════════════════════════════════════════════════════════════════
// History Document Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors reading or writing the persisted history document.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported history file version {found} (newest known is {supported})")]
    UnsupportedVersion { found: f64, supported: f64 },

    #[error("History file is corrupted: {0}")]
    CorruptDocument(String),

    #[error("No game with id {0} in the play history")]
    GameNotFound(i64),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Data Source Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Snapshot fetch failures. Recoverable: the run for that source is skipped.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{source_name} did not respond within {secs} seconds")]
    Timeout { source_name: String, secs: u64 },

    #[error("{source_name} worker stopped before returning any data")]
    Disconnected { source_name: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Could not parse {what}: {details}")]
    Parse { what: String, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No MultiMC instance.cfg file could be found inside \"{}\"", path.display())]
    NoInstances { path: PathBuf },

    #[error("{0} is not configured")]
    NotConfigured(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Import / Config Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors importing a GaugePowered CSV export.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("There are no stored games to import into")]
    NoGames,
}

/// Errors loading `config.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {}: {details}", path.display())]
    Malformed { path: PathBuf, details: String },
}

// Conversion for string error compatibility
impl From<ReconcileError> for String {
    fn from(err: ReconcileError) -> String {
        err.to_string()
    }
}

impl From<HistoryError> for String {
    fn from(err: HistoryError) -> String {
        err.to_string()
    }
}

impl From<SourceError> for String {
    fn from(err: SourceError) -> String {
        err.to_string()
    }
}

impl From<ImportError> for String {
    fn from(err: ImportError) -> String {
        err.to_string()
    }
}

impl From<ConfigError> for String {
    fn from(err: ConfigError) -> String {
        err.to_string()
    }
}
