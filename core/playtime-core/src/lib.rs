//! # playtime-core
//!
//! Core library for Playtime History: keeps a durable, append-only record of
//! when games were played, built from sources that only ever report
//! cumulative totals.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Only source fetches leave the calling
//!   thread, and those are bounded by a timeout.
//! - **Explicit time**: Every entry point takes `now`; nothing reads the clock.
//! - **All-or-nothing runs**: A reconciliation error leaves the stored history
//!   untouched.
//! - **Questions through a capability**: The engine asks via [`Prompter`] and
//!   never talks to a terminal itself.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use playtime_core::{fetch_with_timeout, FixedPrompter, HistoryFile, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let mut history = HistoryFile::load(&storage.history_file(), now)?;
//! let snapshot = fetch_with_timeout(source, history.id_tracker(), timeout)?;
//! history.set_id_tracker(snapshot.ids);
//! history.apply_snapshot(snapshot.games, &snapshot.source, &mut FixedPrompter::no(), now)?;
//! history.save(&storage.history_file(), now)?;
//! ```

// Public modules
pub mod allocator;
pub mod config;
pub mod error;
pub mod game;
pub mod history;
pub mod ids;
pub mod import;
pub mod prompt;
pub mod properties;
pub mod reconcile;
pub mod sources;
pub mod storage;
pub mod timeline;

// Re-export commonly used items at crate root
pub use allocator::{allocate, allocate_game, Allocation, PlaytimeReport};
pub use config::{load_config, MultiMcConfig, SteamConfig, TrackerConfig};
pub use error::{ConfigError, HistoryError, ImportError, ReconcileError, SourceError};
pub use game::{map_from_games, Choice, Game, GameMap, DEFAULT_SOURCE};
pub use history::{HistoryFile, CURRENT_VERSION};
pub use ids::{GameId, IdTracker};
pub use import::{import_gauge_csv, GaugeRow, ImportReport};
pub use prompt::{FixedPrompter, Prompter, ScriptedPrompter};
pub use properties::{reconcile_properties, FieldPolicy, GameField};
pub use reconcile::{initialize_games, reconcile_all, ReconcileContext};
pub use sources::{fetch_with_timeout, DataSource, MultiMcSource, Snapshot, SteamSource};
pub use storage::StorageConfig;
pub use timeline::{TimePoint, Timeline};
