//! The persisted play history document.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 0.3,
//!   "lastRun": "2024-06-30T18:00:00Z",
//!   "idTracker": [{ "strid": "Minecraft", "numid": -1 }],
//!   "games": [ { "appid": 220, "name": "Half-Life 2", "playtimeHistory": [...] } ]
//! }
//! ```
//!
//! `totalPlaytime` is not written; it is rebuilt from the history on load.
//! Files without a version use the original snake_case keys and are migrated.
//!
//! A document that cannot be parsed is an error, never an empty history:
//! saving over it would destroy the user's data.
//!
//! # Atomic Writes
//!
//! Uses temp file + rename so a crash mid-write leaves the old file intact.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{HistoryError, ReconcileError};
use crate::game::{map_from_games, Game, GameMap};
use crate::ids::IdTracker;
use crate::prompt::Prompter;
use crate::reconcile::{initialize_games, reconcile_all, ReconcileContext};

/// Newest document version this build reads and the one it writes.
pub const CURRENT_VERSION: f64 = 0.3;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDocument {
    #[serde(default)]
    version: Option<f64>,
    #[serde(default)]
    last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    id_tracker: IdTracker,
    #[serde(default)]
    games: Vec<Game>,
}

/// In-memory play history: the reconciled games plus bookkeeping.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    last_run: DateTime<Utc>,
    id_tracker: IdTracker,
    games: GameMap,
}

impl HistoryFile {
    /// A history with nothing recorded yet.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            last_run: ReconcileContext::first_run(now).last_run,
            id_tracker: IdTracker::new(),
            games: GameMap::new(),
        }
    }

    /// Loads the history at `path`, or an empty one if the file does not exist.
    pub fn load(path: &Path, now: DateTime<Utc>) -> Result<Self, HistoryError> {
        if !path.exists() {
            info!(path = %path.display(), "No play history yet");
            return Ok(Self::empty(now));
        }

        let content = fs_err::read_to_string(path).map_err(|source| HistoryError::Io {
            context: format!("reading {}", path.display()),
            source,
        })?;

        if content.trim().is_empty() {
            warn!(path = %path.display(), "Empty history file, starting fresh");
            return Ok(Self::empty(now));
        }

        Self::parse(&content)
    }

    /// Parses a history document, migrating older versions.
    pub fn parse(content: &str) -> Result<Self, HistoryError> {
        let mut raw: Value = serde_json::from_str(content).map_err(|source| HistoryError::Json {
            context: "parsing history file".to_string(),
            source,
        })?;

        migrate(&mut raw)?;
        if let Some(games) = raw.get_mut("games").and_then(Value::as_array_mut) {
            for game in games.iter_mut() {
                round_fractional_minutes(game);
                fill_missing_total(game);
            }
        }

        let document: HistoryDocument =
            serde_json::from_value(raw).map_err(|source| HistoryError::Json {
                context: "reading games".to_string(),
                source,
            })?;

        let last_run = document
            .last_run
            .or_else(|| {
                document
                    .games
                    .first()
                    .and_then(|game| game.playtime_history.last())
                    .map(|point| point.date)
            })
            .unwrap_or_default();

        Ok(Self {
            last_run,
            id_tracker: document.id_tracker,
            games: map_from_games(document.games),
        })
    }

    /// Serializes the history as it should appear on disk at `now`.
    pub fn to_json(&self, now: DateTime<Utc>) -> Result<String, HistoryError> {
        let games = self
            .games
            .values()
            .cloned()
            .map(|mut game| {
                game.prepare_for_write();
                game
            })
            .collect();

        let document = HistoryDocument {
            version: Some(CURRENT_VERSION),
            last_run: Some(now),
            id_tracker: self.id_tracker.clone(),
            games,
        };

        serde_json::to_string_pretty(&document).map_err(|source| HistoryError::Json {
            context: "serializing history".to_string(),
            source,
        })
    }

    /// Atomically writes the history to `path`, stamping `lastRun` with `now`.
    pub fn save(&self, path: &Path, now: DateTime<Utc>) -> Result<(), HistoryError> {
        let content = self.to_json(now)?;

        let parent_dir = path
            .parent()
            .ok_or_else(|| HistoryError::CorruptDocument("history path has no parent".into()))?;
        fs_err::create_dir_all(parent_dir).map_err(|source| HistoryError::Io {
            context: format!("creating {}", parent_dir.display()),
            source,
        })?;

        let io_err = |context: &str, source: std::io::Error| HistoryError::Io {
            context: context.to_string(),
            source,
        };
        let mut temp_file =
            NamedTempFile::new_in(parent_dir).map_err(|e| io_err("creating temp file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| io_err("writing temp history file", e))?;
        temp_file
            .flush()
            .map_err(|e| io_err("flushing temp history file", e))?;
        temp_file
            .persist(path)
            .map_err(|e| io_err("replacing history file", e.error))?;

        info!(path = %path.display(), games = self.games.len(), "Play history saved");
        Ok(())
    }

    pub fn last_run(&self) -> DateTime<Utc> {
        self.last_run
    }

    pub fn games(&self) -> &GameMap {
        &self.games
    }

    pub fn games_mut(&mut self) -> &mut GameMap {
        &mut self.games
    }

    pub fn id_tracker(&self) -> &IdTracker {
        &self.id_tracker
    }

    pub fn set_id_tracker(&mut self, id_tracker: IdTracker) {
        self.id_tracker = id_tracker;
    }

    /// Whether any source has been recorded yet.
    pub fn is_initialized(&self) -> bool {
        !self.games.is_empty()
    }

    /// Reconciles one source's snapshot into the history.
    ///
    /// On error the stored games are left exactly as they were. `lastRun` is
    /// not advanced here so every source of one session is compared against
    /// the same previous check; it moves forward when the file is saved.
    pub fn apply_snapshot(
        &mut self,
        snapshot: GameMap,
        source: &str,
        prompter: &mut dyn Prompter,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let reconciled = if self.is_initialized() {
            let ctx = ReconcileContext::new(self.last_run, now);
            reconcile_all(snapshot, self.games.clone(), source, &ctx, prompter)?
        } else {
            initialize_games(snapshot, source, now, prompter)?
        };
        self.games = reconciled;
        Ok(())
    }

    /// Human-readable listing of one game's history.
    pub fn game_history(&self, appid: i64) -> Result<String, HistoryError> {
        let game = self
            .games
            .get(&appid)
            .ok_or(HistoryError::GameNotFound(appid))?;

        let mut listing = String::from("Play History: \n");
        for point in game.playtime_history.points() {
            listing.push_str(&format!(
                "{}: {}\n",
                point.date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                point.playtime
            ));
        }
        Ok(listing)
    }

    /// Sets what was spent on a game. Returns whether anything changed.
    pub fn set_spent(&mut self, appid: i64, spent: Option<f64>) -> Result<bool, HistoryError> {
        let game = self
            .games
            .get_mut(&appid)
            .ok_or(HistoryError::GameNotFound(appid))?;
        if game.spent == spent {
            return Ok(false);
        }
        game.spent = spent;
        Ok(true)
    }
}

/// Brings an older document up to [`CURRENT_VERSION`] in place.
fn migrate(raw: &mut Value) -> Result<(), HistoryError> {
    let Some(document) = raw.as_object_mut() else {
        return Err(HistoryError::CorruptDocument(
            "top level is not an object".to_string(),
        ));
    };

    let version = document.get("version").and_then(Value::as_f64);
    match version {
        Some(found) if found > CURRENT_VERSION => {
            return Err(HistoryError::UnsupportedVersion {
                found,
                supported: CURRENT_VERSION,
            });
        }
        Some(_) => {}
        None => {
            info!("Migrating history file from version 0.1");
            if let Some(games) = document.get_mut("games").and_then(Value::as_array_mut) {
                for game in games.iter_mut().filter_map(Value::as_object_mut) {
                    for (old_key, new_key) in [
                        ("playtime_total", "totalPlaytime"),
                        ("playtime_history", "playtimeHistory"),
                        ("img_icon_url", "iconURL"),
                        ("img_logo_url", "logoURL"),
                    ] {
                        if let Some(value) = game.remove(old_key) {
                            game.insert(new_key.to_string(), value);
                        }
                    }
                }
            }
        }
    }

    // Nothing changed between 0.2 and 0.3.
    document.insert("version".to_string(), Value::from(CURRENT_VERSION));
    Ok(())
}

/// Rounds fractional minutes (older MultiMC data) to whole minutes.
///
/// A fractional `totalPlaytime` is dropped so it gets rebuilt from the
/// rounded points and still matches their sum.
fn round_fractional_minutes(game: &mut Value) {
    let Some(object) = game.as_object_mut() else {
        return;
    };

    if let Some(children) = object.get_mut("children").and_then(Value::as_array_mut) {
        children.iter_mut().for_each(round_fractional_minutes);
    }

    if let Some(points) = object.get_mut("playtimeHistory").and_then(Value::as_array_mut) {
        for point in points.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(minutes) = point.get("playtime").and_then(fractional) {
                point.insert("playtime".to_string(), Value::from(minutes.round() as i64));
            }
        }
    }

    if object.get("totalPlaytime").and_then(fractional).is_some() {
        object.remove("totalPlaytime");
    }
}

fn fractional(value: &Value) -> Option<f64> {
    if value.is_i64() || value.is_u64() {
        return None;
    }
    value.as_f64()
}

/// Rebuilds `totalPlaytime` from the history of a game and its children.
fn fill_missing_total(game: &mut Value) {
    let Some(object) = game.as_object_mut() else {
        return;
    };

    if let Some(children) = object.get_mut("children").and_then(Value::as_array_mut) {
        children.iter_mut().for_each(fill_missing_total);
    }

    if object.contains_key("totalPlaytime") {
        return;
    }
    let total: i64 = object
        .get("playtimeHistory")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(|point| point.get("playtime").and_then(Value::as_i64))
                .sum()
        })
        .unwrap_or(0);
    object.insert("totalPlaytime".to_string(), Value::from(total));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()
    }

    #[test]
    fn missing_file_is_an_empty_history() {
        let temp = tempdir().unwrap();
        let history = HistoryFile::load(&temp.path().join("history.json"), now()).unwrap();

        assert!(!history.is_initialized());
        assert_eq!(history.last_run(), now() - Duration::days(100));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("history.json");
        fs_err::write(&path, "{ not json").unwrap();

        assert!(matches!(
            HistoryFile::load(&path, now()),
            Err(HistoryError::Json { .. })
        ));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let result = HistoryFile::parse(r#"{"version": 0.9, "games": []}"#);
        assert!(matches!(result, Err(HistoryError::UnsupportedVersion { .. })));
    }

    #[test]
    fn version_one_documents_are_migrated() {
        let history = HistoryFile::parse(
            r#"{
                "games": [{
                    "appid": 220,
                    "name": "Half-Life 2",
                    "playtime_total": 321,
                    "playtime_history": [{"date": "2017-08-03T01:22:25.000Z", "playtime": 321}],
                    "img_icon_url": "icon",
                    "img_logo_url": "logo"
                }]
            }"#,
        )
        .unwrap();

        let game = &history.games()[&220];
        assert_eq!(game.total_playtime, 321);
        assert_eq!(game.icon_url.as_deref(), Some("icon"));
        assert_eq!(game.logo_url, "logo");
        assert_eq!(
            history.last_run(),
            Utc.with_ymd_and_hms(2017, 8, 3, 1, 22, 25).unwrap()
        );
    }

    #[test]
    fn missing_totals_are_rebuilt_from_history() {
        let history = HistoryFile::parse(
            r#"{
                "version": 0.3,
                "lastRun": "2024-06-01T00:00:00Z",
                "games": [{
                    "appid": -1,
                    "name": "Minecraft",
                    "logoURL": "",
                    "source": "Minecraft",
                    "playtimeHistory": [
                        {"date": "2024-05-01T00:00:00Z", "playtime": 40},
                        {"date": "2024-05-02T00:00:00Z", "playtime": 20},
                        {"date": "2024-05-03T00:00:00Z", "playtime": 0}
                    ],
                    "children": [{
                        "appid": -2,
                        "name": "Vanilla",
                        "playtimeHistory": [{"date": "2024-05-01T00:00:00Z", "playtime": 60}]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let game = &history.games()[&-1];
        assert_eq!(game.total_playtime, 60);
        assert_eq!(game.children.as_ref().unwrap()[0].total_playtime, 60);
    }

    #[test]
    fn fractional_minutes_are_rounded_on_load() {
        let history = HistoryFile::parse(
            r#"{
                "version": 0.3,
                "lastRun": "2024-06-01T00:00:00Z",
                "games": [{
                    "appid": -1,
                    "name": "Minecraft",
                    "source": "Minecraft",
                    "totalPlaytime": 120.7,
                    "playtimeHistory": [
                        {"date": "2024-05-01T00:00:00Z", "playtime": 90.5},
                        {"date": "2024-05-02T00:00:00Z", "playtime": 30.2},
                        {"date": "2024-05-03T00:00:00Z", "playtime": 0}
                    ],
                    "children": [{
                        "appid": -2,
                        "name": "Vanilla",
                        "totalPlaytime": 90.5,
                        "playtimeHistory": [{"date": "2024-05-01T00:00:00Z", "playtime": 90.5}]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let game = &history.games()[&-1];
        let minutes: Vec<_> = game.playtime_history.points().iter().map(|p| p.playtime).collect();
        assert_eq!(minutes, [91, 30, 0]);
        assert_eq!(game.total_playtime, 121);
        let child = &game.children.as_ref().unwrap()[0];
        assert_eq!(child.total_playtime, 91);
        assert_eq!(child.playtime_history.total(), 91);
    }

    #[test]
    fn games_without_history_make_the_document_corrupt() {
        let result = HistoryFile::parse(r#"{"version": 0.3, "games": [{"appid": 1, "name": "x"}]}"#);
        assert!(matches!(result, Err(HistoryError::Json { .. })));
    }

    #[test]
    fn save_strips_transient_fields_and_stamps_last_run() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("history.json");
        let mut history = HistoryFile::empty(now());
        let mut game = Game::new(220, "Half-Life 2", 120);
        game.playtime_2weeks = Some(30);
        game.playtime_history.add_point(now() - Duration::days(1), 120);
        history.games_mut().insert(220, game);

        let saved_at = now() + Duration::minutes(5);
        history.save(&path, saved_at).unwrap();

        let raw: Value = serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 0.3);
        assert!(raw["games"][0].get("playtime2Weeks").is_none());
        assert!(raw["games"][0].get("totalPlaytime").is_none());

        let reloaded = HistoryFile::load(&path, now()).unwrap();
        assert_eq!(reloaded.last_run(), saved_at);
        assert_eq!(reloaded.games()[&220].total_playtime, 120);
    }

    #[test]
    fn first_snapshot_initializes_and_later_ones_reconcile() {
        let mut history = HistoryFile::empty(now());
        let mut prompter = ScriptedPrompter::default();

        history
            .apply_snapshot(
                map_from_games([Game::new(220, "Half-Life 2", 300)]),
                "Steam",
                &mut prompter,
                now(),
            )
            .unwrap();
        assert!(history.is_initialized());
        assert_eq!(history.games()[&220].playtime_history.len(), 3);

        let later = now() + Duration::days(1);
        history
            .apply_snapshot(
                map_from_games([Game::new(220, "Half-Life 2", 300)]),
                "Steam",
                &mut prompter,
                later,
            )
            .unwrap();
        let history_log = &history.games()[&220].playtime_history;
        assert_eq!(history_log.len(), 3);
        assert_eq!(history_log.last().unwrap().date, later);
    }

    #[test]
    fn failed_reconciliation_leaves_games_untouched() {
        let mut history = HistoryFile::parse(
            r#"{
                "version": 0.3,
                "lastRun": "2024-06-01T00:00:00Z",
                "games": [{
                    "appid": 1,
                    "name": "Broken",
                    "playtimeHistory": [
                        {"date": "2024-05-03T00:00:00Z", "playtime": 10},
                        {"date": "2024-05-01T00:00:00Z", "playtime": 0}
                    ]
                }]
            }"#,
        )
        .unwrap();
        let before = history.games().clone();
        let mut prompter = ScriptedPrompter::default();

        let result = history.apply_snapshot(
            map_from_games([Game::new(1, "Broken", 50)]),
            "Steam",
            &mut prompter,
            now(),
        );

        assert!(result.is_err());
        assert_eq!(history.games(), &before);
    }

    #[test]
    fn game_history_lists_points() {
        let mut history = HistoryFile::empty(now());
        let mut game = Game::new(7, "Portal", 60);
        game.playtime_history.add_point(now(), 60);
        history.games_mut().insert(7, game);

        let listing = history.game_history(7).unwrap();
        assert!(listing.starts_with("Play History: \n"));
        assert!(listing.trim_end().ends_with(": 60"));
        assert!(matches!(history.game_history(8), Err(HistoryError::GameNotFound(8))));
    }

    #[test]
    fn set_spent_reports_changes() {
        let mut history = HistoryFile::empty(now());
        history.games_mut().insert(7, Game::new(7, "Portal", 60));

        assert!(history.set_spent(7, Some(9.99)).unwrap());
        assert!(!history.set_spent(7, Some(9.99)).unwrap());
        assert_eq!(history.games()[&7].spent, Some(9.99));
    }
}
