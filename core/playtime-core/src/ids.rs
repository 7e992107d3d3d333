//! Stable numeric ids for sources that only have string keys.
//!
//! The filesystem scan knows its games by directory name, but the history is
//! keyed by number. Ids handed out here are negative and strictly decreasing so
//! they never collide with the positive ids issued by Steam.
//!
//! The table is append-only and persisted with the history document under
//! `idTracker`.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One persisted mapping from a string key to its numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameId {
    pub strid: String,
    pub numid: i64,
}

/// Append-only string → id table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdTracker {
    game_ids: Vec<GameId>,
}

impl IdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(game_ids: Vec<GameId>) -> Self {
        Self { game_ids }
    }

    pub fn len(&self) -> usize {
        self.game_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.game_ids.is_empty()
    }

    /// Returns the id for `strid`, allocating `min(existing) - 1` on first sight.
    pub fn resolve(&mut self, strid: &str) -> i64 {
        let mut min_id = 0;
        for entry in &self.game_ids {
            if entry.strid == strid {
                return entry.numid;
            }
            min_id = min_id.min(entry.numid);
        }

        let numid = min_id - 1;
        debug!(strid, numid, "Allocated id");
        self.game_ids.push(GameId {
            strid: strid.to_string(),
            numid,
        });
        numid
    }

    /// Looks up an existing id without allocating.
    pub fn get(&self, strid: &str) -> Option<i64> {
        self.game_ids
            .iter()
            .find(|entry| entry.strid == strid)
            .map(|entry| entry.numid)
    }
}
