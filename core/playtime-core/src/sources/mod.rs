//! Snapshot producers.
//!
//! A [`DataSource`] turns some external view of the library (a web API, a
//! directory of launcher instances) into a [`GameMap`] of cumulative totals.
//! Fetches run on a worker thread through [`fetch_with_timeout`] so a hung
//! source cannot stall the whole sync.

pub mod multimc;
pub mod steam;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::SourceError;
use crate::game::GameMap;
use crate::ids::IdTracker;

pub use multimc::MultiMcSource;
pub use steam::SteamSource;

pub trait DataSource: Send + Sync {
    /// Tag recorded in `Game::source`; also used in logs and errors.
    fn name(&self) -> &str;

    /// Produces the current snapshot. Sources without natural numeric ids
    /// allocate them through `ids`.
    fn fetch(&self, ids: &mut IdTracker) -> Result<GameMap, SourceError>;
}

/// One successful fetch, with the identifier table it was resolved against.
#[derive(Debug)]
pub struct Snapshot {
    pub source: String,
    pub games: GameMap,
    pub ids: IdTracker,
}

/// Runs `source.fetch` on a worker thread and waits at most `timeout`.
///
/// The worker gets a copy of `ids`; the caller adopts `Snapshot::ids` only
/// when the fetch succeeds. A worker that outlives the timeout is detached and
/// its result dropped.
pub fn fetch_with_timeout(
    source: Arc<dyn DataSource>,
    ids: &IdTracker,
    timeout: Duration,
) -> Result<Snapshot, SourceError> {
    let source_name = source.name().to_string();
    let (tx, rx) = mpsc::channel();
    let mut worker_ids = ids.clone();

    info!(source = %source_name, timeout_secs = timeout.as_secs(), "Fetching snapshot");
    let worker = Arc::clone(&source);
    thread::spawn(move || {
        let result = worker.fetch(&mut worker_ids).map(|games| (games, worker_ids));
        // The receiver is gone if we already timed out.
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok((games, ids))) => {
            info!(source = %source_name, games = games.len(), "Snapshot fetched");
            Ok(Snapshot {
                source: source_name,
                games,
                ids,
            })
        }
        Ok(Err(err)) => Err(err),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(source = %source_name, "Snapshot fetch timed out");
            Err(SourceError::Timeout {
                source_name,
                secs: timeout.as_secs(),
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(SourceError::Disconnected { source_name })
        }
    }
}
