//! `playtime sync`: fetch every enabled source and fold it into the history.
//!
//! Sources run one after another, Steam first. A source that can't be
//! fetched is reported and skipped; the others still run. The history is
//! saved after each source that reconciles cleanly, so a later failure never
//! loses an earlier source's work. A reconciliation error stops the run
//! without saving that source.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use playtime_core::{
    fetch_with_timeout, load_config, DataSource, HistoryFile, MultiMcSource, Prompter,
    StorageConfig, SteamSource, TrackerConfig,
};
use tracing::{debug, error, info, warn};

fn enabled_sources(config: &TrackerConfig) -> Vec<(Arc<dyn DataSource>, Duration)> {
    let mut sources: Vec<(Arc<dyn DataSource>, Duration)> = Vec::new();

    let steam = &config.steam;
    if !steam.enabled {
        debug!("Steam disabled");
    } else if !steam.is_configured() {
        warn!("Steam is enabled but api_key/steam_id are missing; skipping");
    } else {
        let source = SteamSource::new(&steam.api_key, &steam.steam_id, steam.timeout())
            .with_scrape_file(steam.scrape_file.clone());
        sources.push((Arc::new(source), steam.timeout()));
    }

    let multimc = &config.multimc;
    match (&multimc.instances_dir, multimc.enabled) {
        (Some(dir), true) => {
            sources.push((Arc::new(MultiMcSource::new(dir)), multimc.timeout()));
        }
        (None, true) => debug!("No MultiMC instances_dir configured"),
        (_, false) => debug!("MultiMC disabled"),
    }

    sources
}

pub fn run(storage: &StorageConfig, prompter: &mut dyn Prompter) -> Result<(), String> {
    let now = Utc::now();
    let config = load_config(&storage.config_file())?;
    let history_path = storage.history_file();
    let mut history = HistoryFile::load(&history_path, now)?;

    let sources = enabled_sources(&config);
    if sources.is_empty() {
        eprintln!(
            "No data sources configured. Add a [steam] or [multimc] section to {}",
            storage.config_file().display()
        );
        return Ok(());
    }

    let mut failed = Vec::new();
    for (source, timeout) in sources {
        let name = source.name().to_string();
        let snapshot = match fetch_with_timeout(source, history.id_tracker(), timeout) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(source = %name, error = %err, "Could not fetch snapshot");
                eprintln!("Couldn't update {name}: {err}");
                failed.push(name);
                continue;
            }
        };

        history.set_id_tracker(snapshot.ids);
        history.apply_snapshot(snapshot.games, &snapshot.source, prompter, now)?;
        history.save(&history_path, now)?;
        info!(source = %name, "Source synced");
        println!("Updated {name}");
    }

    if !failed.is_empty() {
        warn!(failed = ?failed, "Sync finished with failed sources");
    }
    Ok(())
}
