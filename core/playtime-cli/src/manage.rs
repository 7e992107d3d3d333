//! Commands that read or edit the stored history directly.

use std::path::Path;

use chrono::{Local, Utc};
use playtime_core::{import_gauge_csv, Game, HistoryFile, Prompter, StorageConfig};
use tracing::info;

pub fn import_gauge(
    storage: &StorageConfig,
    csv: &Path,
    prompter: &mut dyn Prompter,
) -> Result<(), String> {
    let now = Utc::now();
    let history_path = storage.history_file();
    let mut history = HistoryFile::load(&history_path, now)?;

    let report = import_gauge_csv(csv, history.games_mut(), prompter)?;
    history.save(&history_path, now)?;

    println!("Updated {} games from {}", report.matched.len(), csv.display());
    if !report.leftovers.is_empty() {
        println!("The following games from the CSV didn't seem to have counterparts in Play History:");
        for row in &report.leftovers {
            println!("  {}", row.name);
        }
    }
    Ok(())
}

fn format_row(game: &Game) -> String {
    let hours = game.total_playtime as f64 / 60.0;
    let last_played = game
        .last_played
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut flags = String::new();
    if game.is_ignored() {
        flags.push_str(" (ignored)");
    }
    if game.is_kept() {
        flags.push_str(" (kept)");
    }
    format!(
        "{:>10}  {:<40}  {:>8.1}h  {}{}",
        game.appid, game.name, hours, last_played, flags
    )
}

pub fn list(storage: &StorageConfig) -> Result<(), String> {
    let history = HistoryFile::load(&storage.history_file(), Utc::now())?;
    if !history.is_initialized() {
        println!("No games recorded yet. Run `playtime sync` first.");
        return Ok(());
    }

    println!(
        "{:>10}  {:<40}  {:>9}  {}",
        "ID", "NAME", "PLAYED", "LAST PLAYED"
    );
    for game in history.games().values() {
        println!("{}", format_row(game));
        for child in game.children.iter().flatten() {
            println!("  {}", format_row(child));
        }
    }
    Ok(())
}

pub fn history(storage: &StorageConfig, appid: i64) -> Result<(), String> {
    let history = HistoryFile::load(&storage.history_file(), Utc::now())?;
    print!("{}", history.game_history(appid)?);
    Ok(())
}

pub fn set_spent(storage: &StorageConfig, appid: i64, amount: Option<f64>) -> Result<(), String> {
    let now = Utc::now();
    let history_path = storage.history_file();
    let mut history = HistoryFile::load(&history_path, now)?;

    if !history.set_spent(appid, amount)? {
        println!("Nothing to change");
        return Ok(());
    }
    history.save(&history_path, now)?;
    info!(appid, ?amount, "Spent updated");
    Ok(())
}
