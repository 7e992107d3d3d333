//! Merging a fresh snapshot into the stored games.
//!
//! One pass over a set of games goes:
//!
//! 1. **New** games (in the snapshot, not stored) are copied without history,
//!    marked quiescent at the previous check, then allocated and merged.
//! 2. **Matched** games owned by the snapshot's source and not ignored are
//!    allocated and merged against their snapshot record.
//! 3. **Missing** games owned by the source but absent from the snapshot are
//!    removed unless the user asks to keep them.
//!
//! Each phase finishes before the next starts, and games are visited in id
//! order, so questions always come in the same order. Children are reconciled
//! by the same pass one level down, under the default source tag since they
//! belong to whatever source owns their parent.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::allocator::allocate_game;
use crate::error::ReconcileError;
use crate::game::{map_from_games, Game, GameMap, DEFAULT_SOURCE};
use crate::prompt::Prompter;
use crate::properties::reconcile_properties;

/// How far back a source's first run pretends the previous check was.
pub const INITIAL_LOOKBACK_DAYS: i64 = 100;

/// The two instants every allocation is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileContext {
    /// When the history was last brought up to date.
    pub last_run: DateTime<Utc>,
    /// The reference instant of this run.
    pub now: DateTime<Utc>,
}

impl ReconcileContext {
    pub fn new(last_run: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self { last_run, now }
    }

    /// Context for a source that has never been recorded.
    pub fn first_run(now: DateTime<Utc>) -> Self {
        Self {
            last_run: now - Duration::days(INITIAL_LOOKBACK_DAYS),
            now,
        }
    }
}

/// Reconciles `snapshot` from `source` into `games` and returns the result.
///
/// `games` is consumed; on error the caller must discard the run and keep its
/// own copy of the previous state.
pub fn reconcile_all(
    snapshot: GameMap,
    games: GameMap,
    source: &str,
    ctx: &ReconcileContext,
    prompter: &mut dyn Prompter,
) -> Result<GameMap, ReconcileError> {
    info!(
        source,
        incoming = snapshot.len(),
        stored = games.len(),
        "Reconciling snapshot"
    );
    reconcile_level(snapshot, games, source, 0, ctx, prompter)
}

/// First run of a source: every game goes through the new-game path against
/// a previous check [`INITIAL_LOOKBACK_DAYS`] ago.
pub fn initialize_games(
    snapshot: GameMap,
    source: &str,
    now: DateTime<Utc>,
    prompter: &mut dyn Prompter,
) -> Result<GameMap, ReconcileError> {
    info!(source, incoming = snapshot.len(), "Initializing play history");
    let ctx = ReconcileContext::first_run(now);
    reconcile_level(snapshot, GameMap::new(), source, 0, &ctx, prompter)
}

fn reconcile_level(
    mut snapshot: GameMap,
    mut games: GameMap,
    source: &str,
    depth: usize,
    ctx: &ReconcileContext,
    prompter: &mut dyn Prompter,
) -> Result<GameMap, ReconcileError> {
    let new_ids: Vec<i64> = snapshot
        .keys()
        .filter(|appid| !games.contains_key(appid))
        .copied()
        .collect();

    for appid in &new_ids {
        let Some(incoming) = snapshot.remove(appid) else {
            continue;
        };
        info!(appid, name = %incoming.name, depth, "New game found");
        let mut game = incoming.fresh_copy();
        game.playtime_history.mark_quiescent(ctx.last_run);
        update_game(&mut game, &incoming, true, depth, ctx, prompter)?;
        games.insert(*appid, game);
    }

    let mut missing = Vec::new();
    for (appid, game) in games.iter_mut() {
        if new_ids.contains(appid) || game.is_ignored() || !game.owned_by(source) {
            continue;
        }
        let Some(incoming) = snapshot.get(appid) else {
            missing.push(*appid);
            continue;
        };

        if game.playtime_history.is_empty() {
            debug!(appid, depth, "Stored game has no history; initializing");
            let first_run = ReconcileContext::first_run(ctx.now);
            game.playtime_history.mark_quiescent(first_run.last_run);
            update_game(game, incoming, true, depth, &first_run, prompter)?;
        } else {
            update_game(game, incoming, false, depth, ctx, prompter)?;
        }
    }

    for appid in missing {
        let Some(game) = games.get_mut(&appid) else {
            continue;
        };
        if game.is_kept() {
            continue;
        }

        let question = format!(
            "{} has been removed.\nWould you like to keep its data anyway?",
            game.name
        );
        if prompter.confirm(&question) {
            info!(appid, name = %game.name, depth, "Keeping removed game");
            game.keep = Some(true);
            let own_data = game.clone();
            update_game(game, &own_data, false, depth, ctx, prompter)?;
        } else {
            info!(appid, name = %game.name, depth, "Removing game");
            games.remove(&appid);
        }
    }

    Ok(games)
}

fn update_game(
    game: &mut Game,
    incoming: &Game,
    is_new: bool,
    depth: usize,
    ctx: &ReconcileContext,
    prompter: &mut dyn Prompter,
) -> Result<(), ReconcileError> {
    allocate_game(game, incoming, is_new, ctx.last_run, ctx.now, prompter)?;
    reconcile_properties(incoming, game, prompter);

    let stored_children = map_from_games(game.children.take().unwrap_or_default());
    let incoming_children = incoming.children_map();
    if stored_children.is_empty() && incoming_children.is_empty() {
        return Ok(());
    }

    let merged = reconcile_level(
        incoming_children,
        stored_children,
        DEFAULT_SOURCE,
        depth + 1,
        ctx,
        prompter,
    )?;
    if !merged.is_empty() {
        game.children = Some(merged.into_values().collect());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::timeline::TimePoint;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()
    }

    fn stored(appid: i64, name: &str, total: i64, marker: DateTime<Utc>) -> Game {
        let mut game = Game::new(appid, name, total);
        game.playtime_history.add_point(marker - Duration::days(30), total);
        game.playtime_history.mark_quiescent(marker);
        game
    }

    #[test]
    fn new_game_starts_at_previous_check() {
        let last_run = now() - Duration::days(20);
        let ctx = ReconcileContext::new(last_run, now());
        let snapshot = map_from_games([Game::new(220, "Half-Life 2", 120)]);
        let mut prompter = ScriptedPrompter::default();

        let games = reconcile_all(snapshot, GameMap::new(), DEFAULT_SOURCE, &ctx, &mut prompter).unwrap();

        let game = &games[&220];
        assert_eq!(game.total_playtime, 120);
        assert_eq!(
            game.playtime_history.points(),
            [
                TimePoint::new(last_run, 0),
                TimePoint::new(now() - Duration::days(14), 120),
                TimePoint::new(now(), 0),
            ]
        );
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn matched_game_gets_new_total() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let games = map_from_games([stored(220, "Half-Life 2", 100, last_run)]);
        let mut incoming = Game::new(220, "Half-Life 2", 160);
        incoming.last_played = Some(last_run + Duration::minutes(61));
        let mut prompter = ScriptedPrompter::default();

        let games =
            reconcile_all(map_from_games([incoming]), games, DEFAULT_SOURCE, &ctx, &mut prompter).unwrap();

        let game = &games[&220];
        assert_eq!(game.total_playtime, 160);
        assert_eq!(game.playtime_history.total(), 160);
        assert!(game.playtime_history.ends_quiescent());
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn games_of_other_sources_are_left_alone() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let mut minecraft = stored(-1, "Minecraft", 500, last_run);
        minecraft.source = Some("Minecraft".to_string());
        let games = map_from_games([minecraft.clone()]);
        let mut prompter = ScriptedPrompter::default();

        let games = reconcile_all(GameMap::new(), games, DEFAULT_SOURCE, &ctx, &mut prompter).unwrap();

        assert_eq!(games[&-1], minecraft);
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn ignored_games_are_not_updated() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let mut ignored = stored(10, "Spacewar", 5, last_run);
        ignored.ignored = Some(true);
        let games = map_from_games([ignored.clone()]);
        let mut prompter = ScriptedPrompter::default();

        let games = reconcile_all(
            map_from_games([Game::new(10, "Spacewar", 900)]),
            games,
            DEFAULT_SOURCE,
            &ctx,
            &mut prompter,
        )
        .unwrap();

        assert_eq!(games[&10], ignored);
    }

    #[test]
    fn kept_missing_games_are_not_asked_about() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let mut kept = stored(10, "Delisted", 5, last_run);
        kept.keep = Some(true);
        let mut prompter = ScriptedPrompter::default();

        let games = reconcile_all(GameMap::new(), map_from_games([kept]), DEFAULT_SOURCE, &ctx, &mut prompter)
            .unwrap();

        assert!(games.contains_key(&10));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn accepted_keep_moves_the_marker() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let games = map_from_games([stored(10, "Delisted", 45, last_run)]);
        let mut prompter = ScriptedPrompter::new([true]);

        let games = reconcile_all(GameMap::new(), games, DEFAULT_SOURCE, &ctx, &mut prompter).unwrap();

        let kept = &games[&10];
        assert_eq!(kept.keep, Some(true));
        assert_eq!(
            kept.playtime_history.points(),
            [
                TimePoint::new(last_run - Duration::days(30), 45),
                TimePoint::new(now(), 0),
            ]
        );
        assert_eq!(kept.total_playtime, 45);
    }

    #[test]
    fn phases_run_new_then_matched_then_missing() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let games = map_from_games([
            stored(1, "Gone", 10, last_run),
            stored(5, "Renamed", 10, last_run),
        ]);
        let mut newcomer = Game::new(9, "Newcomer", 30);
        newcomer.last_played = Some(now() - Duration::hours(1));
        let snapshot = map_from_games([newcomer, Game::new(5, "Renamed Again", 10)]);
        let mut prompter = ScriptedPrompter::new([false, false, false]);

        reconcile_all(snapshot, games, DEFAULT_SOURCE, &ctx, &mut prompter).unwrap();

        let asked = prompter.asked();
        assert_eq!(asked.len(), 3);
        assert!(asked[0].contains("minutes of Newcomer"));
        assert!(asked[1].contains("name property of Renamed"));
        assert!(asked[2].starts_with("Gone has been removed."));
    }

    #[test]
    fn children_without_entries_collapse_to_unset() {
        let last_run = now() - Duration::days(3);
        let ctx = ReconcileContext::new(last_run, now());
        let mut game = stored(220, "Half-Life 2", 10, last_run);
        game.children = Some(Vec::new());
        let mut incoming = Game::new(220, "Half-Life 2", 10);
        incoming.children = Some(Vec::new());
        let mut prompter = ScriptedPrompter::default();

        let games = reconcile_all(
            map_from_games([incoming]),
            map_from_games([game]),
            DEFAULT_SOURCE,
            &ctx,
            &mut prompter,
        )
        .unwrap();

        assert!(games[&220].children.is_none());
    }

    #[test]
    fn first_run_uses_initial_lookback() {
        let snapshot = map_from_games([Game::new(220, "Half-Life 2", 600)]);
        let mut prompter = ScriptedPrompter::default();

        let games = initialize_games(snapshot, DEFAULT_SOURCE, now(), &mut prompter).unwrap();

        let points = games[&220].playtime_history.points();
        assert_eq!(points[0], TimePoint::new(now() - Duration::days(INITIAL_LOOKBACK_DAYS), 0));
        assert_eq!(points[1], TimePoint::new(now() - Duration::days(14), 600));
        assert_eq!(points[2], TimePoint::new(now(), 0));
    }
}
