//! Turning a change in cumulative playtime into history points.
//!
//! Sources only report a running total and, sometimes, how much of it was
//! played in the last two weeks. From that, the allocator places the new
//! minutes on the timeline:
//!
//! - More than two weeks since the previous check and nothing played recently:
//!   the whole increase lands 14 days before now.
//! - More than two weeks with a recent-play hint: whatever the hint does not
//!   cover lands 14 days before now, the rest lands at the last-played instant.
//! - Within two weeks: the whole increase lands at the last-played instant.
//!
//! When the implied session start (last played minus the minutes) is more than
//! [`CHUNK_TOLERANCE_MINUTES`] away from the previous check, the user is asked
//! whether it was one sitting. If so the quiescent marker is moved up to the
//! implied start.

use chrono::{DateTime, Duration, Local, Utc};
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::game::Game;
use crate::prompt::Prompter;
use crate::timeline::Timeline;

/// Width of the "played recently" window sources report on.
pub const TWO_WEEKS_DAYS: i64 = 14;

/// Mismatch between implied session start and the previous check that is
/// still accepted without asking.
pub const CHUNK_TOLERANCE_MINUTES: i64 = 5;

/// A brand-new game whose total exceeds its two-week figure by less than this
/// is treated as played entirely inside the window.
pub const NEW_GAME_FOLD_MINUTES: i64 = 6;

/// What a source says about one game's playtime.
#[derive(Debug, Clone, Copy)]
pub struct PlaytimeReport<'a> {
    pub name: &'a str,
    pub total: i64,
    pub two_weeks: Option<i64>,
    pub last_played: Option<DateTime<Utc>>,
}

impl<'a> PlaytimeReport<'a> {
    pub fn from_game(game: &'a Game) -> Self {
        Self {
            name: &game.name,
            total: game.total_playtime,
            two_weeks: game.playtime_2weeks.filter(|minutes| *minutes > 0),
            last_played: game.last_played,
        }
    }

    /// Folds a tiny pre-window remainder into the two-week figure.
    pub fn folded_for_new_game(mut self) -> Self {
        if let Some(two_weeks) = self.two_weeks {
            let difference = self.total - two_weeks;
            if difference < NEW_GAME_FOLD_MINUTES {
                self.two_weeks = Some(two_weeks + difference);
            }
        }
        self
    }
}

/// How an increase was placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Nothing new was played.
    Idle,
    /// Everything happened before the two-week window.
    BeforeWindow { minutes: i64 },
    /// Part before the window, part at the last-played instant.
    Split { before: i64, recent: i64 },
    /// Everything at the last-played instant.
    Recent { minutes: i64 },
}

/// Places `report.total - old_total` minutes on `log`.
pub fn allocate(
    log: &mut Timeline,
    old_total: i64,
    report: &PlaytimeReport<'_>,
    last_run: DateTime<Utc>,
    now: DateTime<Utc>,
    prompter: &mut dyn Prompter,
) -> Allocation {
    let delta = report.total - old_total;
    if delta <= 0 {
        log.mark_quiescent(now);
        return Allocation::Idle;
    }

    let window_start = now - Duration::days(TWO_WEEKS_DAYS);
    let session_end = report.last_played.unwrap_or(now);
    let days_since_last_run = now.signed_duration_since(last_run).num_days();

    let allocation = if days_since_last_run > TWO_WEEKS_DAYS {
        match report.two_weeks {
            None => {
                log.add_point(window_start, delta);
                Allocation::BeforeWindow { minutes: delta }
            }
            Some(two_weeks) => {
                let before = (delta - two_weeks).max(0);
                if before > 0 {
                    log.add_point(window_start, before);
                }
                let recent = delta.min(two_weeks);
                confirm_chunk(log, report, session_end, recent, last_run, prompter);
                log.add_point(session_end, recent);
                Allocation::Split { before, recent }
            }
        }
    } else {
        confirm_chunk(log, report, session_end, delta, last_run, prompter);
        log.add_point(session_end, delta);
        Allocation::Recent { minutes: delta }
    };

    log.mark_quiescent(now);
    allocation
}

/// Allocates the playtime change of `incoming` onto `existing`'s history.
///
/// `is_new` enables the new-game fold. Fails when the stored history is not
/// chronological, which only a corrupted document can produce.
pub fn allocate_game(
    existing: &mut Game,
    incoming: &Game,
    is_new: bool,
    last_run: DateTime<Utc>,
    now: DateTime<Utc>,
    prompter: &mut dyn Prompter,
) -> Result<Allocation, ReconcileError> {
    if !existing.playtime_history.is_chronological() {
        return Err(ReconcileError::UnorderedHistory {
            appid: existing.appid,
        });
    }

    let mut report = PlaytimeReport::from_game(incoming);
    if is_new {
        report = report.folded_for_new_game();
    }

    let allocation = allocate(
        &mut existing.playtime_history,
        existing.total_playtime,
        &report,
        last_run,
        now,
        prompter,
    );
    debug!(
        appid = existing.appid,
        name = %existing.name,
        ?allocation,
        "Allocated playtime"
    );
    Ok(allocation)
}

fn confirm_chunk(
    log: &mut Timeline,
    report: &PlaytimeReport<'_>,
    session_end: DateTime<Utc>,
    minutes: i64,
    last_run: DateTime<Utc>,
    prompter: &mut dyn Prompter,
) {
    let Some(implied_start) = Duration::try_minutes(minutes)
        .and_then(|length| session_end.checked_sub_signed(length))
    else {
        warn!(name = report.name, minutes, "Chunk too long to place on the calendar; not asking");
        return;
    };
    let gap = implied_start.signed_duration_since(last_run).num_minutes().abs();
    if gap <= CHUNK_TOLERANCE_MINUTES {
        return;
    }

    let question = format!(
        "Was the recent {} minutes of {} in one chunk?\n (it was last played on {})",
        minutes,
        report.name,
        session_end.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if prompter.confirm(&question) {
        log.mark_quiescent(implied_start);
    }
}
