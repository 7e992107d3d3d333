//! Per-game play history log.
//!
//! A [`Timeline`] is an ordered list of [`TimePoint`]s. Each point carries the
//! minutes attributed to that instant; a point with `playtime == 0` is a
//! quiescent marker ("nothing played since this instant"). A log that already
//! ends in a marker has that marker moved instead of gaining a second one.
//!
//! Timestamps never decrease along the log. Instants that would break that
//! ordering are clamped to the previous point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: DateTime<Utc>,
    pub playtime: i64,
}

impl TimePoint {
    pub fn new(date: DateTime<Utc>, playtime: i64) -> Self {
        Self { date, playtime }
    }

    pub fn is_quiescent(&self) -> bool {
        self.playtime == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    points: Vec<TimePoint>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<TimePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.last()
    }

    /// Sum of every attributed chunk.
    pub fn total(&self) -> i64 {
        self.points.iter().map(|point| point.playtime).sum()
    }

    pub fn ends_quiescent(&self) -> bool {
        self.points.last().is_some_and(TimePoint::is_quiescent)
    }

    pub fn is_chronological(&self) -> bool {
        self.points
            .windows(2)
            .all(|pair| pair[0].date <= pair[1].date)
    }

    /// Appends `minutes` at `at`.
    pub fn add_point(&mut self, at: DateTime<Utc>, minutes: i64) {
        let floor = self.points.last().map(|point| point.date);
        let date = clamp_to_floor(at, floor);
        self.points.push(TimePoint::new(date, minutes));
    }

    /// Records that nothing has been played since `at`.
    ///
    /// Moves a trailing marker in place, otherwise appends a new one.
    pub fn mark_quiescent(&mut self, at: DateTime<Utc>) {
        if self.ends_quiescent() {
            let len = self.points.len();
            let floor = len
                .checked_sub(2)
                .map(|index| self.points[index].date);
            self.points[len - 1].date = clamp_to_floor(at, floor);
        } else {
            self.add_point(at, 0);
        }
    }
}

fn clamp_to_floor(at: DateTime<Utc>, floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match floor {
        Some(floor) if at < floor => {
            warn!(
                requested = %at.to_rfc3339(),
                clamped_to = %floor.to_rfc3339(),
                "History point would precede the previous point; clamping"
            );
            floor
        }
        _ => at,
    }
}
