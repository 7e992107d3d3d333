//! Minecraft playtime from a MultiMC instances directory.
//!
//! Every instance directory with an `instance.cfg` becomes a child of one
//! `Minecraft` game whose total is the sum of its instances. Instances have
//! no numeric ids of their own, so ids come from the [`IdTracker`] keyed by
//! directory name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::game::{map_from_games, Game, GameMap};
use crate::ids::IdTracker;
use crate::sources::DataSource;

pub const MINECRAFT_SOURCE: &str = "Minecraft";

static TOTAL_TIME_PLAYED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^totalTimePlayed=(\d+)\r?$").unwrap());
static LAST_LAUNCH_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^lastLaunchTime=(\d+)\r?$").unwrap());

/// What one `instance.cfg` says about playtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceStats {
    /// Whole minutes, rounded.
    pub minutes: i64,
    pub last_played: Option<DateTime<Utc>>,
}

/// Reads playtime out of an `instance.cfg`. Both keys must be present;
/// otherwise the instance counts as never played.
pub fn parse_instance_cfg(content: &str) -> InstanceStats {
    let capture = |re: &Regex| {
        re.captures(content)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
    };

    match (capture(&TOTAL_TIME_PLAYED_RE), capture(&LAST_LAUNCH_TIME_RE)) {
        (Some(seconds), Some(millis)) => InstanceStats {
            minutes: (seconds as f64 / 60.0).round() as i64,
            last_played: DateTime::<Utc>::from_timestamp_millis(millis),
        },
        _ => InstanceStats::default(),
    }
}

#[derive(Debug, Clone)]
pub struct MultiMcSource {
    instances_dir: PathBuf,
}

impl MultiMcSource {
    pub fn new(instances_dir: impl Into<PathBuf>) -> Self {
        Self {
            instances_dir: instances_dir.into(),
        }
    }

    pub fn instances_dir(&self) -> &Path {
        &self.instances_dir
    }

    fn read_children(&self, ids: &mut IdTracker) -> Result<Vec<Game>, SourceError> {
        let mut children = Vec::new();

        for entry in WalkDir::new(&self.instances_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            let cfg_path = entry.path().join("instance.cfg");
            if !cfg_path.exists() {
                continue;
            }
            let dirname = entry.file_name().to_string_lossy().into_owned();
            let content = fs_err::read_to_string(&cfg_path).map_err(|source| SourceError::Io {
                context: format!("reading {}", cfg_path.display()),
                source,
            })?;

            let stats = parse_instance_cfg(&content);
            if stats.last_played.is_none() {
                warn!(instance = %dirname, "instance.cfg has no usable playtime");
            }
            let mut child = Game::new(ids.resolve(&dirname), dirname, stats.minutes);
            child.last_played = stats.last_played;
            debug!(appid = child.appid, instance = %child.name, minutes = child.total_playtime, "Read instance");
            children.push(child);
        }

        if children.is_empty() {
            return Err(SourceError::NoInstances {
                path: self.instances_dir.clone(),
            });
        }
        Ok(children)
    }
}

impl DataSource for MultiMcSource {
    fn name(&self) -> &str {
        MINECRAFT_SOURCE
    }

    fn fetch(&self, ids: &mut IdTracker) -> Result<GameMap, SourceError> {
        let appid = ids.resolve(MINECRAFT_SOURCE);
        let children = self.read_children(ids)?;

        let mut minecraft = Game::new(
            appid,
            MINECRAFT_SOURCE,
            children.iter().map(|child| child.total_playtime).sum(),
        );
        minecraft.last_played = children.iter().filter_map(|child| child.last_played).max();
        minecraft.source = Some(MINECRAFT_SOURCE.to_string());
        minecraft.children = Some(children);

        Ok(map_from_games([minecraft]))
    }
}
