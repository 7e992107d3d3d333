//! GaugePowered CSV import.
//!
//! GaugePowered exports one row per game:
//!
//! ```text
//! Game,Cost,Hours,Cost per hour,Rating,Finished,Tags
//! "Half-Life 2",9.99,12.6,0.79,5,Yes,FPS|Classic
//! ```
//!
//! The export names games the way the store page does, which rarely matches
//! the stored name exactly. Names are compared after [`normalize_name`]; an
//! exact match is applied straight away, near matches are put to the user.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::game::GameMap;
use crate::prompt::Prompter;
use crate::properties::reconcile_properties;

const COLUMNS: usize = 7;

static FIELD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?:^|,)(?:"([^"]*)"|([^",]*))"#).unwrap());
static NAME_NOISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[®™:\s-]").unwrap());

/// One game row of the export.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeRow {
    pub name: String,
    pub spent: Option<f64>,
    pub rating: Option<f64>,
    pub tags: Option<Vec<String>>,
}

impl GaugeRow {
    fn from_fields(fields: &[String]) -> Self {
        let number = |raw: &str| raw.trim().parse::<f64>().ok();
        let rating = fields[4].trim();
        let tags = fields[6].trim();

        Self {
            name: fields[0].clone(),
            spent: number(&fields[1]),
            rating: (rating != "0").then(|| number(rating)).flatten(),
            tags: (!tags.is_empty()).then(|| tags.split('|').map(str::to_string).collect()),
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Stored games that were updated from a row, in the order they matched.
    pub matched: Vec<i64>,
    /// Rows with no counterpart among the stored games.
    pub leftovers: Vec<GaugeRow>,
}

/// Reduces a title to the characters that matter for matching.
pub fn normalize_name(name: &str) -> String {
    NAME_NOISE_RE
        .replace_all(name, "")
        .replace('&', "and")
        .to_lowercase()
}

fn split_fields(line: &str) -> Vec<String> {
    FIELD_RE
        .captures_iter(line)
        .map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// Parses the export, skipping the header and anything that isn't a game row.
pub fn parse_gauge_csv(content: &str) -> Vec<GaugeRow> {
    let content = content.replace(['®', '™'], "");
    let mut rows = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_fields(line);
        if fields.len() == COLUMNS - 1 {
            fields.push(String::new());
        }
        if fields.first().is_some_and(|first| first == "Game") {
            continue;
        }
        if fields.len() < COLUMNS {
            warn!(line, "Skipping CSV line with too few columns");
            continue;
        }
        rows.push(GaugeRow::from_fields(&fields));
    }

    rows
}

/// Applies `rows` to `games`, consuming each row that finds its game.
pub fn import_rows(
    mut rows: Vec<GaugeRow>,
    games: &mut GameMap,
    prompter: &mut dyn Prompter,
) -> ImportReport {
    let mut matched = Vec::new();
    let appids: Vec<i64> = games.keys().copied().collect();

    for appid in appids {
        let Some(stored) = games.get_mut(&appid) else {
            continue;
        };
        let stored_name = normalize_name(&stored.name);
        if stored_name.is_empty() {
            continue;
        }

        let mut exact = None;
        let mut candidates = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let row_name = normalize_name(&row.name);
            if row_name.is_empty() {
                continue;
            }
            if row_name == stored_name {
                exact = Some(index);
                break;
            }
            if row_name.len() != stored_name.len()
                && (row_name.contains(&stored_name) || stored_name.contains(&row_name))
            {
                candidates.push(index);
            }
        }

        let chosen = match (exact, candidates.as_slice()) {
            (Some(index), _) => Some(index),
            (None, []) => None,
            (None, [only]) => {
                let question = format!(
                    "Are \"{}\" (from Play History) and \"{}\" (from csv) the same game?",
                    stored.name, rows[*only].name
                );
                prompter.confirm(&question).then_some(*only)
            }
            (None, several) => {
                let question = format!(
                    "Which of the following is the same game as \"{}\"? (from Play History)",
                    stored.name
                );
                let options: Vec<String> =
                    several.iter().map(|index| rows[*index].name.clone()).collect();
                prompter
                    .choose(&question, &options)
                    .and_then(|picked| several.get(picked).copied())
            }
        };

        let Some(index) = chosen else {
            debug!(appid, name = %stored.name, "No CSV row for game");
            continue;
        };

        let row = rows.remove(index);
        let mut incoming = stored.clone();
        incoming.spent = row.spent;
        incoming.rating = row.rating;
        incoming.tags = row.tags;
        let updated = reconcile_properties(&incoming, stored, prompter);
        debug!(appid, csv_name = %row.name, ?updated, "Applied CSV row");
        matched.push(appid);
    }

    ImportReport {
        matched,
        leftovers: rows,
    }
}

/// Reads a GaugePowered export from `path` and merges it into `games`.
pub fn import_gauge_csv(
    path: &Path,
    games: &mut GameMap,
    prompter: &mut dyn Prompter,
) -> Result<ImportReport, ImportError> {
    if games.is_empty() {
        return Err(ImportError::NoGames);
    }

    let content = fs_err::read_to_string(path).map_err(|source| ImportError::Io {
        context: format!("reading {}", path.display()),
        source,
    })?;
    let rows = parse_gauge_csv(&content);
    info!(path = %path.display(), rows = rows.len(), "Importing GaugePowered CSV");

    let report = import_rows(rows, games, prompter);
    info!(
        matched = report.matched.len(),
        leftovers = report.leftovers.len(),
        "GaugePowered import finished"
    );
    Ok(report)
}
