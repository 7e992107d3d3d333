//! Steam library snapshots.
//!
//! Totals come from the `GetOwnedGames` web API. The API does not say when a
//! game was last played reliably, so an optional scrape of the profile's games
//! page (saved as JSON) is merged on top: its `last_played` wins, and its
//! `hours` fill in the two-week figure when the API left it out.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::game::{Game, GameMap, DEFAULT_SOURCE};
use crate::ids::IdTracker;
use crate::sources::DataSource;

const OWNED_GAMES_URL: &str = "https://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";

#[derive(Debug, Deserialize)]
struct OwnedGamesEnvelope {
    response: OwnedGamesResponse,
}

#[derive(Debug, Default, Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    games: Vec<OwnedGame>,
}

#[derive(Debug, Deserialize)]
struct OwnedGame {
    appid: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    playtime_forever: i64,
    #[serde(default)]
    playtime_2weeks: Option<i64>,
    #[serde(default)]
    img_logo_url: Option<String>,
    #[serde(default)]
    img_icon_url: Option<String>,
    #[serde(default)]
    rtime_last_played: Option<i64>,
}

/// One row of the scraped games page.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeEntry {
    pub appid: i64,
    /// Unix seconds.
    #[serde(default)]
    pub last_played: Option<i64>,
    /// Hours in the last two weeks. The page renders it as text, so it may be
    /// a string or a number.
    #[serde(default)]
    pub hours: Option<Value>,
}

impl ScrapeEntry {
    fn recent_minutes(&self) -> Option<i64> {
        let hours = match self.hours.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            _ => return None,
        };
        hours.is_finite().then(|| (hours * 60.0).round() as i64)
    }
}

#[derive(Debug, Clone)]
pub struct SteamSource {
    api_key: String,
    steam_id: String,
    scrape_file: Option<PathBuf>,
    timeout: Duration,
}

impl SteamSource {
    pub fn new(api_key: impl Into<String>, steam_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            steam_id: steam_id.into(),
            scrape_file: None,
            timeout,
        }
    }

    pub fn with_scrape_file(mut self, path: Option<PathBuf>) -> Self {
        self.scrape_file = path;
        self
    }

    fn request_owned_games(&self) -> Result<String, SourceError> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(2))
            .timeout_read(self.timeout)
            .build();

        let response = agent
            .get(OWNED_GAMES_URL)
            .query("key", &self.api_key)
            .query("steamid", &self.steam_id)
            .query("format", "json")
            .query("include_appinfo", "1")
            .query("include_played_free_games", "1")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => {
                    SourceError::Http(format!("GetOwnedGames returned status {code}"))
                }
                ureq::Error::Transport(err) => SourceError::Http(err.to_string()),
            })?;

        response.into_string().map_err(|source| SourceError::Io {
            context: "reading GetOwnedGames response".to_string(),
            source,
        })
    }

    fn read_scrape_data(&self) -> Result<Vec<ScrapeEntry>, SourceError> {
        let Some(path) = &self.scrape_file else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            warn!(path = %path.display(), "Scrape file not found, using API data only");
            return Ok(Vec::new());
        }
        let content = fs_err::read_to_string(path).map_err(|source| SourceError::Io {
            context: format!("reading {}", path.display()),
            source,
        })?;
        parse_scrape_data(&content)
    }
}

impl DataSource for SteamSource {
    fn name(&self) -> &str {
        DEFAULT_SOURCE
    }

    fn fetch(&self, _ids: &mut IdTracker) -> Result<GameMap, SourceError> {
        if self.api_key.is_empty() || self.steam_id.is_empty() {
            return Err(SourceError::NotConfigured(DEFAULT_SOURCE.to_string()));
        }

        let scrape = self.read_scrape_data()?;
        let body = self.request_owned_games()?;
        let mut games = parse_owned_games(&body)?;
        merge_scrape_data(&mut games, &scrape);
        Ok(games)
    }
}

/// Parses a `GetOwnedGames` response body.
pub fn parse_owned_games(body: &str) -> Result<GameMap, SourceError> {
    let envelope: OwnedGamesEnvelope =
        serde_json::from_str(body).map_err(|err| SourceError::Parse {
            what: "GetOwnedGames response".to_string(),
            details: err.to_string(),
        })?;

    let games = envelope
        .response
        .games
        .into_iter()
        .map(|owned| {
            let mut game = Game::new(owned.appid, owned.name, owned.playtime_forever);
            game.logo_url = owned.img_logo_url.unwrap_or_default();
            game.icon_url = owned.img_icon_url.filter(|url| !url.is_empty());
            game.playtime_2weeks = owned.playtime_2weeks;
            game.last_played = owned
                .rtime_last_played
                .filter(|secs| *secs > 0)
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            (game.appid, game)
        })
        .collect();
    Ok(games)
}

/// Parses the scraped games page (a JSON array of [`ScrapeEntry`]).
pub fn parse_scrape_data(content: &str) -> Result<Vec<ScrapeEntry>, SourceError> {
    serde_json::from_str(content).map_err(|err| SourceError::Parse {
        what: "scraped games page".to_string(),
        details: err.to_string(),
    })
}

/// Overlays scraped data onto API results. Entries for games the API did not
/// return are ignored.
pub fn merge_scrape_data(games: &mut GameMap, scrape: &[ScrapeEntry]) {
    for entry in scrape {
        let Some(game) = games.get_mut(&entry.appid) else {
            continue;
        };
        let Some(secs) = entry.last_played else {
            continue;
        };

        game.last_played = DateTime::<Utc>::from_timestamp(secs, 0);
        if game.playtime_2weeks.is_none() {
            game.playtime_2weeks = entry.recent_minutes();
        }
        debug!(appid = entry.appid, "Merged scrape data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = r#"{
        "response": {
            "game_count": 2,
            "games": [
                {
                    "appid": 220,
                    "name": "Half-Life 2",
                    "playtime_forever": 754,
                    "playtime_2weeks": 30,
                    "img_icon_url": "fcfb366051782b8ebf2aa297f3b746395858cb62",
                    "img_logo_url": "e4ad9cf1b7dc8475c1118625daf9abd4bdcbcad0",
                    "rtime_last_played": 1719770400
                },
                {
                    "appid": 400,
                    "name": "Portal",
                    "playtime_forever": 0,
                    "img_icon_url": "",
                    "img_logo_url": "",
                    "rtime_last_played": 0
                }
            ]
        }
    }"#;

    #[test]
    fn parses_owned_games() {
        let games = parse_owned_games(BODY).unwrap();

        let hl2 = &games[&220];
        assert_eq!(hl2.name, "Half-Life 2");
        assert_eq!(hl2.total_playtime, 754);
        assert_eq!(hl2.playtime_2weeks, Some(30));
        assert_eq!(hl2.logo_url, "e4ad9cf1b7dc8475c1118625daf9abd4bdcbcad0");
        assert_eq!(
            hl2.last_played,
            Some(Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap())
        );
        assert!(hl2.source.is_none());

        let portal = &games[&400];
        assert!(portal.last_played.is_none());
        assert!(portal.icon_url.is_none());
        assert!(portal.playtime_2weeks.is_none());
    }

    #[test]
    fn empty_library_has_no_games() {
        let games = parse_owned_games(r#"{"response": {}}"#).unwrap();
        assert!(games.is_empty());
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        assert!(matches!(
            parse_owned_games("<html>"),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn scrape_overrides_last_played_and_fills_two_weeks() {
        let mut games = parse_owned_games(BODY).unwrap();
        let scrape = parse_scrape_data(
            r#"[
                {"appid": 220, "last_played": 1719784800, "hours": "9.5"},
                {"appid": 400, "last_played": 1719784800, "hours": "1.5"},
                {"appid": 999, "last_played": 1719784800, "hours": 3}
            ]"#,
        )
        .unwrap();

        merge_scrape_data(&mut games, &scrape);

        let later = Utc.with_ymd_and_hms(2024, 6, 30, 22, 0, 0).unwrap();
        assert_eq!(games[&220].last_played, Some(later));
        // The API figure wins over the scraped one.
        assert_eq!(games[&220].playtime_2weeks, Some(30));
        assert_eq!(games[&400].last_played, Some(later));
        assert_eq!(games[&400].playtime_2weeks, Some(90));
        assert!(!games.contains_key(&999));
    }

    #[test]
    fn unparseable_hours_leave_two_weeks_unset() {
        let mut games = parse_owned_games(BODY).unwrap();
        let scrape = vec![ScrapeEntry {
            appid: 400,
            last_played: Some(1719784800),
            hours: Some(Value::String("n/a".to_string())),
        }];

        merge_scrape_data(&mut games, &scrape);

        assert!(games[&400].playtime_2weeks.is_none());
        assert!(games[&400].last_played.is_some());
    }

    #[test]
    fn fetch_without_credentials_is_not_configured() {
        let source = SteamSource::new("", "", Duration::from_secs(1));
        let err = source.fetch(&mut IdTracker::new()).unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }
}
