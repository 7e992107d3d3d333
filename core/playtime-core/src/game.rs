//! Tracked games and their remembered choices.
//!
//! Field names follow the on-disk document (`camelCase`, `iconURL`, ...).
//! `playtime2Weeks` is only ever filled in by a data source for the current run
//! and is never written back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::Timeline;

/// Source tag of games whose `source` is unset.
pub const DEFAULT_SOURCE: &str = "Steam";

/// Games keyed by `appid`. Ordered so that reconciliation visits games, and
/// therefore asks its questions, in a stable order.
pub type GameMap = BTreeMap<i64, Game>;

/// Previously declined values for one property of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub property: String,
    pub new_values: Vec<String>,
}

impl Choice {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            new_values: vec![value.to_string()],
        }
    }

    pub fn add_value(&mut self, value: &str) {
        if !self.includes(value) {
            self.new_values.push(value.to_string());
        }
    }

    pub fn includes(&self, value: &str) -> bool {
        self.new_values.iter().any(|v| v == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub appid: i64,
    pub name: String,
    /// Cumulative minutes. Rebuilt from the history when loading a document.
    #[serde(default, skip_serializing)]
    pub total_playtime: i64,
    pub playtime_history: Timeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_bundle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "iconURL", default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(rename = "logoURL", default)]
    pub logo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Game>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remembered_choices: Option<Vec<Choice>>,

    /// Minutes played in the last two weeks, as reported by the source.
    #[serde(rename = "playtime2Weeks", default, skip_serializing)]
    pub playtime_2weeks: Option<i64>,
}

impl Game {
    pub fn new(appid: i64, name: impl Into<String>, total_playtime: i64) -> Self {
        Self {
            appid,
            name: name.into(),
            total_playtime,
            playtime_history: Timeline::new(),
            playtime_offset: None,
            last_played: None,
            spent: None,
            full_price: None,
            purchase_date: None,
            gift: None,
            part_of_bundle: None,
            ignored: None,
            rating: None,
            tags: None,
            icon_url: None,
            logo_url: String::new(),
            keep: None,
            source: None,
            children: None,
            remembered_choices: None,
            playtime_2weeks: None,
        }
    }

    /// Copy of a snapshot game with nothing recorded yet: no history, no
    /// playtime, no children. Children are discovered as new on their own.
    pub fn fresh_copy(&self) -> Self {
        Self {
            total_playtime: 0,
            playtime_history: Timeline::new(),
            children: None,
            ..self.clone()
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored.unwrap_or(false)
    }

    pub fn is_kept(&self) -> bool {
        self.keep.unwrap_or(false)
    }

    /// Whether this game is reconciled against snapshots tagged `source`.
    pub fn owned_by(&self, source: &str) -> bool {
        match self.source.as_deref() {
            None => source == DEFAULT_SOURCE,
            Some(own) => own == source,
        }
    }

    pub fn children_map(&self) -> GameMap {
        self.children
            .as_deref()
            .map(|children| map_from_games(children.iter().cloned()))
            .unwrap_or_default()
    }

    pub fn remember_choice(&mut self, property: &str, value: &str) {
        let choices = self.remembered_choices.get_or_insert_with(Vec::new);
        match choices.iter_mut().find(|choice| choice.property == property) {
            Some(choice) => choice.add_value(value),
            None => choices.push(Choice::new(property, value)),
        }
    }

    pub fn remembered_choice(&self, property: &str, value: &str) -> bool {
        self.remembered_choices.as_ref().is_some_and(|choices| {
            choices
                .iter()
                .any(|choice| choice.property == property && choice.includes(value))
        })
    }

    /// Drops transient data before the game is written out.
    pub fn prepare_for_write(&mut self) {
        self.playtime_2weeks = None;
        if let Some(children) = self.children.as_mut() {
            children.iter_mut().for_each(Game::prepare_for_write);
        }
        if self.children.as_ref().is_some_and(Vec::is_empty) {
            self.children = None;
        }
    }
}

pub fn map_from_games(games: impl IntoIterator<Item = Game>) -> GameMap {
    games.into_iter().map(|game| (game.appid, game)).collect()
}
