//! Field-by-field merge of a snapshot game into the stored game.
//!
//! Every field of [`Game`] is listed in [`GameField::ALL`] with a policy:
//!
//! | Policy     | Fields                                                        |
//! |------------|---------------------------------------------------------------|
//! | `Trusted`  | `totalPlaytime`, `lastPlayed`                                 |
//! | `Excluded` | `appid`, `playtimeHistory`, `children`, `rememberedChoices`,  |
//! |            | `playtime2Weeks`                                              |
//! | `Prompted` | everything else                                               |
//!
//! Values are compared through a canonical string rendering. That rendering is
//! also what gets remembered when the user declines an update, so the same
//! incoming value never triggers the same question twice.

use tracing::debug;

use crate::game::Game;
use crate::prompt::Prompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Always overwritten; these are re-derived on every run.
    Trusted,
    /// Overwritten only after the user agrees.
    Prompted,
    /// Never touched by the property merge.
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameField {
    Appid,
    Name,
    TotalPlaytime,
    PlaytimeHistory,
    PlaytimeOffset,
    LastPlayed,
    Spent,
    FullPrice,
    PurchaseDate,
    Gift,
    PartOfBundle,
    Ignored,
    Rating,
    Tags,
    IconUrl,
    LogoUrl,
    Keep,
    Source,
    Children,
    RememberedChoices,
    Playtime2Weeks,
}

impl GameField {
    pub const ALL: [GameField; 21] = [
        GameField::Appid,
        GameField::Name,
        GameField::TotalPlaytime,
        GameField::PlaytimeHistory,
        GameField::PlaytimeOffset,
        GameField::LastPlayed,
        GameField::Spent,
        GameField::FullPrice,
        GameField::PurchaseDate,
        GameField::Gift,
        GameField::PartOfBundle,
        GameField::Ignored,
        GameField::Rating,
        GameField::Tags,
        GameField::IconUrl,
        GameField::LogoUrl,
        GameField::Keep,
        GameField::Source,
        GameField::Children,
        GameField::RememberedChoices,
        GameField::Playtime2Weeks,
    ];

    /// Document key of the field, also used as the remembered-choice property.
    pub fn key(self) -> &'static str {
        match self {
            GameField::Appid => "appid",
            GameField::Name => "name",
            GameField::TotalPlaytime => "totalPlaytime",
            GameField::PlaytimeHistory => "playtimeHistory",
            GameField::PlaytimeOffset => "playtimeOffset",
            GameField::LastPlayed => "lastPlayed",
            GameField::Spent => "spent",
            GameField::FullPrice => "fullPrice",
            GameField::PurchaseDate => "purchaseDate",
            GameField::Gift => "gift",
            GameField::PartOfBundle => "partOfBundle",
            GameField::Ignored => "ignored",
            GameField::Rating => "rating",
            GameField::Tags => "tags",
            GameField::IconUrl => "iconURL",
            GameField::LogoUrl => "logoURL",
            GameField::Keep => "keep",
            GameField::Source => "source",
            GameField::Children => "children",
            GameField::RememberedChoices => "rememberedChoices",
            GameField::Playtime2Weeks => "playtime2Weeks",
        }
    }

    pub fn policy(self) -> FieldPolicy {
        match self {
            GameField::TotalPlaytime | GameField::LastPlayed => FieldPolicy::Trusted,
            // playtime2Weeks only feeds the allocator for the current run.
            GameField::Appid
            | GameField::PlaytimeHistory
            | GameField::Children
            | GameField::RememberedChoices
            | GameField::Playtime2Weeks => FieldPolicy::Excluded,
            _ => FieldPolicy::Prompted,
        }
    }

    /// Canonical rendering of the field's value, `None` when unset.
    pub fn render(self, game: &Game) -> Option<String> {
        match self {
            GameField::Appid => Some(game.appid.to_string()),
            GameField::Name => Some(game.name.clone()),
            GameField::TotalPlaytime => Some(game.total_playtime.to_string()),
            GameField::PlaytimeOffset => game.playtime_offset.map(|v| v.to_string()),
            GameField::LastPlayed => game.last_played.map(|v| v.to_rfc3339()),
            GameField::Spent => game.spent.map(|v| v.to_string()),
            GameField::FullPrice => game.full_price.map(|v| v.to_string()),
            GameField::PurchaseDate => game.purchase_date.map(|v| v.to_string()),
            GameField::Gift => game.gift.map(|v| v.to_string()),
            GameField::PartOfBundle => game.part_of_bundle.map(|v| v.to_string()),
            GameField::Ignored => game.ignored.map(|v| v.to_string()),
            GameField::Rating => game.rating.map(|v| v.to_string()),
            GameField::Tags => game.tags.as_ref().map(|tags| tags.join(",")),
            GameField::IconUrl => game.icon_url.clone(),
            GameField::LogoUrl => Some(game.logo_url.clone()),
            GameField::Keep => game.keep.map(|v| v.to_string()),
            GameField::Source => game.source.clone(),
            GameField::PlaytimeHistory
            | GameField::Children
            | GameField::RememberedChoices
            | GameField::Playtime2Weeks => None,
        }
    }

    fn copy(self, from: &Game, to: &mut Game) {
        match self {
            GameField::Name => to.name = from.name.clone(),
            GameField::TotalPlaytime => to.total_playtime = from.total_playtime,
            GameField::PlaytimeOffset => to.playtime_offset = from.playtime_offset,
            GameField::LastPlayed => to.last_played = from.last_played,
            GameField::Spent => to.spent = from.spent,
            GameField::FullPrice => to.full_price = from.full_price,
            GameField::PurchaseDate => to.purchase_date = from.purchase_date,
            GameField::Gift => to.gift = from.gift,
            GameField::PartOfBundle => to.part_of_bundle = from.part_of_bundle,
            GameField::Ignored => to.ignored = from.ignored,
            GameField::Rating => to.rating = from.rating,
            GameField::Tags => to.tags = from.tags.clone(),
            GameField::IconUrl => to.icon_url = from.icon_url.clone(),
            GameField::LogoUrl => to.logo_url = from.logo_url.clone(),
            GameField::Keep => to.keep = from.keep,
            GameField::Source => to.source = from.source.clone(),
            GameField::Appid
            | GameField::PlaytimeHistory
            | GameField::Children
            | GameField::RememberedChoices
            | GameField::Playtime2Weeks => {}
        }
    }
}

/// Merges the scalar fields of `incoming` into `existing`.
///
/// Returns the keys of the fields that changed.
pub fn reconcile_properties(
    incoming: &Game,
    existing: &mut Game,
    prompter: &mut dyn Prompter,
) -> Vec<&'static str> {
    let mut updated = Vec::new();

    for field in GameField::ALL {
        let policy = field.policy();
        if policy == FieldPolicy::Excluded {
            continue;
        }
        let Some(new_value) = field.render(incoming) else {
            continue;
        };

        let old_value = match field.render(existing) {
            None => {
                field.copy(incoming, existing);
                updated.push(field.key());
                continue;
            }
            Some(old_value) if old_value == new_value => continue,
            Some(old_value) => old_value,
        };

        if policy == FieldPolicy::Trusted {
            field.copy(incoming, existing);
            updated.push(field.key());
            continue;
        }

        if existing.remembered_choice(field.key(), &new_value) {
            debug!(
                appid = existing.appid,
                field = field.key(),
                "Skipping previously declined value"
            );
            continue;
        }

        let question = format!(
            "Would you like to update the {} property of {} from \"{}\" to \"{}\"?",
            field.key(),
            existing.name,
            old_value,
            new_value
        );
        if prompter.confirm(&question) {
            field.copy(incoming, existing);
            updated.push(field.key());
        } else {
            existing.remember_choice(field.key(), &new_value);
        }
    }

    updated
}
