use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_NEW_PER_DAY, DEFAULT_REVIEWS_PER_DAY, MAX_NEW_PER_DAY, MAX_REVIEWS_PER_DAY,
};

/// User-configured daily caps. Deserializing always clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SettingsRecord")]
pub struct Settings {
    pub new_per_day: u32,
    pub reviews_per_day: u32,
}

/// Settings as found on the wire, before clamping.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRecord {
    #[serde(default = "default_new_per_day")]
    new_per_day: i64,
    #[serde(default = "default_reviews_per_day")]
    reviews_per_day: i64,
}

impl From<SettingsRecord> for Settings {
    fn from(r: SettingsRecord) -> Self {
        let narrow = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
        Settings::clamped(narrow(r.new_per_day), narrow(r.reviews_per_day))
    }
}

fn default_new_per_day() -> i64 {
    i64::from(DEFAULT_NEW_PER_DAY)
}

fn default_reviews_per_day() -> i64 {
    i64::from(DEFAULT_REVIEWS_PER_DAY)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            new_per_day: DEFAULT_NEW_PER_DAY,
            reviews_per_day: DEFAULT_REVIEWS_PER_DAY,
        }
    }
}

impl Settings {
    /// Caps clamped into their accepted ranges.
    pub fn clamped(new_per_day: u32, reviews_per_day: u32) -> Self {
        Self {
            new_per_day: new_per_day.min(MAX_NEW_PER_DAY),
            reviews_per_day: reviews_per_day.min(MAX_REVIEWS_PER_DAY),
        }
    }

    /// Combined daily ceiling. Approximate: both pools share one budget.
    pub fn daily_max(&self) -> u32 {
        self.new_per_day.saturating_add(self.reviews_per_day)
    }
}
