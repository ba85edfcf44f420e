//! Per-day study counters and the combined daily quota.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rating::Rating;
use crate::settings::Settings;
use crate::time::{DayNumber, iso_date};

/// Reviews done on one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub again: u32,
    #[serde(default)]
    pub hard: u32,
    #[serde(default)]
    pub good: u32,
    #[serde(default)]
    pub easy: u32,
}

impl DailyCounter {
    pub fn record(&mut self, rating: Rating) {
        self.total = self.total.saturating_add(1);
        let slot = match rating {
            Rating::Again => &mut self.again,
            Rating::Hard => &mut self.hard,
            Rating::Good => &mut self.good,
            Rating::Easy => &mut self.easy,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn count(&self, rating: Rating) -> u32 {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }
}

/// Quota snapshot for display and queue building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyLimits {
    pub studied: u32,
    pub max: u32,
    pub remaining: u32,
}

impl DailyLimits {
    pub fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Counters keyed by ISO date. Entries are created on first use and never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyTracker {
    days: BTreeMap<String, DailyCounter>,
}

impl DailyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one rating on `day`; returns the updated counter.
    pub fn record(&mut self, day: DayNumber, rating: Rating) -> DailyCounter {
        let counter = self.days.entry(iso_date(day)).or_default();
        counter.record(rating);
        *counter
    }

    pub fn get(&self, day: DayNumber) -> DailyCounter {
        self.get_by_key(&iso_date(day))
    }

    pub fn get_by_key(&self, key: &str) -> DailyCounter {
        self.days.get(key).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, key: String, counter: DailyCounter) {
        self.days.insert(key, counter);
    }

    pub fn studied_on(&self, day: DayNumber) -> u32 {
        self.get(day).total
    }

    /// `remaining = max(0, newPerDay + reviewsPerDay - studied)`.
    pub fn limits(&self, day: DayNumber, settings: &Settings) -> DailyLimits {
        let studied = self.studied_on(day);
        let max = settings.daily_max();
        DailyLimits {
            studied,
            max,
            remaining: max.saturating_sub(studied),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DailyCounter)> {
        self.days.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creates_lazily() {
        let mut tracker = DailyTracker::new();
        assert!(tracker.is_empty());
        assert_eq!(tracker.studied_on(10), 0);

        tracker.record(10, Rating::Good);
        tracker.record(10, Rating::Again);
        let c = tracker.record(10, Rating::Good);

        assert_eq!(c.total, 3);
        assert_eq!(c.count(Rating::Good), 2);
        assert_eq!(c.count(Rating::Again), 1);
        assert_eq!(c.count(Rating::Easy), 0);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get_by_key("1970-01-11"), c);
    }

    #[test]
    fn test_days_are_independent() {
        let mut tracker = DailyTracker::new();
        tracker.record(10, Rating::Hard);
        tracker.record(11, Rating::Easy);
        assert_eq!(tracker.studied_on(10), 1);
        assert_eq!(tracker.studied_on(11), 1);
        assert_eq!(tracker.studied_on(12), 0);
    }

    #[test]
    fn test_limits() {
        let mut tracker = DailyTracker::new();
        let settings = Settings {
            new_per_day: 2,
            reviews_per_day: 1,
        };
        assert_eq!(
            tracker.limits(5, &settings),
            DailyLimits {
                studied: 0,
                max: 3,
                remaining: 3
            }
        );

        for _ in 0..4 {
            tracker.record(5, Rating::Good);
        }
        let limits = tracker.limits(5, &settings);
        assert_eq!(limits.studied, 4);
        assert_eq!(limits.remaining, 0);
        assert!(limits.exhausted());
    }

    #[test]
    fn test_zero_caps_exhaust_immediately() {
        let tracker = DailyTracker::new();
        let settings = Settings {
            new_per_day: 0,
            reviews_per_day: 0,
        };
        assert!(tracker.limits(1, &settings).exhausted());
    }

    #[test]
    fn test_counter_saturates() {
        let mut c = DailyCounter {
            total: u32::MAX,
            again: u32::MAX,
            ..DailyCounter::default()
        };
        c.record(Rating::Again);
        assert_eq!(c.total, u32::MAX);
        assert_eq!(c.again, u32::MAX);
    }

    #[test]
    fn test_serializes_as_date_map() {
        let mut tracker = DailyTracker::new();
        tracker.record(0, Rating::Easy);
        let json = serde_json::to_string(&tracker).unwrap();
        assert_eq!(
            json,
            r#"{"1970-01-01":{"total":1,"again":0,"hard":0,"good":0,"easy":1}}"#
        );
    }
}
