//! UTC day-number arithmetic and timestamps (no chrono dependency).
//!
//! A day number counts days since 1970-01-01 UTC. All due-date math uses day
//! numbers so that schedules never drift with the local timezone. Conversion
//! uses Howard Hinnant's `days_from_civil` / `civil_from_days` algorithms.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::SECS_PER_DAY;
use crate::error::{CoreError, Result};

/// Days since the Unix epoch (UTC).
pub type DayNumber = i64;

/// Source of "now" for everything that stamps or schedules.
pub trait Clock {
    /// Current UTC time as Unix seconds.
    fn now_unix_secs(&self) -> u64;

    /// Current UTC time as Unix milliseconds (rating log resolution).
    fn now_unix_millis(&self) -> u64 {
        self.now_unix_secs() * 1000
    }

    fn today(&self) -> DayNumber {
        day_from_unix_secs(self.now_unix_secs())
    }

    fn now_iso8601(&self) -> String {
        unix_to_iso8601(self.now_unix_secs())
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        now_unix_secs()
    }

    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Clock pinned to a single instant; tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    pub secs: u64,
}

impl FixedClock {
    pub fn new(secs: u64) -> Self {
        Self { secs }
    }

    /// Noon UTC on the given day number.
    pub fn at_day(day: DayNumber) -> Self {
        let secs = day.max(0) as u64 * SECS_PER_DAY + SECS_PER_DAY / 2;
        Self { secs }
    }

    pub fn advance_days(&mut self, days: u64) {
        self.secs += days * SECS_PER_DAY;
    }
}

impl Clock for FixedClock {
    fn now_unix_secs(&self) -> u64 {
        self.secs
    }
}

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current UTC timestamp in ISO-8601 format.
pub fn now_iso8601() -> String {
    unix_to_iso8601(now_unix_secs())
}

/// Convert Unix seconds to ISO-8601 UTC string.
pub fn unix_to_iso8601(secs: u64) -> String {
    let days = (secs / SECS_PER_DAY) as i64;
    let time_of_day = secs % SECS_PER_DAY;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

pub fn day_from_unix_secs(secs: u64) -> DayNumber {
    (secs / SECS_PER_DAY) as i64
}

/// Parse the `YYYY-MM-DD` prefix of an ISO date or timestamp into a day number.
pub fn day_number(iso: &str) -> Result<DayNumber> {
    let invalid = || CoreError::InvalidDate(iso.to_string());

    let date = iso.get(..10).ok_or_else(invalid)?;
    let mut parts = date.split('-');
    let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    if y.len() != 4 || m.len() != 2 || d.len() != 2 {
        return Err(invalid());
    }
    let y: i64 = y.parse().map_err(|_| invalid())?;
    let m: u32 = m.parse().map_err(|_| invalid())?;
    let d: u32 = d.parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&m) || d == 0 || d > days_in_month(y, m) {
        return Err(invalid());
    }
    if iso.len() > 10 && !iso[10..].starts_with('T') {
        return Err(invalid());
    }
    Ok(days_from_civil(y, m, d))
}

/// ISO date (`YYYY-MM-DD`) of a day number; the key of daily counters.
pub fn iso_date(day: DayNumber) -> String {
    let (y, m, d) = civil_from_days(day);
    format!("{y:04}-{m:02}-{d:02}")
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

fn days_in_month(y: i64, m: u32) -> u32 {
    match m {
        2 if is_leap(y) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Howard Hinnant's days_from_civil: (year, month, day) → Unix epoch days.
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = ((m + 9) % 12) as u64;
    let doy = (153 * mp + 2) / 5 + d as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
