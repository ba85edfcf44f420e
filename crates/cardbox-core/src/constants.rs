/// Lower bound for the ease factor.
pub const MIN_EASE: f64 = 1.3;

/// Upper bound for the ease factor.
pub const MAX_EASE: f64 = 2.8;

/// Ease factor assigned to freshly created cards.
pub const DEFAULT_EASE: f64 = 2.5;

/// Interval multiplier for a `hard` rating on a mature card.
pub const HARD_MULTIPLIER: f64 = 1.2;

/// Extra multiplier on top of the ease for an `easy` rating on a mature card.
pub const EASY_BONUS: f64 = 1.3;

/// First rating: interval for `easy`; every other passing grade gets 1 day.
pub const FIRST_EASY_INTERVAL: u32 = 4;

/// Second rating intervals.
pub const SECOND_EASY_INTERVAL: u32 = 8;
pub const SECOND_GOOD_INTERVAL: u32 = 6;
pub const SECOND_HARD_INTERVAL: u32 = 4;

/// Default daily cap on new cards entering a queue.
pub const DEFAULT_NEW_PER_DAY: u32 = 20;

/// Default daily cap on due review cards entering a queue.
pub const DEFAULT_REVIEWS_PER_DAY: u32 = 200;

/// Upper bounds accepted for the daily caps.
pub const MAX_NEW_PER_DAY: u32 = 999;
pub const MAX_REVIEWS_PER_DAY: u32 = 9999;

/// Seconds in one UTC day.
pub const SECS_PER_DAY: u64 = 86_400;
