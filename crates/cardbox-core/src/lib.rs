//! Spaced-repetition scheduling engine.
//!
//! Cards carry an SM-2 style schedule (ease, interval, due day). Ratings move
//! them forward, a daily quota caps how much is studied per UTC day, and a
//! review session walks a queue built from due and new cards.
//!
//! Zero I/O: time comes in through [`Clock`], persistence lives in
//! `cardbox-store`.

pub mod bulk;
pub mod card;
pub mod collection;
pub mod constants;
pub mod daily;
pub mod error;
pub mod note;
pub mod queue;
pub mod rating;
pub mod scheduler;
pub mod serde_compat;
pub mod session;
pub mod settings;
pub mod time;

pub use bulk::{BulkPair, BulkParse, parse_bulk_lines};
pub use card::{Card, CardRecord, CardState, Schedule};
pub use collection::{COLLECTION_VERSION, Collection, DEFAULT_DECK_NAME};
pub use constants::{DEFAULT_EASE, MAX_EASE, MIN_EASE};
pub use daily::{DailyCounter, DailyLimits, DailyTracker};
pub use error::{CoreError, Result};
pub use note::{Deck, Note, NoteDraft, normalize_tags};
pub use queue::{BuiltQueue, Counts, QueueReason, Scope, build_queue, compute_counts};
pub use rating::Rating;
pub use scheduler::{
    RatingEvent, apply_rating, format_interval, next_ease, next_schedule, preview_intervals,
};
pub use serde_compat::{APP_VERSION, ExportPayload, export_json, import_json};
pub use session::{Face, ReviewSession, SessionState};
pub use settings::Settings;
pub use time::{Clock, DayNumber, FixedClock, SystemClock, day_number, iso_date};
