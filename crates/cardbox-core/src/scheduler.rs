//! SM-2 derived interval and ease updates.
//!
//! The numeric contract is fixed for compatibility with existing collections:
//!
//! ```text
//! q     = again 1 | hard 3 | good 4 | easy 5
//! ease' = clamp(ease + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), 1.3, 2.8)
//!
//! again             -> 1 (lapse)
//! first rating      -> easy 4, otherwise 1
//! second rating     -> easy 8, hard 4, good 6
//! later ratings     -> hard  round(interval * 1.2)
//!                      good  round(interval * ease')
//!                      easy  round(interval * ease' * 1.3)      (min 1)
//! ```
//!
//! `reps` grows on every rating including `again`; lapses reset the interval
//! but neither `reps` nor the ease floor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::card::{Card, CardState, Schedule};
use crate::constants::{
    EASY_BONUS, FIRST_EASY_INTERVAL, HARD_MULTIPLIER, MAX_EASE, MIN_EASE, SECOND_EASY_INTERVAL,
    SECOND_GOOD_INTERVAL, SECOND_HARD_INTERVAL,
};
use crate::rating::Rating;
use crate::time::{Clock, DayNumber};

/// Audit record of one scheduling transition. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEvent {
    pub id: Uuid,
    pub card_id: Uuid,
    /// Unix milliseconds.
    pub ts: u64,
    pub rating: Rating,
    pub prev_due: DayNumber,
    pub new_due: DayNumber,
    pub prev_interval: u32,
    pub new_interval: u32,
    pub prev_ease: f64,
    pub new_ease: f64,
}

/// Ease after a rating, clamped to `[MIN_EASE, MAX_EASE]`.
pub fn next_ease(ease: f64, rating: Rating) -> f64 {
    let miss = 5.0 - f64::from(rating.quality());
    let ease = ease + (0.1 - miss * (0.08 + miss * 0.02));
    ease.clamp(MIN_EASE, MAX_EASE)
}

/// Schedule a card will have after `rating` is applied on `today`.
pub fn next_schedule(current: &Schedule, rating: Rating, today: DayNumber) -> Schedule {
    let ease = next_ease(current.ease, rating);
    let lapses = if rating == Rating::Again {
        current.lapses.saturating_add(1)
    } else {
        current.lapses
    };

    let interval = match rating {
        Rating::Again => 1,
        _ if current.reps == 0 => {
            if rating == Rating::Easy {
                FIRST_EASY_INTERVAL
            } else {
                1
            }
        }
        _ if current.reps == 1 => match rating {
            Rating::Easy => SECOND_EASY_INTERVAL,
            Rating::Hard => SECOND_HARD_INTERVAL,
            _ => SECOND_GOOD_INTERVAL,
        },
        Rating::Hard => scaled(f64::from(current.interval) * HARD_MULTIPLIER),
        Rating::Good => scaled(f64::from(current.interval) * ease),
        Rating::Easy => scaled(f64::from(current.interval) * ease * EASY_BONUS),
    };

    Schedule {
        due: today + i64::from(interval),
        interval,
        ease,
        reps: current.reps.saturating_add(1),
        lapses,
        state: CardState::Review,
    }
}

fn scaled(days: f64) -> u32 {
    (days.round() as u32).max(1)
}

/// Apply `rating` to `card` on the clock's current day and return the log
/// entry describing the transition.
pub fn apply_rating(card: &mut Card, rating: Rating, clock: &impl Clock) -> RatingEvent {
    let before = *card.schedule();
    let after = next_schedule(&before, rating, clock.today());
    card.set_schedule(after, clock.now_iso8601());

    RatingEvent {
        id: Uuid::new_v4(),
        card_id: card.id(),
        ts: clock.now_unix_millis(),
        rating,
        prev_due: before.due,
        new_due: after.due,
        prev_interval: before.interval,
        new_interval: after.interval,
        prev_ease: before.ease,
        new_ease: after.ease,
    }
}

/// Interval each rating would produce, in `Rating::ALL` order.
pub fn preview_intervals(card: &Card, today: DayNumber) -> [u32; 4] {
    Rating::ALL.map(|r| next_schedule(card.schedule(), r, today).interval)
}

/// Compact human label for an interval in days ("1d", "3w", "2mo", "1y").
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{days}d"),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardRecord;
    use crate::time::{FixedClock, iso_date};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn fresh() -> Schedule {
        Schedule::fresh(0)
    }

    fn reviewed(reps: u32, interval: u32, ease: f64) -> Schedule {
        Schedule {
            due: 0,
            interval,
            ease,
            reps,
            lapses: 0,
            state: CardState::Review,
        }
    }

    fn card_with(schedule: Schedule) -> Card {
        Card::try_from(CardRecord {
            id: Uuid::new_v4(),
            note_id: Uuid::new_v4(),
            deck_id: Uuid::new_v4(),
            due: schedule.due,
            interval: schedule.interval,
            ease: schedule.ease,
            reps: schedule.reps,
            lapses: schedule.lapses,
            state: schedule.state,
            created_at: format!("{}T00:00:00Z", iso_date(schedule.due.min(0))),
            updated_at: format!("{}T00:00:00Z", iso_date(schedule.due.min(0))),
        })
        .unwrap()
    }

    #[test]
    fn test_new_card_good_on_day_100() {
        let clock = FixedClock::at_day(100);
        let mut card = Card::new(Uuid::new_v4(), Uuid::new_v4(), &clock);
        let event = apply_rating(&mut card, Rating::Good, &clock);

        assert_eq!(card.interval(), 1);
        assert_eq!(card.due(), 101);
        assert_eq!(card.reps(), 1);
        assert_eq!(card.state(), CardState::Review);
        assert_relative_eq!(card.ease(), 2.5);

        assert_eq!(event.card_id, card.id());
        assert_eq!(event.prev_due, 100);
        assert_eq!(event.new_due, 101);
        assert_eq!(event.prev_interval, 0);
        assert_eq!(event.new_interval, 1);
        assert_eq!(event.ts, clock.secs * 1000);
        assert_eq!(card.updated_at(), clock.now_iso8601());
    }

    #[test]
    fn test_new_card_easy_on_day_100() {
        let clock = FixedClock::at_day(100);
        let mut card = Card::new(Uuid::new_v4(), Uuid::new_v4(), &clock);
        apply_rating(&mut card, Rating::Easy, &clock);

        assert_eq!(card.interval(), 4);
        assert_eq!(card.due(), 104);
        assert_relative_eq!(card.ease(), 2.6);
    }

    #[test]
    fn test_second_rating_hard_override() {
        let s = next_schedule(&reviewed(1, 6, 2.5), Rating::Hard, 200);
        assert_eq!(s.interval, 4);
        assert_eq!(s.due, 204);
        assert_relative_eq!(s.ease, 2.36);
    }

    #[test]
    fn test_second_rating_good_and_easy() {
        assert_eq!(next_schedule(&reviewed(1, 1, 2.5), Rating::Good, 0).interval, 6);
        assert_eq!(next_schedule(&reviewed(1, 1, 2.5), Rating::Easy, 0).interval, 8);
    }

    #[test]
    fn test_lapse_resets_interval() {
        let mut s = reviewed(5, 10, 2.5);
        s.lapses = 2;
        let next = next_schedule(&s, Rating::Again, 50);

        assert_eq!(next.interval, 1);
        assert_eq!(next.due, 51);
        assert_eq!(next.lapses, 3);
        assert_eq!(next.reps, 6);
        assert_relative_eq!(next.ease, 1.96);
    }

    #[test]
    fn test_counters_saturate() {
        let mut s = reviewed(u32::MAX, 10, 2.5);
        s.lapses = u32::MAX;
        let next = next_schedule(&s, Rating::Again, 0);
        assert_eq!(next.reps, u32::MAX);
        assert_eq!(next.lapses, u32::MAX);
    }

    #[test]
    fn test_first_rating_hard_and_again() {
        assert_eq!(next_schedule(&fresh(), Rating::Hard, 0).interval, 1);
        let again = next_schedule(&fresh(), Rating::Again, 0);
        assert_eq!(again.interval, 1);
        assert_eq!(again.lapses, 1);
        assert_eq!(again.state, CardState::Review);
    }

    #[test]
    fn test_mature_growth() {
        let s = reviewed(5, 10, 2.5);
        assert_eq!(next_schedule(&s, Rating::Hard, 0).interval, 12);
        assert_eq!(next_schedule(&s, Rating::Good, 0).interval, 25);
        // 10 * 2.6 * 1.3 = 33.8
        assert_eq!(next_schedule(&s, Rating::Easy, 0).interval, 34);
    }

    #[test]
    fn test_mature_hard_rounds_and_floors() {
        // 1 * 1.2 rounds down to 1
        assert_eq!(next_schedule(&reviewed(3, 1, 1.3), Rating::Hard, 0).interval, 1);
        // 3 * 1.2 = 3.6
        assert_eq!(next_schedule(&reviewed(3, 3, 1.3), Rating::Hard, 0).interval, 4);
    }

    #[test]
    fn test_ease_clamped() {
        assert_relative_eq!(next_ease(1.4, Rating::Again), MIN_EASE);
        assert_relative_eq!(next_ease(2.75, Rating::Easy), MAX_EASE);
        assert_relative_eq!(next_ease(2.5, Rating::Good), 2.5);
    }

    #[test]
    fn test_preview_intervals() {
        let card = card_with(reviewed(5, 10, 2.5));
        assert_eq!(preview_intervals(&card, 0), [1, 12, 25, 34]);
        // preview must not mutate
        assert_eq!(card.interval(), 10);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(6), "6d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(29), "4w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(400), "1y");
    }

    fn arb_schedule() -> impl Strategy<Value = Schedule> {
        prop_oneof![
            Just(fresh()),
            (1u32..200, 1u32..3650, 1.3f64..=2.8, 0u32..20, 0i64..100_000).prop_map(
                |(reps, interval, ease, lapses, due)| Schedule {
                    due,
                    interval,
                    ease,
                    reps,
                    lapses,
                    state: CardState::Review,
                }
            ),
        ]
    }

    fn arb_rating() -> impl Strategy<Value = Rating> {
        prop::sample::select(Rating::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_ease_stays_in_bounds(s in arb_schedule(), r in arb_rating(), today in 0i64..200_000) {
            let next = next_schedule(&s, r, today);
            prop_assert!(next.ease >= MIN_EASE && next.ease <= MAX_EASE);
        }

        #[test]
        fn prop_reps_grow_by_one(s in arb_schedule(), r in arb_rating(), today in 0i64..200_000) {
            prop_assert_eq!(next_schedule(&s, r, today).reps, s.reps + 1);
        }

        #[test]
        fn prop_due_is_today_plus_interval(s in arb_schedule(), r in arb_rating(), today in 0i64..200_000) {
            let next = next_schedule(&s, r, today);
            prop_assert!(next.interval >= 1);
            prop_assert_eq!(next.due, today + i64::from(next.interval));
            prop_assert_eq!(next.state, CardState::Review);
        }

        #[test]
        fn prop_again_is_a_lapse(s in arb_schedule(), today in 0i64..200_000) {
            let next = next_schedule(&s, Rating::Again, today);
            prop_assert_eq!(next.interval, 1);
            prop_assert_eq!(next.lapses, s.lapses + 1);
        }

        #[test]
        fn prop_passing_grades_keep_lapses(s in arb_schedule(), today in 0i64..200_000) {
            for r in [Rating::Hard, Rating::Good, Rating::Easy] {
                prop_assert_eq!(next_schedule(&s, r, today).lapses, s.lapses);
            }
        }
    }
}
