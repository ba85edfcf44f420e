use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_EASE, MAX_EASE, MIN_EASE};
use crate::error::CoreError;
use crate::time::{Clock, DayNumber, day_number};

/// Two-state lifecycle: `New` until the first rating, `Review` forever after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    New,
    Review,
}

impl CardState {
    pub fn as_str(self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Review => "review",
        }
    }
}

/// The scheduling half of a card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub due: DayNumber,
    pub interval: u32,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    pub state: CardState,
}

impl Schedule {
    /// Schedule of a card created on `today`: due immediately, never rated.
    pub fn fresh(today: DayNumber) -> Self {
        Self {
            due: today,
            interval: 0,
            ease: DEFAULT_EASE,
            reps: 0,
            lapses: 0,
            state: CardState::New,
        }
    }
}

/// Flat, persisted shape of a card. Converting it into a [`Card`] checks the
/// card invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: Uuid,
    pub note_id: Uuid,
    pub deck_id: Uuid,
    pub due: DayNumber,
    pub interval: u32,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    pub state: CardState,
    pub created_at: String,
    pub updated_at: String,
}

/// One schedulable unit, paired one-to-one with a note.
///
/// Scheduling fields are private: they change only through the scheduler, so a
/// `Card` value always satisfies
/// - `ease` within `[MIN_EASE, MAX_EASE]`
/// - `interval == 0` exactly while `state == New`
/// - `due` not before the day the card was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CardRecord", into = "CardRecord")]
pub struct Card {
    id: Uuid,
    note_id: Uuid,
    deck_id: Uuid,
    schedule: Schedule,
    created_at: String,
    updated_at: String,
}

impl Card {
    pub fn new(note_id: Uuid, deck_id: Uuid, clock: &impl Clock) -> Self {
        let now = clock.now_iso8601();
        Self {
            id: Uuid::new_v4(),
            note_id,
            deck_id,
            schedule: Schedule::fresh(clock.today()),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn note_id(&self) -> Uuid {
        self.note_id
    }

    pub fn deck_id(&self) -> Uuid {
        self.deck_id
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn due(&self) -> DayNumber {
        self.schedule.due
    }

    pub fn interval(&self) -> u32 {
        self.schedule.interval
    }

    pub fn ease(&self) -> f64 {
        self.schedule.ease
    }

    pub fn reps(&self) -> u32 {
        self.schedule.reps
    }

    pub fn lapses(&self) -> u32 {
        self.schedule.lapses
    }

    pub fn state(&self) -> CardState {
        self.schedule.state
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    pub fn is_new(&self) -> bool {
        self.schedule.state == CardState::New
    }

    /// Eligible on `today` regardless of state.
    pub fn is_due(&self, today: DayNumber) -> bool {
        self.schedule.due <= today
    }

    /// A review card whose due day has arrived.
    pub fn is_review_due(&self, today: DayNumber) -> bool {
        self.schedule.state == CardState::Review && self.schedule.due <= today
    }

    pub(crate) fn set_schedule(&mut self, schedule: Schedule, updated_at: String) {
        self.schedule = schedule;
        self.updated_at = updated_at;
    }

    /// Move with the note to another deck; the schedule is kept.
    pub(crate) fn move_to_deck(&mut self, deck_id: Uuid, updated_at: String) {
        self.deck_id = deck_id;
        self.updated_at = updated_at;
    }

    pub fn to_record(&self) -> CardRecord {
        CardRecord::from(self.clone())
    }
}

impl TryFrom<CardRecord> for Card {
    type Error = CoreError;

    fn try_from(r: CardRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: String| CoreError::InvalidCard { id: r.id, reason };

        if !r.ease.is_finite() || r.ease < MIN_EASE || r.ease > MAX_EASE {
            return Err(invalid(format!(
                "ease {} outside [{MIN_EASE}, {MAX_EASE}]",
                r.ease
            )));
        }
        match r.state {
            CardState::New if r.interval != 0 || r.reps != 0 || r.lapses != 0 => {
                return Err(invalid(format!(
                    "new card carries review history (interval {}, reps {}, lapses {})",
                    r.interval, r.reps, r.lapses
                )));
            }
            CardState::Review if r.interval == 0 => {
                return Err(invalid("review card with zero interval".to_string()));
            }
            _ => {}
        }
        let created_day = day_number(&r.created_at)
            .map_err(|_| invalid(format!("bad createdAt '{}'", r.created_at)))?;
        if r.due < created_day {
            return Err(invalid(format!(
                "due day {} precedes creation day {created_day}",
                r.due
            )));
        }

        Ok(Card {
            id: r.id,
            note_id: r.note_id,
            deck_id: r.deck_id,
            schedule: Schedule {
                due: r.due,
                interval: r.interval,
                ease: r.ease,
                reps: r.reps,
                lapses: r.lapses,
                state: r.state,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

impl From<Card> for CardRecord {
    fn from(c: Card) -> Self {
        CardRecord {
            id: c.id,
            note_id: c.note_id,
            deck_id: c.deck_id,
            due: c.schedule.due,
            interval: c.schedule.interval,
            ease: c.schedule.ease,
            reps: c.schedule.reps,
            lapses: c.schedule.lapses,
            state: c.schedule.state,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{FixedClock, iso_date};

    fn record(state: CardState, interval: u32, reps: u32) -> CardRecord {
        CardRecord {
            id: Uuid::new_v4(),
            note_id: Uuid::new_v4(),
            deck_id: Uuid::new_v4(),
            due: 120,
            interval,
            ease: 2.5,
            reps,
            lapses: 0,
            state,
            created_at: format!("{}T08:00:00Z", iso_date(100)),
            updated_at: format!("{}T08:00:00Z", iso_date(110)),
        }
    }

    #[test]
    fn test_new_card_defaults() {
        let clock = FixedClock::at_day(100);
        let card = Card::new(Uuid::new_v4(), Uuid::new_v4(), &clock);
        assert_eq!(card.due(), 100);
        assert_eq!(card.interval(), 0);
        assert_eq!(card.ease(), DEFAULT_EASE);
        assert_eq!(card.reps(), 0);
        assert_eq!(card.lapses(), 0);
        assert!(card.is_new());
        assert!(card.is_due(100));
        assert!(!card.is_review_due(100));
        assert_eq!(card.created_at(), card.updated_at());
    }

    #[test]
    fn test_valid_record_converts() {
        let card = Card::try_from(record(CardState::Review, 6, 2)).unwrap();
        assert_eq!(card.interval(), 6);
        assert!(card.is_review_due(120));
        assert!(!card.is_review_due(119));
    }

    #[test]
    fn test_ease_out_of_range_rejected() {
        for ease in [1.0, 3.0, f64::NAN] {
            let mut r = record(CardState::Review, 6, 2);
            r.ease = ease;
            assert!(matches!(
                Card::try_from(r),
                Err(CoreError::InvalidCard { .. })
            ));
        }
    }

    #[test]
    fn test_review_with_zero_interval_rejected() {
        assert!(Card::try_from(record(CardState::Review, 0, 3)).is_err());
    }

    #[test]
    fn test_new_with_history_rejected() {
        assert!(Card::try_from(record(CardState::New, 4, 0)).is_err());
        assert!(Card::try_from(record(CardState::New, 0, 1)).is_err());
    }

    #[test]
    fn test_due_before_creation_rejected() {
        let mut r = record(CardState::Review, 1, 1);
        r.due = 99;
        assert!(Card::try_from(r).is_err());
    }

    #[test]
    fn test_serde_goes_through_validation() {
        let card = Card::try_from(record(CardState::Review, 6, 2)).unwrap();
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"noteId\""));
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);

        let broken = json.replace("\"ease\":2.5", "\"ease\":9.0");
        assert!(serde_json::from_str::<Card>(&broken).is_err());
    }
}
