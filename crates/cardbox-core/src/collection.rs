//! In-memory card store: decks, notes, cards, the rating log, daily counters
//! and settings. Persistence belongs to the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bulk::BulkPair;
use crate::card::Card;
use crate::daily::{DailyLimits, DailyTracker};
use crate::error::{CoreError, Result};
use crate::note::{Deck, Note, NoteDraft};
use crate::queue::{BuiltQueue, Counts, Scope, build_queue, compute_counts};
use crate::rating::Rating;
use crate::scheduler::{RatingEvent, apply_rating};
use crate::settings::Settings;
use crate::time::{Clock, DayNumber};

pub const COLLECTION_VERSION: u32 = 1;

pub const DEFAULT_DECK_NAME: &str = "Default";

fn current_version() -> u32 {
    COLLECTION_VERSION
}

/// Everything a user owns. Cards are created and deleted together with their
/// note, which keeps exactly one card per note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub decks: Vec<Deck>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub log: Vec<RatingEvent>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub daily: DailyTracker,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            version: COLLECTION_VERSION,
            decks: Vec::new(),
            notes: Vec::new(),
            cards: Vec::new(),
            log: Vec::new(),
            settings: Settings::default(),
            daily: DailyTracker::new(),
        }
    }
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh collection with one deck and a demo note.
    pub fn seeded(clock: &impl Clock) -> Self {
        let mut collection = Self::new();
        collection.ensure_seed_data(clock);
        collection
    }

    /// Seed an empty collection. Returns whether anything was added.
    pub fn ensure_seed_data(&mut self, clock: &impl Clock) -> bool {
        if !self.decks.is_empty() {
            return false;
        }
        let deck = Deck::new(DEFAULT_DECK_NAME, clock);
        let deck_id = deck.id;
        self.decks.push(deck);
        self.insert_note(
            deck_id,
            "What is cardbox?".to_string(),
            "A spaced-repetition flashcard tool that keeps its data locally.".to_string(),
            vec!["demo".to_string()],
            clock,
        );
        true
    }

    /// Drop everything and start over with a seeded collection.
    pub fn reset(&mut self, clock: &impl Clock) {
        *self = Self::seeded(clock);
    }

    // --- Decks ---

    pub fn deck(&self, id: Uuid) -> Option<&Deck> {
        self.decks.iter().find(|d| d.id == id)
    }

    /// Resolve a deck by id, falling back to a case-insensitive name match.
    pub fn find_deck(&self, key: &str) -> Result<&Deck> {
        let key = key.trim();
        if let Ok(id) = Uuid::parse_str(key)
            && let Some(deck) = self.deck(id)
        {
            return Ok(deck);
        }
        let lowered = key.to_lowercase();
        self.decks
            .iter()
            .find(|d| d.name.to_lowercase() == lowered)
            .ok_or_else(|| CoreError::UnknownDeck(key.to_string()))
    }

    /// Decks ordered by name for listing.
    pub fn decks_by_name(&self) -> Vec<&Deck> {
        let mut decks: Vec<&Deck> = self.decks.iter().collect();
        decks.sort_by_key(|d| d.name.to_lowercase());
        decks
    }

    pub fn add_deck(&mut self, name: &str, clock: &impl Clock) -> Result<Uuid> {
        if name.trim().is_empty() {
            return Err(CoreError::EmptyName);
        }
        let deck = Deck::new(name, clock);
        let id = deck.id;
        self.decks.push(deck);
        Ok(id)
    }

    pub fn rename_deck(&mut self, id: Uuid, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::EmptyName);
        }
        let deck = self
            .decks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::UnknownDeck(id.to_string()))?;
        deck.name = name.to_string();
        Ok(())
    }

    /// Remove a deck with all of its notes and cards. The rating log and the
    /// daily counters keep their history.
    pub fn delete_deck(&mut self, id: Uuid) -> Result<Deck> {
        let pos = self
            .decks
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CoreError::UnknownDeck(id.to_string()))?;

        let note_ids: Vec<Uuid> = self
            .notes
            .iter()
            .filter(|n| n.deck_id == id)
            .map(|n| n.id)
            .collect();
        self.notes.retain(|n| n.deck_id != id);
        self.cards.retain(|c| !note_ids.contains(&c.note_id()));

        Ok(self.decks.remove(pos))
    }

    // --- Notes & cards ---

    pub fn note(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn card(&self, id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|c| c.id() == id)
    }

    pub fn card_by_note(&self, note_id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|c| c.note_id() == note_id)
    }

    /// Create (no id) or edit (with id) a note. A new note gets a new card due
    /// today; an edited note's card follows it to its deck and keeps its
    /// schedule. Returns the note id.
    pub fn upsert_note(&mut self, draft: NoteDraft, clock: &impl Clock) -> Result<Uuid> {
        let front = draft.front.trim();
        let back = draft.back.trim();
        if front.is_empty() {
            return Err(CoreError::EmptyField("front"));
        }
        if back.is_empty() {
            return Err(CoreError::EmptyField("back"));
        }
        if self.deck(draft.deck_id).is_none() {
            return Err(CoreError::UnknownDeck(draft.deck_id.to_string()));
        }

        let Some(note_id) = draft.id else {
            return Ok(self.insert_note(
                draft.deck_id,
                front.to_string(),
                back.to_string(),
                draft.tags,
                clock,
            ));
        };

        let now = clock.now_iso8601();
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or(CoreError::UnknownNote(note_id))?;
        note.deck_id = draft.deck_id;
        note.front = front.to_string();
        note.back = back.to_string();
        note.tags = draft.tags;
        note.updated_at = now.clone();

        if let Some(card) = self.cards.iter_mut().find(|c| c.note_id() == note_id) {
            card.move_to_deck(draft.deck_id, now);
        }
        Ok(note_id)
    }

    fn insert_note(
        &mut self,
        deck_id: Uuid,
        front: String,
        back: String,
        tags: Vec<String>,
        clock: &impl Clock,
    ) -> Uuid {
        let now = clock.now_iso8601();
        let note = Note {
            id: Uuid::new_v4(),
            deck_id,
            front,
            back,
            tags,
            created_at: now.clone(),
            updated_at: now,
        };
        let note_id = note.id;
        self.cards.push(Card::new(note_id, deck_id, clock));
        self.notes.push(note);
        note_id
    }

    /// Remove a note together with its card.
    pub fn delete_note(&mut self, id: Uuid) -> Result<Note> {
        let pos = self
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(CoreError::UnknownNote(id))?;
        self.cards.retain(|c| c.note_id() != id);
        Ok(self.notes.remove(pos))
    }

    /// Create one note per pair in `deck_id`. Returns how many were added.
    pub fn add_bulk(
        &mut self,
        deck_id: Uuid,
        pairs: &[BulkPair],
        tags: &[String],
        clock: &impl Clock,
    ) -> Result<usize> {
        let mut added = 0;
        for pair in pairs {
            self.upsert_note(
                NoteDraft {
                    id: None,
                    deck_id,
                    front: pair.front.clone(),
                    back: pair.back.clone(),
                    tags: tags.to_vec(),
                },
                clock,
            )?;
            added += 1;
        }
        Ok(added)
    }

    /// Notes in scope matching `query` (case-insensitive over front, back and
    /// tags), most recently updated first.
    pub fn browse(&self, scope: &Scope, query: &str) -> Vec<&Note> {
        let needle = query.trim().to_lowercase();
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| scope.contains_deck(n.deck_id))
            .filter(|n| n.matches(&needle))
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    // --- Scheduling ---

    pub fn set_settings(&mut self, new_per_day: u32, reviews_per_day: u32) -> Settings {
        self.settings = Settings::clamped(new_per_day, reviews_per_day);
        self.settings
    }

    /// Apply a rating to a card: reschedule it, append the log entry and count
    /// it against today's quota.
    pub fn rate_card(
        &mut self,
        card_id: Uuid,
        rating: Rating,
        clock: &impl Clock,
    ) -> Result<RatingEvent> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.id() == card_id)
            .ok_or(CoreError::UnknownCard(card_id))?;
        let event = apply_rating(card, rating, clock);
        self.log.push(event.clone());
        self.daily.record(clock.today(), rating);
        Ok(event)
    }

    pub fn limits(&self, today: DayNumber) -> DailyLimits {
        self.daily.limits(today, &self.settings)
    }

    pub fn compute_counts(&self, scope: &Scope, today: DayNumber) -> Counts {
        compute_counts(&self.cards, scope, today)
    }

    pub fn build_queue(&self, scope: &Scope, today: DayNumber) -> BuiltQueue {
        build_queue(
            &self.cards,
            scope,
            today,
            &self.settings,
            &self.limits(today),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardState;
    use crate::note::normalize_tags;
    use crate::queue::QueueReason;
    use crate::time::FixedClock;

    fn clock() -> FixedClock {
        FixedClock::at_day(100)
    }

    fn draft(deck_id: Uuid, front: &str, back: &str) -> NoteDraft {
        NoteDraft {
            id: None,
            deck_id,
            front: front.to_string(),
            back: back.to_string(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_seeded_collection() {
        let c = Collection::seeded(&clock());
        assert_eq!(c.decks.len(), 1);
        assert_eq!(c.decks[0].name, DEFAULT_DECK_NAME);
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.cards.len(), 1);
        assert_eq!(c.cards[0].note_id(), c.notes[0].id);
        assert_eq!(c.cards[0].due(), 100);
    }

    #[test]
    fn test_seed_skipped_when_decks_exist() {
        let mut c = Collection::new();
        c.add_deck("Mine", &clock()).unwrap();
        assert!(!c.ensure_seed_data(&clock()));
        assert!(c.notes.is_empty());
    }

    #[test]
    fn test_add_and_find_deck() {
        let mut c = Collection::new();
        let id = c.add_deck("  Spanish ", &clock()).unwrap();
        assert_eq!(c.find_deck("spanish").unwrap().id, id);
        assert_eq!(c.find_deck(&id.to_string()).unwrap().name, "Spanish");
        assert!(matches!(c.find_deck("french"), Err(CoreError::UnknownDeck(_))));
        assert_eq!(c.add_deck("   ", &clock()), Err(CoreError::EmptyName));
    }

    #[test]
    fn test_decks_by_name() {
        let mut c = Collection::new();
        c.add_deck("beta", &clock()).unwrap();
        c.add_deck("Alpha", &clock()).unwrap();
        let names: Vec<&str> = c.decks_by_name().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta"]);
    }

    #[test]
    fn test_rename_deck() {
        let mut c = Collection::new();
        let id = c.add_deck("old", &clock()).unwrap();
        c.rename_deck(id, " new ").unwrap();
        assert_eq!(c.deck(id).unwrap().name, "new");
        assert_eq!(c.rename_deck(id, ""), Err(CoreError::EmptyName));
        assert!(c.rename_deck(Uuid::new_v4(), "x").is_err());
    }

    #[test]
    fn test_delete_deck_cascades() {
        let mut c = Collection::new();
        let a = c.add_deck("a", &clock()).unwrap();
        let b = c.add_deck("b", &clock()).unwrap();
        c.upsert_note(draft(a, "1", "one"), &clock()).unwrap();
        c.upsert_note(draft(a, "2", "two"), &clock()).unwrap();
        let keep = c.upsert_note(draft(b, "3", "three"), &clock()).unwrap();
        let card = c.card_by_note(keep).unwrap().id();
        c.rate_card(card, Rating::Good, &clock()).unwrap();

        c.delete_deck(a).unwrap();
        assert_eq!(c.decks.len(), 1);
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.cards.len(), 1);
        assert_eq!(c.log.len(), 1);
        assert!(c.delete_deck(a).is_err());
    }

    #[test]
    fn test_upsert_creates_note_and_card() {
        let mut c = Collection::new();
        let deck = c.add_deck("d", &clock()).unwrap();
        let mut d = draft(deck, " house ", " dom ");
        d.tags = normalize_tags("nouns nouns b1");
        let id = c.upsert_note(d, &clock()).unwrap();

        let note = c.note(id).unwrap();
        assert_eq!(note.front, "house");
        assert_eq!(note.back, "dom");
        assert_eq!(note.tags, vec!["nouns", "b1"]);
        let card = c.card_by_note(id).unwrap();
        assert_eq!(card.state(), CardState::New);
        assert_eq!(card.deck_id(), deck);
    }

    #[test]
    fn test_upsert_requires_fields_and_deck() {
        let mut c = Collection::new();
        let deck = c.add_deck("d", &clock()).unwrap();
        assert_eq!(
            c.upsert_note(draft(deck, " ", "x"), &clock()),
            Err(CoreError::EmptyField("front"))
        );
        assert_eq!(
            c.upsert_note(draft(deck, "x", ""), &clock()),
            Err(CoreError::EmptyField("back"))
        );
        assert!(matches!(
            c.upsert_note(draft(Uuid::new_v4(), "x", "y"), &clock()),
            Err(CoreError::UnknownDeck(_))
        ));
        let mut edit = draft(deck, "x", "y");
        edit.id = Some(Uuid::new_v4());
        assert!(matches!(
            c.upsert_note(edit, &clock()),
            Err(CoreError::UnknownNote(_))
        ));
        assert!(c.notes.is_empty());
    }

    #[test]
    fn test_edit_moves_card_and_keeps_schedule() {
        let mut c = Collection::new();
        let a = c.add_deck("a", &clock()).unwrap();
        let b = c.add_deck("b", &clock()).unwrap();
        let id = c.upsert_note(draft(a, "q", "a"), &clock()).unwrap();
        let card_id = c.card_by_note(id).unwrap().id();
        c.rate_card(card_id, Rating::Easy, &clock()).unwrap();
        let before = *c.card(card_id).unwrap().schedule();

        let mut edit = draft(b, "q2", "a2");
        edit.id = Some(id);
        let later = FixedClock::at_day(101);
        assert_eq!(c.upsert_note(edit, &later).unwrap(), id);

        let card = c.card(card_id).unwrap();
        assert_eq!(card.deck_id(), b);
        assert_eq!(*card.schedule(), before);
        assert_eq!(card.updated_at(), later.now_iso8601());
        assert_eq!(c.note(id).unwrap().front, "q2");
        assert_eq!(c.cards.len(), 1);
    }

    #[test]
    fn test_delete_note_removes_card() {
        let mut c = Collection::seeded(&clock());
        let id = c.notes[0].id;
        c.delete_note(id).unwrap();
        assert!(c.notes.is_empty());
        assert!(c.cards.is_empty());
        assert_eq!(c.delete_note(id), Err(CoreError::UnknownNote(id)));
    }

    #[test]
    fn test_add_bulk() {
        let mut c = Collection::new();
        let deck = c.add_deck("d", &clock()).unwrap();
        let pairs = crate::bulk::parse_bulk_lines("a;1\nb\t2\nbad").pairs;
        let added = c
            .add_bulk(deck, &pairs, &["vocab".to_string()], &clock())
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(c.cards.len(), 2);
        assert!(c.notes.iter().all(|n| n.tags == vec!["vocab"]));
    }

    #[test]
    fn test_browse() {
        let mut c = Collection::new();
        let a = c.add_deck("a", &clock()).unwrap();
        let b = c.add_deck("b", &clock()).unwrap();
        c.upsert_note(draft(a, "House", "dom"), &FixedClock::at_day(1)).unwrap();
        c.upsert_note(draft(a, "Mouse", "mysz"), &FixedClock::at_day(2)).unwrap();
        c.upsert_note(draft(b, "Horse", "kon"), &FixedClock::at_day(3)).unwrap();

        let fronts = |notes: Vec<&Note>| notes.iter().map(|n| n.front.clone()).collect::<Vec<_>>();
        assert_eq!(fronts(c.browse(&Scope::All, "")), vec!["Horse", "Mouse", "House"]);
        assert_eq!(fronts(c.browse(&Scope::Deck(a), "OUSE")), vec!["Mouse", "House"]);
        assert_eq!(fronts(c.browse(&Scope::All, "kon")), vec!["Horse"]);
    }

    #[test]
    fn test_rate_card_updates_log_and_daily() {
        let mut c = Collection::seeded(&clock());
        let card_id = c.cards[0].id();
        let event = c.rate_card(card_id, Rating::Again, &clock()).unwrap();

        assert_eq!(c.log, vec![event]);
        let today = c.daily.get(100);
        assert_eq!(today.total, 1);
        assert_eq!(today.again, 1);
        assert_eq!(c.limits(100).studied, 1);
        assert_eq!(c.card(card_id).unwrap().lapses(), 1);

        let missing = Uuid::new_v4();
        assert_eq!(
            c.rate_card(missing, Rating::Good, &clock()),
            Err(CoreError::UnknownCard(missing))
        );
        assert_eq!(c.log.len(), 1);
    }

    #[test]
    fn test_set_settings_clamps() {
        let mut c = Collection::new();
        let s = c.set_settings(10_000, 3);
        assert_eq!(s.new_per_day, 999);
        assert_eq!(c.settings.reviews_per_day, 3);
    }

    #[test]
    fn test_build_queue_respects_limit() {
        let mut c = Collection::seeded(&clock());
        c.set_settings(1, 0);
        let q = c.build_queue(&Scope::All, 100);
        assert_eq!(q.card_ids.len(), 1);

        c.rate_card(q.card_ids[0], Rating::Good, &clock()).unwrap();
        let q = c.build_queue(&Scope::All, 100);
        assert_eq!(q.reason, QueueReason::Limit);
        assert!(q.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut c = Collection::seeded(&clock());
        c.add_deck("extra", &clock()).unwrap();
        c.rate_card(c.cards[0].id(), Rating::Good, &clock()).unwrap();
        c.reset(&clock());
        assert_eq!(c.decks.len(), 1);
        assert!(c.log.is_empty());
        assert!(c.daily.is_empty());
    }
}
