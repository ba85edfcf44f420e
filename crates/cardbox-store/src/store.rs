use std::path::Path;

use rusqlite::{Connection, params};
use uuid::Uuid;

use cardbox_core::time::day_from_unix_secs;
use cardbox_core::{
    COLLECTION_VERSION, Card, CardRecord, CardState, Clock, Collection, DailyCounter,
    DailyTracker, Deck, Note, Rating, RatingEvent, Settings, iso_date,
};

use crate::error::{Result, StoreError};
use crate::schema;

const KEY_VERSION: &str = "collection_version";
const KEY_NEW_PER_DAY: &str = "new_per_day";
const KEY_REVIEWS_PER_DAY: &str = "reviews_per_day";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        set_metadata_on(&self.conn, key, value)
    }

    fn get_metadata_u32(&self, key: &str) -> Result<Option<u32>> {
        self.get_metadata(key)?
            .map(|raw| {
                raw.parse::<u32>().map_err(|e| {
                    StoreError::InvalidData(format!("metadata {key} = '{raw}': {e}"))
                })
            })
            .transpose()
    }

    // --- Settings ---

    pub fn load_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        Ok(Settings::clamped(
            self.get_metadata_u32(KEY_NEW_PER_DAY)?
                .unwrap_or(defaults.new_per_day),
            self.get_metadata_u32(KEY_REVIEWS_PER_DAY)?
                .unwrap_or(defaults.reviews_per_day),
        ))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        save_settings_on(&tx, settings)?;
        tx.commit()?;
        Ok(())
    }

    // --- Save ---

    /// Replace everything stored with `collection`.
    pub fn save_collection(&self, collection: &Collection) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute_batch(
            "DELETE FROM cards; DELETE FROM notes; DELETE FROM decks;
             DELETE FROM review_log; DELETE FROM daily_counters;",
        )?;

        set_metadata_on(&tx, KEY_VERSION, &collection.version.to_string())?;
        save_settings_on(&tx, &collection.settings)?;

        {
            let mut stmt =
                tx.prepare("INSERT INTO decks (id, name, created_at) VALUES (?1, ?2, ?3)")?;
            for deck in &collection.decks {
                stmt.execute(params![deck.id.to_string(), deck.name, deck.created_at])?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO notes (id, deck_id, front, back, tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for note in &collection.notes {
                stmt.execute(params![
                    note.id.to_string(),
                    note.deck_id.to_string(),
                    note.front,
                    note.back,
                    note.tags.join(" "),
                    note.created_at,
                    note.updated_at,
                ])?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cards (id, note_id, deck_id, due, interval, ease, reps, lapses, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for card in &collection.cards {
                stmt.execute(params![
                    card.id().to_string(),
                    card.note_id().to_string(),
                    card.deck_id().to_string(),
                    card.due(),
                    card.interval(),
                    card.ease(),
                    card.reps(),
                    card.lapses(),
                    card.state().as_str(),
                    card.created_at(),
                    card.updated_at(),
                ])?;
            }
        }
        for event in &collection.log {
            insert_event_on(&tx, event)?;
        }
        for (day, counter) in collection.daily.iter() {
            upsert_counter_on(&tx, day, counter)?;
        }

        tx.commit()?;
        tracing::info!(
            decks = collection.decks.len(),
            cards = collection.cards.len(),
            log = collection.log.len(),
            "saved collection"
        );
        Ok(())
    }

    /// Persist the outputs of one rating: the card's new schedule, the log
    /// entry and the day's counter.
    pub fn save_rating(
        &self,
        card: &Card,
        event: &RatingEvent,
        day_key: &str,
        counter: &DailyCounter,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let rows = tx.execute(
            "UPDATE cards SET deck_id = ?1, due = ?2, interval = ?3, ease = ?4, reps = ?5,
                 lapses = ?6, state = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                card.deck_id().to_string(),
                card.due(),
                card.interval(),
                card.ease(),
                card.reps(),
                card.lapses(),
                card.state().as_str(),
                card.updated_at(),
                card.id().to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::InvalidData(format!(
                "card not found: {}",
                card.id()
            )));
        }
        insert_event_on(&tx, event)?;
        upsert_counter_on(&tx, day_key, counter)?;

        tx.commit()?;
        tracing::debug!(
            card = %card.id(),
            rating = %event.rating,
            due = event.new_due,
            "saved rating"
        );
        Ok(())
    }

    /// [`Store::save_rating`] with the card and counter taken from `collection`
    /// after [`Collection::rate_card`] returned `event`.
    pub fn record_rating(&self, collection: &Collection, event: &RatingEvent) -> Result<()> {
        let card = collection
            .card(event.card_id)
            .ok_or_else(|| StoreError::InvalidData(format!("card not found: {}", event.card_id)))?;
        let day = day_from_unix_secs(event.ts / 1000);
        self.save_rating(card, event, &iso_date(day), &collection.daily.get(day))
    }

    // --- Load ---

    /// Load the stored collection, seeding (and saving) it when it has no decks.
    pub fn load_collection(&self, clock: &impl Clock) -> Result<Collection> {
        let mut collection = self.read_collection()?;
        if collection.ensure_seed_data(clock) {
            self.save_collection(&collection)?;
            tracing::info!("seeded empty collection");
        }
        Ok(collection)
    }

    fn read_collection(&self) -> Result<Collection> {
        Ok(Collection {
            version: self
                .get_metadata_u32(KEY_VERSION)?
                .unwrap_or(COLLECTION_VERSION),
            decks: self.load_decks()?,
            notes: self.load_notes()?,
            cards: self.load_cards()?,
            log: self.load_log()?,
            settings: self.load_settings()?,
            daily: self.load_daily()?,
        })
    }

    fn load_decks(&self) -> Result<Vec<Deck>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM decks ORDER BY rowid")?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, name, created_at)| {
                Ok(Deck {
                    id: parse_uuid(&id)?,
                    name,
                    created_at,
                })
            })
            .collect()
    }

    fn load_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, front, back, tags, created_at, updated_at
             FROM notes ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, deck_id, front, back, tags, created_at, updated_at)| {
                Ok(Note {
                    id: parse_uuid(&id)?,
                    deck_id: parse_uuid(&deck_id)?,
                    front,
                    back,
                    tags: tags.split_whitespace().map(str::to_string).collect(),
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }

    fn load_cards(&self) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, note_id, deck_id, due, interval, ease, reps, lapses, state, created_at, updated_at
             FROM cards ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, u32>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, note_id, deck_id, due, interval, ease, reps, lapses, state, created_at, updated_at)| {
                    let record = CardRecord {
                        id: parse_uuid(&id)?,
                        note_id: parse_uuid(&note_id)?,
                        deck_id: parse_uuid(&deck_id)?,
                        due,
                        interval,
                        ease,
                        reps,
                        lapses,
                        state: parse_state(&state)?,
                        created_at,
                        updated_at,
                    };
                    Ok(Card::try_from(record)?)
                },
            )
            .collect()
    }

    fn load_log(&self) -> Result<Vec<RatingEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, card_id, ts, rating, prev_due, new_due, prev_interval, new_interval, prev_ease, new_ease
             FROM review_log ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, u32>(7)?,
                    row.get::<_, f64>(8)?,
                    row.get::<_, f64>(9)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, card_id, ts, rating, prev_due, new_due, prev_interval, new_interval, prev_ease, new_ease)| {
                    Ok(RatingEvent {
                        id: parse_uuid(&id)?,
                        card_id: parse_uuid(&card_id)?,
                        ts: ts.max(0) as u64,
                        rating: rating.parse::<Rating>()?,
                        prev_due,
                        new_due,
                        prev_interval,
                        new_interval,
                        prev_ease,
                        new_ease,
                    })
                },
            )
            .collect()
    }

    fn load_daily(&self) -> Result<DailyTracker> {
        let mut stmt = self.conn.prepare(
            "SELECT day, total, again, hard, good, easy FROM daily_counters ORDER BY day",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    DailyCounter {
                        total: row.get(1)?,
                        again: row.get(2)?,
                        hard: row.get(3)?,
                        good: row.get(4)?,
                        easy: row.get(5)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut daily = DailyTracker::new();
        for (day, counter) in rows {
            daily.insert(day, counter);
        }
        Ok(daily)
    }
}

fn set_metadata_on(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn save_settings_on(conn: &Connection, settings: &Settings) -> Result<()> {
    set_metadata_on(conn, KEY_NEW_PER_DAY, &settings.new_per_day.to_string())?;
    set_metadata_on(
        conn,
        KEY_REVIEWS_PER_DAY,
        &settings.reviews_per_day.to_string(),
    )
}

fn insert_event_on(conn: &Connection, event: &RatingEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO review_log (id, card_id, ts, rating, prev_due, new_due, prev_interval, new_interval, prev_ease, new_ease)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.id.to_string(),
            event.card_id.to_string(),
            event.ts as i64,
            event.rating.as_str(),
            event.prev_due,
            event.new_due,
            event.prev_interval,
            event.new_interval,
            event.prev_ease,
            event.new_ease,
        ],
    )?;
    Ok(())
}

fn upsert_counter_on(conn: &Connection, day: &str, counter: &DailyCounter) -> Result<()> {
    conn.execute(
        "INSERT INTO daily_counters (day, total, again, hard, good, easy)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(day) DO UPDATE SET
             total = excluded.total, again = excluded.again, hard = excluded.hard,
             good = excluded.good, easy = excluded.easy",
        params![
            day,
            counter.total,
            counter.again,
            counter.hard,
            counter.good,
            counter.easy,
        ],
    )?;
    Ok(())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}

fn parse_state(s: &str) -> Result<CardState> {
    match s {
        "new" => Ok(CardState::New),
        "review" => Ok(CardState::Review),
        other => Err(StoreError::InvalidData(format!(
            "unknown card state '{other}'"
        ))),
    }
}
