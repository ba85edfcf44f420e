use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Fails on in-memory and fresh databases; not an error.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS decks (
            id         TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notes (
            id         TEXT PRIMARY KEY,
            deck_id    TEXT NOT NULL REFERENCES decks(id),
            front      TEXT NOT NULL,
            back       TEXT NOT NULL,
            tags       TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            id         TEXT PRIMARY KEY,
            note_id    TEXT NOT NULL UNIQUE REFERENCES notes(id),
            deck_id    TEXT NOT NULL REFERENCES decks(id),
            due        INTEGER NOT NULL,
            interval   INTEGER NOT NULL,
            ease       REAL NOT NULL,
            reps       INTEGER NOT NULL,
            lapses     INTEGER NOT NULL,
            state      TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS review_log (
            id            TEXT PRIMARY KEY,
            card_id       TEXT NOT NULL,
            ts            INTEGER NOT NULL,
            rating        TEXT NOT NULL,
            prev_due      INTEGER NOT NULL,
            new_due       INTEGER NOT NULL,
            prev_interval INTEGER NOT NULL,
            new_interval  INTEGER NOT NULL,
            prev_ease     REAL NOT NULL,
            new_ease      REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_counters (
            day   TEXT PRIMARY KEY,
            total INTEGER NOT NULL DEFAULT 0,
            again INTEGER NOT NULL DEFAULT 0,
            hard  INTEGER NOT NULL DEFAULT 0,
            good  INTEGER NOT NULL DEFAULT 0,
            easy  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_notes_deck ON notes(deck_id);
        CREATE INDEX IF NOT EXISTS idx_cards_deck_due ON cards(deck_id, due);
        CREATE INDEX IF NOT EXISTS idx_log_card ON review_log(card_id);
        ",
    )?;

    let previous = get_schema_version(conn)?;
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    if previous.is_none() {
        tracing::info!("initialized collection schema v{SCHEMA_VERSION}");
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
