use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::Store;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CARDBOX_DATA_DIR";

pub const DEFAULT_COLLECTION: &str = "default";

/// `~/.cardbox`.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".cardbox")
}

/// `$CARDBOX_DATA_DIR` when set and non-empty, else [`default_base_dir`].
pub fn base_dir_from_env() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Sanitize a collection name for use as a filename.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Collection name priority: explicit name, then `default_collection` from
/// the config file, then `default`. Names that sanitize to nothing are skipped.
fn resolve_collection_name(explicit: Option<&str>, config: &Config) -> String {
    [explicit, config.default_collection.as_deref()]
        .into_iter()
        .flatten()
        .map(sanitize_name)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string())
}

/// One named collection database inside the data directory.
///
/// Layout:
/// ```text
/// ~/.cardbox/
/// ├── config.toml
/// └── collections/
///     ├── default.db
///     └── ...
/// ```
pub struct CollectionStore {
    store: Store,
    name: String,
    path: Option<PathBuf>,
}

impl CollectionStore {
    /// Open (creating as needed) the named collection.
    /// `base_dir`: override the data directory (for testing).
    pub fn open(name: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let config = Config::load(&base)?;
        let name = resolve_collection_name(name, &config);

        let collections_dir = base.join("collections");
        fs::create_dir_all(&collections_dir).map_err(|e| {
            StoreError::InvalidData(format!(
                "failed to create {}: {e}",
                collections_dir.display()
            ))
        })?;

        let path = collections_dir.join(format!("{name}.db"));
        tracing::debug!(collection = %name, path = %path.display(), "opening collection");
        let store = Store::open(&path)?;

        Ok(Self {
            store,
            name,
            path: Some(path),
        })
    }

    /// Open with an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory()?,
            name: "test".to_string(),
            path: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbox_core::{Collection, FixedClock};

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("languages"), "languages");
        assert_eq!(sanitize_name(" my deck/v2 "), "my_deck_v2");
        assert_eq!(sanitize_name("../etc"), "___etc");
        assert_eq!(sanitize_name("日本語"), "日本語");
    }

    #[test]
    fn test_resolve_priority() {
        let none = Config::default();
        let configured = Config {
            default_collection: Some("physics".to_string()),
        };
        assert_eq!(resolve_collection_name(None, &none), DEFAULT_COLLECTION);
        assert_eq!(resolve_collection_name(None, &configured), "physics");
        assert_eq!(resolve_collection_name(Some("bio"), &configured), "bio");
        assert_eq!(resolve_collection_name(Some("  "), &configured), "physics");
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cs = CollectionStore::open(Some("spanish words"), Some(dir.path())).unwrap();
        assert_eq!(cs.name(), "spanish_words");
        let expected = dir.path().join("collections").join("spanish_words.db");
        assert_eq!(cs.path(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    fn test_open_uses_config_default() {
        let dir = tempfile::tempdir().unwrap();
        Config {
            default_collection: Some("configured".to_string()),
        }
        .save(dir.path())
        .unwrap();

        let cs = CollectionStore::open(None, Some(dir.path())).unwrap();
        assert_eq!(cs.name(), "configured");
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FixedClock::at_day(20_000);

        let a = CollectionStore::open(Some("a"), Some(dir.path())).unwrap();
        let mut collection = a.store().load_collection(&clock).unwrap();
        collection.add_deck("Only in a", &clock).unwrap();
        a.store().save_collection(&collection).unwrap();

        let b = CollectionStore::open(Some("b"), Some(dir.path())).unwrap();
        let other: Collection = b.store().load_collection(&clock).unwrap();
        assert_eq!(other.decks.len(), 1);

        let reopened = CollectionStore::open(Some("a"), Some(dir.path())).unwrap();
        assert_eq!(reopened.store().load_collection(&clock).unwrap().decks.len(), 2);
    }

    #[test]
    fn test_in_memory() {
        let cs = CollectionStore::open_in_memory().unwrap();
        assert!(cs.path().is_none());
        assert_eq!(cs.name(), "test");
    }
}
