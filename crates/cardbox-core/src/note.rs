use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::Clock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A named collection of notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
}

impl Deck {
    pub fn new(name: &str, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            created_at: clock.now_iso8601(),
        }
    }
}

/// Front/back content. Each note owns exactly one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Note {
    /// Case-insensitive substring match over front, back and tags.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let hay = format!("{}\n{}\n{}", self.front, self.back, self.tags.join(" ")).to_lowercase();
        hay.contains(needle)
    }
}

/// Input for creating (no `id`) or editing (with `id`) a note.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub id: Option<Uuid>,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
}

/// Split on whitespace, drop duplicates, keep first-seen order.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    WHITESPACE
        .split(raw)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}
