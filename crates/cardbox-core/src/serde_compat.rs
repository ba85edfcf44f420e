//! JSON export/import envelope.
//!
//! An export wraps the collection as `{"appVersion", "exportedAt", "data"}`.
//! Import takes either that envelope or a bare collection object, fills
//! missing sections with defaults and checks every card on the way in.
//! Record ids that are not UUIDs (`deck_1a2b…` from the browser app) are
//! mapped to name-based UUIDs, so the same file always imports to the same
//! ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::collection::Collection;
use crate::time::Clock;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub app_version: String,
    pub exported_at: String,
    pub data: Collection,
}

impl ExportPayload {
    pub fn new(collection: &Collection, clock: &impl Clock) -> Self {
        Self {
            app_version: APP_VERSION.to_string(),
            exported_at: clock.now_iso8601(),
            data: collection.clone(),
        }
    }
}

pub fn export_json(collection: &Collection, clock: &impl Clock) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ExportPayload::new(collection, clock))
}

/// Id and reference fields of each collection section.
const ID_FIELDS: [(&str, &[&str]); 4] = [
    ("decks", &["id"]),
    ("notes", &["id", "deckId"]),
    ("cards", &["id", "noteId", "deckId"]),
    ("log", &["id", "cardId"]),
];

/// Rewrite every non-UUID id in place. References map the same way as the
/// ids they point at.
fn adopt_foreign_ids(data: &mut Value) {
    for (section, fields) in ID_FIELDS {
        let Some(records) = data.get_mut(section).and_then(Value::as_array_mut) else {
            continue;
        };
        for record in records {
            for field in fields {
                if let Some(Value::String(id)) = record.get_mut(*field) {
                    if Uuid::parse_str(id).is_err() {
                        *id = foreign_id(id).to_string();
                    }
                }
            }
        }
    }
}

fn foreign_id(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes())
}

/// Parse an export (or a bare collection). A collection without decks is
/// seeded.
pub fn import_json(json: &str, clock: &impl Clock) -> Result<Collection, serde_json::Error> {
    let mut value: Value = serde_json::from_str(json)?;
    let mut data = match value.get_mut("data") {
        Some(inner) if inner.is_object() => inner.take(),
        _ => value,
    };
    adopt_foreign_ids(&mut data);
    let mut collection: Collection = serde_json::from_value(data)?;
    collection.ensure_seed_data(clock);
    Ok(collection)
}
