use std::fs;
use std::path::Path;

use cardbox_core::{Clock, Collection, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Replace the stored collection with the contents of a JSON export file.
    pub fn import_json_file(&self, path: &Path, clock: &impl Clock) -> Result<Collection> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json, clock)
    }

    /// Replace the stored collection with a JSON export (or bare collection) string.
    pub fn import_json_str(&self, json: &str, clock: &impl Clock) -> Result<Collection> {
        let collection = import_json(json, clock)
            .map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        self.save_collection(&collection)?;
        tracing::info!(
            decks = collection.decks.len(),
            notes = collection.notes.len(),
            "imported collection"
        );
        Ok(collection)
    }

    pub fn export_json_file(&self, path: &Path, clock: &impl Clock) -> Result<()> {
        let json = self.export_json_string(clock)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self, clock: &impl Clock) -> Result<String> {
        let collection = self.load_collection(clock)?;
        export_json(&collection, clock)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
