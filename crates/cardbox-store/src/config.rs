//! Optional `config.toml` in the data directory.
//!
//! ```toml
//! default_collection = "languages"
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Collection opened when no `--collection` is given.
    #[serde(default)]
    pub default_collection: Option<String>,
}

impl Config {
    pub fn path(base: &Path) -> PathBuf {
        base.join(CONFIG_FILE)
    }

    /// Read `<base>/config.toml`. A missing file yields the defaults; a file
    /// that does not parse is an error.
    pub fn load(base: &Path) -> Result<Self> {
        let path = Self::path(base);
        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| StoreError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn save(&self, base: &Path) -> Result<()> {
        let path = Self::path(base);
        let content = toml::to_string_pretty(self)
            .map_err(|e| StoreError::Config(format!("failed to encode config: {e}")))?;
        fs::create_dir_all(base).map_err(|e| {
            StoreError::Config(format!("failed to create {}: {e}", base.display()))
        })?;
        fs::write(&path, content)
            .map_err(|e| StoreError::Config(format!("failed to write {}: {e}", path.display())))
    }
}
