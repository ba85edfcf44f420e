//! SQLite persistence for cardbox collections.

pub mod collections;
pub mod config;
pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;

pub use collections::{
    CollectionStore, DATA_DIR_ENV, DEFAULT_COLLECTION, base_dir_from_env, default_base_dir,
    sanitize_name,
};
pub use config::Config;
pub use error::{Result, StoreError};
pub use store::Store;
