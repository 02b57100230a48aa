mod loader;
mod schema;

pub use loader::{load, load_from_file, load_from_str, LoadError};
pub use schema::{
    ConfigMapStorageSettings, FileStorageSettings, PatrolSettings, Settings, StabilitySettings,
    StorageBackend, StorageSettings,
};
