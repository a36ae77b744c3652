use std::path::PathBuf;
use std::time::Duration;

/// Name of the durable manifest store
pub const DEFAULT_STORE_NAME: &str = "gm loader db";
/// Schema version of the durable manifest store
pub const DEFAULT_STORE_VERSION: i64 = 1;
/// Collection holding one record per bundle id
pub const DEFAULT_TABLE_NAME: &str = "gms";

/// Configuration for the manifest store adapter and the request router
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory holding the store file
    pub store_dir: PathBuf,

    /// Store name; the database file is `<store_dir>/<store_name>.sqlite`
    pub store_name: String,

    /// Highest schema version this build understands
    pub store_version: i64,

    /// Table holding the bundle records
    pub table_name: String,

    /// Lifetime advertised to browsers for preflight results
    pub preflight_max_age: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            store_dir: std::env::temp_dir().join("gmloader"),
            store_name: DEFAULT_STORE_NAME.to_owned(),
            store_version: DEFAULT_STORE_VERSION,
            table_name: DEFAULT_TABLE_NAME.to_owned(),
            preflight_max_age: Duration::from_secs(86400),
        }
    }
}

impl LoaderConfig {
    pub fn with_store_dir(mut self, store_dir: impl Into<PathBuf>) -> Self {
        self.store_dir = store_dir.into();
        self
    }

    /// Full path of the store file
    pub fn store_path(&self) -> PathBuf {
        self.store_dir.join(format!("{}.sqlite", self.store_name))
    }
}
