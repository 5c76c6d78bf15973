//! Document store configuration.

use std::path::PathBuf;

/// Document store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory snapshots are written to and loaded from.
    pub data_dir: PathBuf,
    /// Initial capacity (in documents) reserved per collection.
    pub initial_collection_capacity: usize,
    /// Maximum size in bytes of a single `custom` field.
    pub max_custom_size: usize,
    /// Maximum retry attempts for transient snapshot I/O errors.
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds.
    pub persistence_retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            initial_collection_capacity: 1024,
            max_custom_size: 1 << 20,
            persistence_max_retries: 3,
            persistence_retry_delay_ms: 100,
        }
    }
}
