//! JSON snapshot persistence (spec.md §4.2 ambient addition).
//!
//! Not a live backend: `Store` checkpoints to `data_dir` on request and
//! restores from it on startup, mirroring the teacher's
//! `save_schema_after_ddl` checkpoint-on-DDL pattern rather than a
//! write-through log.

mod io_utils;

pub use io_utils::{classify_io_error, retry_io_operation};

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::Store;

#[derive(serde::Serialize, serde::Deserialize)]
struct Snapshot {
    templates: HashMap<String, Value>,
    instances: HashMap<String, Value>,
    next_id: u64,
}

fn snapshot_path(data_dir: &Path) -> std::path::PathBuf {
    data_dir.join("azrael-store.snapshot.json")
}

/// Writes the full contents of `store` to `data_dir`, retrying on
/// transient I/O errors per `config`.
pub fn save(store: &Store, config: &StoreConfig) -> Result<(), StoreError> {
    let snapshot = Snapshot {
        templates: store.templates.snapshot()?,
        instances: store.instances.snapshot()?,
        next_id: store.ids.current(),
    };
    let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::SerializationError(e.to_string()))?;
    let path = snapshot_path(&config.data_dir);

    retry_io_operation(
        || {
            std::fs::create_dir_all(&config.data_dir)?;
            std::fs::write(&path, &bytes)
        },
        config.persistence_max_retries,
        config.persistence_retry_delay_ms,
        "saving store snapshot",
    )
}

/// Loads a snapshot from `data_dir` into `store`, replacing its
/// current contents. A missing snapshot file is not an error: a fresh
/// store simply keeps its installed defaults.
pub fn load(store: &Store, config: &StoreConfig) -> Result<bool, StoreError> {
    let path = snapshot_path(&config.data_dir);
    if !path.exists() {
        return Ok(false);
    }

    let bytes = retry_io_operation(
        || std::fs::read(&path),
        config.persistence_max_retries,
        config.persistence_retry_delay_ms,
        "loading store snapshot",
    )?;
    let snapshot: Snapshot =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::SerializationError(e.to_string()))?;

    store.templates.restore(snapshot.templates)?;
    store.instances.restore(snapshot.instances)?;
    store.ids.restore(snapshot.next_id);
    Ok(true)
}
