//! Structures configuring the cache and the background worker, loadable
//! from a JSON settings file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub worker: WorkerSettings,
}

impl Settings {
    /// Loads settings from a JSON file. Missing fields fall back to their
    /// defaults, so a partial settings file is fine.
    pub fn load_from<T: AsRef<Path>>(path: T) -> Result<Settings> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// The partition floor of every store: paths nested shallower than this
    /// are all routed to the floor partition.
    pub partition_start_level: u64,
    /// How many shards each per-key mutex registry is striped over.
    pub mutex_shards: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            partition_start_level: 1,
            mutex_shards: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// The name of the worker thread.
    pub name: String,
    /// Optional stack size of the worker thread, in bytes.
    pub stack_size: Option<usize>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            name: "crucible-worker".to_owned(),
            stack_size: None,
        }
    }
}
