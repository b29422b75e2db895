use std::sync::{Arc, Mutex};

use crate::utils::{hash, FastHashMap};

/// The default shard count of a `MutexRegistry`.
pub const DEFAULT_SHARDS: usize = 8;

/// Produces a stable lock token per key, so callers can serialize work on
/// one key without contending on any other. Two lookups with equal keys
/// return the same token for as long as the registry is live; tokens are
/// created once and never replaced.
///
/// The key-to-token table itself is striped over a fixed set of shards, so
/// acquiring tokens for unrelated keys rarely touches the same shard lock.
pub struct MutexRegistry {
    shards: Vec<Mutex<FastHashMap<String, Arc<Mutex<()>>>>>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        MutexRegistry {
            shards: (0..shards).map(|_| Mutex::new(FastHashMap::default())).collect(),
        }
    }

    /// Returns the lock token of `key`, creating it on first use.
    pub fn token_for<T: AsRef<str>>(&self, key: T) -> Arc<Mutex<()>> {
        let key = key.as_ref();
        let shard = &self.shards[hash(key) as usize % self.shards.len()];

        let mut tokens = shard.lock().unwrap();
        if let Some(token) = tokens.get(key) {
            return token.clone();
        }

        let token = Arc::new(Mutex::new(()));
        tokens.insert(key.to_owned(), token.clone());
        token
    }

    /// Discards all tokens. Safe only once no thread still holds or waits on
    /// an old token; callers must ensure no acquisition spans a clear.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().unwrap().clear();
        }
    }

    /// The number of live tokens, summed across shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|v| v.lock().unwrap().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MutexRegistry {
    fn default() -> Self {
        MutexRegistry::new()
    }
}
