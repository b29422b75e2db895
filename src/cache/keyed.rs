use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::concurrent::MutexRegistry;
use crate::utils::FastHashMap;

use super::paths::{PathStore, Sharer};

/// A `PathStore` per owner, for resources that only make sense relative to
/// some owning object, like reflective members cached per loader. The inner
/// store is created lazily on first access and detached wholesale when the
/// owner goes away.
pub struct KeyedStore<K, R> {
    start_level: u64,
    shards: usize,
    sharer: Sharer<R>,
    stores: RwLock<FastHashMap<K, Arc<PathStore<R>>>>,
    owner_mutexes: MutexRegistry,
}

impl<K, R> KeyedStore<K, R>
where
    K: Eq + Hash + Clone + Display,
    R: Send + Sync,
{
    pub fn new(start_level: u64, shards: usize, sharer: Sharer<R>) -> Self {
        KeyedStore {
            start_level,
            shards,
            sharer,
            stores: RwLock::new(FastHashMap::default()),
            owner_mutexes: MutexRegistry::with_shards(shards),
        }
    }

    pub fn get_or_compute_if_absent<F>(&self, owner: &K, path: &str, supplier: F) -> Option<R>
    where
        F: FnOnce() -> Option<R>,
    {
        self.store_for(owner).get_or_compute_if_absent(path, supplier)
    }

    pub fn get(&self, owner: &K, path: &str) -> Option<R> {
        self.store_for(owner).get(path)
    }

    /// Removes one path from the owner's store. Owners never seen before
    /// are not materialized by this.
    pub fn remove_path(&self, owner: &K, path: &str) -> Option<R> {
        let store = self.stores.read().unwrap().get(owner).cloned();
        store.and_then(|store| store.remove(path))
    }

    /// Detaches and returns the owner's entire store without clearing it;
    /// the caller decides whether to clear.
    pub fn remove(&self, owner: &K) -> Option<Arc<PathStore<R>>> {
        self.stores.write().unwrap().remove(owner)
    }

    /// Drops every owner along with the owner mutex tokens.
    pub fn clear(&self) {
        self.stores.write().unwrap().clear();
        self.owner_mutexes.clear();
    }

    /// The number of owners with a live store.
    pub fn len(&self) -> usize {
        self.stores.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.read().unwrap().is_empty()
    }

    fn store_for(&self, owner: &K) -> Arc<PathStore<R>> {
        if let Some(store) = self.stores.read().unwrap().get(owner) {
            return store.clone();
        }

        let token = self.owner_mutexes.token_for(owner.to_string());
        let _guard = token.lock().unwrap();

        if let Some(store) = self.stores.read().unwrap().get(owner) {
            return store.clone();
        }

        let store = Arc::new(PathStore::new(self.start_level, self.shards, self.sharer.clone()));
        self.stores.write().unwrap().insert(owner.clone(), store.clone());
        store
    }
}
