use std::sync::{Arc, RwLock};

use crate::concurrent::MutexRegistry;
use crate::utils::path::{clean_path, parent_component, separators};
use crate::utils::FastHashMap;

/// The transform applied to a cached value on insertion and on every read,
/// producing an appropriately shared or isolated view of it. Byte contents
/// hand out independent views over one shared buffer; reference-counted
/// values simply bump their count.
pub type Sharer<R> = Arc<dyn Fn(&R) -> R + Send + Sync>;

type Bucket<R> = Arc<RwLock<FastHashMap<String, R>>>;
type Partition<R> = Arc<RwLock<FastHashMap<String, Bucket<R>>>>;

/// A two-level lazy cache of path-addressed resources.
///
/// Resources are bucketed first by path depth, then by the component above
/// the final one, which keeps each map small and keeps siblings colocated.
/// Within a bucket the store performs double-checked locking per exact path:
/// the supplier of a value runs at most once while the store is live, and
/// every reader after the first observes a view of that single
/// materialization. Suppliers execute holding only the lock of their own
/// path, so unrelated paths never wait on each other.
pub struct PathStore<R> {
    start_level: u64,
    sharer: Sharer<R>,
    partitions: RwLock<FastHashMap<u64, Partition<R>>>,
    index_mutexes: MutexRegistry,
    partition_mutexes: MutexRegistry,
    resource_mutexes: MutexRegistry,
}

impl<R> PathStore<R>
where
    R: Send + Sync,
{
    /// Creates a store with the given partition floor and sharer, striping
    /// its mutex registries over `shards` shards.
    pub fn new(start_level: u64, shards: usize, sharer: Sharer<R>) -> Self {
        PathStore {
            start_level,
            sharer,
            partitions: RwLock::new(FastHashMap::default()),
            index_mutexes: MutexRegistry::with_shards(shards),
            partition_mutexes: MutexRegistry::with_shards(shards),
            resource_mutexes: MutexRegistry::with_shards(shards),
        }
    }

    /// Creates a store whose sharer is `Clone::clone`.
    pub fn cloning(start_level: u64) -> Self
    where
        R: Clone + 'static,
    {
        Self::new(start_level, super::DEFAULT_SHARDS, Arc::new(|resource: &R| resource.clone()))
    }

    /// Returns the resource at `path`, computing it with `supplier` if it is
    /// not cached yet. The supplier runs at most once per live path, holding
    /// only the per-path lock; concurrent callers of the same path block
    /// until the first one finishes and then observe its value. A supplier
    /// returning none caches nothing.
    pub fn get_or_compute_if_absent<F>(&self, path: &str, supplier: F) -> Option<R>
    where
        F: FnOnce() -> Option<R>,
    {
        let path = clean_path(path);
        let bucket = self.bucket(&path);

        if let Some(resource) = bucket.read().unwrap().get(&path) {
            return Some((self.sharer)(resource));
        }

        let token = self.resource_mutexes.token_for(&path);
        let _guard = token.lock().unwrap();

        if let Some(resource) = bucket.read().unwrap().get(&path) {
            return Some((self.sharer)(resource));
        }

        let resource = supplier()?;
        let stored = (self.sharer)(&resource);
        let shared = (self.sharer)(&stored);
        bucket.write().unwrap().insert(path, stored);
        Some(shared)
    }

    /// Computes and caches the resource at `path` unconditionally,
    /// overwriting whatever was there. Serialized against other writers of
    /// the same path by the per-path lock.
    pub fn force_compute<F>(&self, path: &str, supplier: F) -> Option<R>
    where
        F: FnOnce() -> Option<R>,
    {
        let path = clean_path(path);
        let bucket = self.bucket(&path);

        let token = self.resource_mutexes.token_for(&path);
        let _guard = token.lock().unwrap();

        let resource = supplier()?;
        let stored = (self.sharer)(&resource);
        let shared = (self.sharer)(&stored);
        bucket.write().unwrap().insert(path, stored);
        Some(shared)
    }

    /// Returns a view of the resource at `path` if it is cached.
    pub fn get(&self, path: &str) -> Option<R> {
        let path = clean_path(path);
        let bucket = self.bucket(&path);

        let resources = bucket.read().unwrap();
        resources.get(&path).map(|resource| (self.sharer)(resource))
    }

    /// Removes and returns the resource at `path`.
    pub fn remove(&self, path: &str) -> Option<R> {
        let path = clean_path(path);
        let bucket = self.bucket(&path);

        let removed = bucket.write().unwrap().remove(&path);
        removed
    }

    /// Sums entry counts across all partitions. O(partitions), intended for
    /// diagnostics rather than hot paths.
    pub fn count(&self) -> usize {
        let partitions = self.partitions.read().unwrap();
        partitions
            .values()
            .map(|partition| {
                partition
                    .read()
                    .unwrap()
                    .values()
                    .map(|bucket| bucket.read().unwrap().len())
                    .sum::<usize>()
            })
            .sum()
    }

    /// Drops every partition along with all mutex tokens.
    pub fn clear(&self) {
        self.partitions.write().unwrap().clear();
        self.index_mutexes.clear();
        self.partition_mutexes.clear();
        self.resource_mutexes.clear();
    }

    /// Resolves the bucket holding `path`, creating the nested maps on
    /// first use. `path` must already be cleaned.
    fn bucket(&self, path: &str) -> Bucket<R> {
        let index = separators(path).max(self.start_level);
        let partition = self.partition(index);

        // Paths shallower than the floor all go under the root key.
        let key = if index > self.start_level {
            parent_component(path).unwrap_or("/")
        } else {
            "/"
        };

        if let Some(bucket) = partition.read().unwrap().get(key) {
            return bucket.clone();
        }

        let token = self.partition_mutexes.token_for(key);
        let _guard = token.lock().unwrap();

        if let Some(bucket) = partition.read().unwrap().get(key) {
            return bucket.clone();
        }

        let bucket = Bucket::default();
        partition.write().unwrap().insert(key.to_owned(), bucket.clone());
        bucket
    }

    fn partition(&self, index: u64) -> Partition<R> {
        if let Some(partition) = self.partitions.read().unwrap().get(&index) {
            return partition.clone();
        }

        let token = self.index_mutexes.token_for(index.to_string());
        let _guard = token.lock().unwrap();

        if let Some(partition) = self.partitions.read().unwrap().get(&index) {
            return partition.clone();
        }

        let partition = Partition::default();
        self.partitions.write().unwrap().insert(index, partition.clone());
        partition
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> PathStore<u32> {
        PathStore::cloning(1)
    }

    #[test]
    fn computes_once() {
        let store = store();
        let calls = AtomicUsize::new(0);

        let supplier = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(42)
        };

        assert_eq!(store.get_or_compute_if_absent("a/b/res", supplier), Some(42));
        assert_eq!(
            store.get_or_compute_if_absent("a/b/res", || panic!("must not recompute")),
            Some(42)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn aliases_normalize() {
        let store = store();
        store.get_or_compute_if_absent("a/b/res", || Some(1));

        assert_eq!(store.get("a//b/./res"), Some(1));
        assert_eq!(store.get("/a/b/res/"), Some(1));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn none_is_not_cached() {
        let store = store();
        assert_eq!(store.get_or_compute_if_absent("a/res", || None), None);
        assert_eq!(store.get("a/res"), None);
        assert_eq!(store.get_or_compute_if_absent("a/res", || Some(7)), Some(7));
    }

    #[test]
    fn remove_then_recompute() {
        let store = store();
        store.get_or_compute_if_absent("a/b/res", || Some(1));

        assert_eq!(store.remove("a/b/res"), Some(1));
        assert_eq!(store.get("a/b/res"), None);
        assert_eq!(store.get_or_compute_if_absent("a/b/res", || Some(2)), Some(2));
    }

    #[test]
    fn force_compute_overwrites() {
        let store = store();
        store.get_or_compute_if_absent("a/res", || Some(1));
        assert_eq!(store.force_compute("a/res", || Some(2)), Some(2));
        assert_eq!(store.get("a/res"), Some(2));
    }

    #[test]
    fn shallow_paths_share_the_floor_partition() {
        let store = store();
        store.get_or_compute_if_absent("res", || Some(1));
        store.get_or_compute_if_absent("a/res", || Some(2));
        store.get_or_compute_if_absent("a/b/c/res", || Some(3));

        assert_eq!(store.count(), 3);
        store.clear();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn sharer_runs_on_every_read() {
        let store: PathStore<u32> = PathStore::new(1, 4, Arc::new(|v: &u32| v + 1));

        // Stored value is sharer(supplied); every read layers one more.
        assert_eq!(store.get_or_compute_if_absent("a/res", || Some(0)), Some(2));
        assert_eq!(store.get("a/res"), Some(2));
    }
}
