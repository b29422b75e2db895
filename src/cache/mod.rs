//! The process-wide cache: a fixed registry of lazy stores for the resource
//! kinds the toolkit loads repeatedly, with coordinated clear and close.
//!
//! The cache is created explicitly and passed to whoever needs it; there is
//! no ambient instance. Loaders created against a cache purge their own
//! entries from every loader-keyed store when they close, which is what
//! keeps repeated generate-load-discard cycles from growing without bound.

pub mod keyed;
pub mod paths;

pub use self::keyed::KeyedStore;
pub use self::paths::{PathStore, Sharer};

pub use crate::concurrent::mutexes::DEFAULT_SHARDS;

use std::sync::Arc;

use crate::loader::class::{Binding, Member, MemberHandle};
use crate::loader::LoaderId;
use crate::settings::CacheSettings;
use crate::utils::SharedBytes;
use crate::vfs::{FileItem, ZipFs};

/// Identifies one store of the cache, for selective clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreId {
    Contents,
    FileItems,
    Archives,
    Members,
    Bindings,
    Handles,
}

/// Per-store entry counts, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub contents: usize,
    pub file_items: usize,
    pub archives: usize,
    pub member_owners: usize,
    pub binding_owners: usize,
    pub handle_owners: usize,
}

/// The fixed set of process-wide stores.
pub struct Cache {
    /// Raw byte contents per path; readers get independent views over one
    /// shared buffer.
    pub contents: PathStore<SharedBytes>,
    /// Probed filesystem item descriptors per driver path.
    pub file_items: PathStore<Arc<FileItem>>,
    /// Opened archive containers per archive path.
    pub archives: PathStore<Arc<ZipFs>>,
    /// Reflective member lists, per loader and member path.
    pub members: KeyedStore<LoaderId, Arc<Vec<Member>>>,
    /// Bound functional adapters, per loader and binding path.
    pub bindings: KeyedStore<LoaderId, Binding>,
    /// Member-to-invoker pairs, per loader and member path.
    pub handles: KeyedStore<LoaderId, Arc<MemberHandle>>,
}

impl Cache {
    pub fn new(settings: &CacheSettings) -> Arc<Self> {
        info!("Building the process-wide cache.");

        let level = settings.partition_start_level;
        let shards = settings.mutex_shards;

        Arc::new(Cache {
            contents: PathStore::new(level, shards, Arc::new(|contents: &SharedBytes| contents.share())),
            file_items: PathStore::new(level, shards, Arc::new(|item: &Arc<FileItem>| item.clone())),
            archives: PathStore::new(level, shards, Arc::new(|archive: &Arc<ZipFs>| archive.clone())),
            members: KeyedStore::new(level, shards, Arc::new(|members: &Arc<Vec<Member>>| members.clone())),
            bindings: KeyedStore::new(level, shards, Arc::new(|binding: &Binding| binding.clone())),
            handles: KeyedStore::new(level, shards, Arc::new(|handle: &Arc<MemberHandle>| handle.clone())),
        })
    }

    /// Clears every store whose id is not in `excluded`.
    pub fn clear_excluding(&self, excluded: &[StoreId]) {
        if !excluded.contains(&StoreId::Contents) {
            self.contents.clear();
        }
        if !excluded.contains(&StoreId::FileItems) {
            self.file_items.clear();
        }
        if !excluded.contains(&StoreId::Archives) {
            self.archives.clear();
        }
        if !excluded.contains(&StoreId::Members) {
            self.members.clear();
        }
        if !excluded.contains(&StoreId::Bindings) {
            self.bindings.clear();
        }
        if !excluded.contains(&StoreId::Handles) {
            self.handles.clear();
        }
    }

    pub fn clear(&self) {
        self.clear_excluding(&[]);
    }

    pub fn close(&self) {
        self.clear();
    }

    /// Detaches every loader-keyed entry of `loader`. Invoked when a loader
    /// closes, so discarded namespaces do not accumulate cached members.
    pub fn unregister_loader(&self, loader: LoaderId) {
        self.members.remove(&loader);
        self.bindings.remove(&loader);
        self.handles.remove(&loader);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            contents: self.contents.count(),
            file_items: self.file_items.count(),
            archives: self.archives.count(),
            member_owners: self.members.len(),
            binding_owners: self.bindings.len(),
            handle_owners: self.handles.len(),
        }
    }
}
