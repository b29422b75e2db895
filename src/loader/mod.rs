//! Reference-counted isolated class namespaces.
//!
//! Classes generated at runtime need a disposable namespace, but several
//! independent callers may be using the same generated class before any of
//! them is done with it. An [`IsolatedLoader`] therefore counts its users
//! explicitly: callers register as clients, and the loader refuses to close
//! while any claim is outstanding. Compared to leaving teardown to garbage
//! collection, this costs callers some discipline and buys deterministic,
//! observable release.
//!
//! Loaders chain: a loader may have a parent which is consulted first on
//! every load, and the parent link is an explicit mutable field, so a chain
//! can temporarily borrow visibility from another loader and restore the
//! original wiring afterwards.

pub mod class;

pub use self::class::{
    BasicDefiner, Binding, ClassEntry, DefineError, Definer, Member, MemberHandle, MemberKind,
};

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use crate::cache::Cache;
use crate::concurrent::MutexRegistry;
use crate::utils::{clean_path, FastHashMap, FastHashSet, SharedBytes};

/// The stable identity of a loader. Loader-keyed cache stores use this as
/// their owner key, which keeps the cache free of references back into the
/// loader itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(Uuid);

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a client holding a claim on a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn unique() -> Self {
        ClientId(Uuid::new_v4())
    }
}

#[derive(Debug, Fail)]
pub enum LoaderError {
    #[fail(display = "Class {} could not be found.", name)]
    ClassNotFound { name: String },
    #[fail(
        display = "Could not close loader {} because {} clients are still registered.",
        loader, clients
    )]
    StillReferenced { loader: LoaderId, clients: usize },
    #[fail(display = "{}", _0)]
    Define(#[fail(cause)] DefineError),
}

impl From<DefineError> for LoaderError {
    fn from(err: DefineError) -> Self {
        LoaderError::Define(err)
    }
}

struct ClientState {
    clients: FastHashSet<ClientId>,
    closed: bool,
}

/// A disposable class namespace holding not-yet-defined bytecode, defining
/// classes on demand, and tracking the clients that must release it before
/// it may close.
pub struct IsolatedLoader {
    id: LoaderId,
    cache: Arc<Cache>,
    definer: Arc<dyn Definer>,
    parent: RwLock<Option<Arc<IsolatedLoader>>>,
    staged: Mutex<FastHashMap<String, SharedBytes>>,
    defined: Mutex<FastHashMap<String, Arc<ClassEntry>>>,
    packages: Mutex<FastHashSet<String>>,
    clients: Mutex<ClientState>,
    closed: AtomicBool,
    define_mutexes: MutexRegistry,
}

impl IsolatedLoader {
    /// Creates a loader. When the parent is itself an isolated loader, the
    /// new loader registers as the parent's client, coupling the two
    /// lifecycles: the parent cannot close before this loader releases it.
    pub fn new(
        parent: Option<Arc<IsolatedLoader>>,
        cache: Arc<Cache>,
        definer: Arc<dyn Definer>,
    ) -> Arc<Self> {
        let loader = Arc::new(IsolatedLoader {
            id: LoaderId(Uuid::new_v4()),
            cache,
            definer,
            parent: RwLock::new(parent),
            staged: Mutex::new(FastHashMap::default()),
            defined: Mutex::new(FastHashMap::default()),
            packages: Mutex::new(FastHashSet::default()),
            clients: Mutex::new(ClientState {
                clients: FastHashSet::default(),
                closed: false,
            }),
            closed: AtomicBool::new(false),
            define_mutexes: MutexRegistry::new(),
        });

        if let Some(parent) = loader.parent() {
            parent.register(loader.client_id());
        }

        trace!("Created loader {}.", loader.id);
        loader
    }

    #[inline]
    pub fn id(&self) -> LoaderId {
        self.id
    }

    /// The identity this loader registers under when it is a client of its
    /// parent.
    #[inline]
    pub fn client_id(&self) -> ClientId {
        ClientId((self.id).0)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stages bytecode for a class that has not been defined yet. Staging a
    /// name that is already defined is discarded with a warning; staging
    /// the same undefined name again overwrites the previous bytecode.
    pub fn stage<T: Into<String>>(&self, name: T, code: SharedBytes) {
        let name = name.into();

        if self.is_closed() {
            warn!(
                "Could not stage bytecode for {} because loader {} has been closed.",
                name, self.id
            );
            return;
        }

        if self.defined.lock().unwrap().contains_key(&name) {
            warn!("Could not stage compiled class {} because it is already defined.", name);
            return;
        }

        self.staged.lock().unwrap().insert(name, code);
    }

    /// Stages a batch of compiled classes.
    pub fn stage_all<I>(&self, classes: I)
    where
        I: IntoIterator<Item = (String, SharedBytes)>,
    {
        for (name, code) in classes {
            self.stage(name, code);
        }
    }

    /// Loads a class by name: already-defined classes first, then the
    /// parent chain, then definition from staged bytecode. A parent hit
    /// discards any staged local copy of the same name.
    pub fn load(&self, name: &str) -> Result<Arc<ClassEntry>, LoaderError> {
        if let Some(class) = self.defined.lock().unwrap().get(name) {
            return Ok(class.clone());
        }

        if let Some(parent) = self.parent() {
            match parent.load(name) {
                Ok(class) => {
                    self.purge_staged(name);
                    return Ok(class);
                }
                Err(LoaderError::ClassNotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        self.define_from_staged(name)
    }

    /// Defines every staged class, logging and skipping the ones that fail.
    /// Returns the classes that ended up defined.
    pub fn force_load_all(&self) -> Vec<Arc<ClassEntry>> {
        let names: Vec<String> = self.staged.lock().unwrap().keys().cloned().collect();

        let mut loaded = Vec::with_capacity(names.len());
        for name in names {
            match self.load(&name) {
                Ok(class) => loaded.push(class),
                Err(err) => warn!("Could not load class {}: {}", name, err),
            }
        }

        loaded
    }

    /// Drops the staged bytecode of `name`, returning it. Used both
    /// internally when a parent supplies the class and by collaborators
    /// re-staging fresh output.
    pub fn purge_staged(&self, name: &str) -> Option<SharedBytes> {
        if self.is_closed() {
            warn!(
                "Could not purge staged bytecode of {} because loader {} has been closed.",
                name, self.id
            );
            return None;
        }

        self.staged.lock().unwrap().remove(name)
    }

    /// The staged bytecode of `name`, if it has not been defined yet.
    pub fn staged_bytecode(&self, name: &str) -> Option<SharedBytes> {
        self.staged.lock().unwrap().get(name).map(|code| code.share())
    }

    /// The bytecode of `name`, staged or defined.
    pub fn bytecode_of(&self, name: &str) -> Option<SharedBytes> {
        let staged = self.staged.lock().unwrap().get(name).map(|code| code.share());
        staged.or_else(|| self.defined.lock().unwrap().get(name).map(|class| class.bytecode()))
    }

    /// Resource-style bytecode lookup by class-file relative path, like
    /// `org/demo/Widget.class`.
    pub fn bytecode_for_path(&self, path: &str) -> Option<SharedBytes> {
        let stem = path.strip_suffix(".class")?;
        let name = clean_path(stem).replace('/', ".");

        let defined = self.defined.lock().unwrap().get(&name).map(|class| class.bytecode());
        defined.or_else(|| self.staged.lock().unwrap().get(&name).map(|code| code.share()))
    }

    /// The classes defined into this loader so far.
    pub fn defined_classes(&self) -> Vec<Arc<ClassEntry>> {
        self.defined.lock().unwrap().values().cloned().collect()
    }

    pub fn staged_count(&self) -> usize {
        self.staged.lock().unwrap().len()
    }

    pub fn defined_count(&self) -> usize {
        self.defined.lock().unwrap().len()
    }

    /// Whether `name` has been defined as a package here. The empty package
    /// always exists.
    pub fn has_package(&self, name: &str) -> bool {
        name.is_empty() || self.packages.lock().unwrap().contains(name)
    }

    /// Drops both bytecode maps without closing the loader.
    pub fn clear(&self) {
        if self.is_closed() {
            warn!("Could not clear loader {} because it has been closed.", self.id);
            return;
        }

        self.staged.lock().unwrap().clear();
        self.defined.lock().unwrap().clear();
    }

    /// Adds a client claim. Returns false once the loader is closed.
    pub fn register(&self, client: ClientId) -> bool {
        let mut state = self.clients.lock().unwrap();
        if state.closed {
            warn!("Could not register a client on loader {} because it has been closed.", self.id);
            return false;
        }

        state.clients.insert(client);
        true
    }

    /// Releases a client claim. With `close_if_empty` set, the loader
    /// closes when the last claim goes away; the return value reports
    /// whether this call closed it.
    pub fn unregister(&self, client: ClientId, close_if_empty: bool) -> bool {
        let should_close = {
            let mut state = self.clients.lock().unwrap();
            if state.closed {
                return false;
            }

            state.clients.remove(&client);
            close_if_empty && state.clients.is_empty()
        };

        if should_close {
            return self.close().is_ok();
        }

        false
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap().clients.len()
    }

    /// Closes the loader: fails while clients are registered, otherwise
    /// releases both bytecode maps, detaches from an isolated parent
    /// (releasing this loader as the parent's client), and purges this
    /// loader's entries from every loader-keyed cache store. Closing an
    /// already-closed loader is a logged no-op.
    pub fn close(&self) -> Result<(), LoaderError> {
        {
            let mut state = self.clients.lock().unwrap();
            if state.closed {
                warn!("Loader {} has already been closed.", self.id);
                return Ok(());
            }

            if !state.clients.is_empty() {
                return Err(LoaderError::StillReferenced {
                    loader: self.id,
                    clients: state.clients.len(),
                });
            }

            state.closed = true;
            self.closed.store(true, Ordering::SeqCst);
        }

        let parent = self.parent.write().unwrap().take();
        if let Some(parent) = parent {
            parent.unregister(self.client_id(), true);
        }

        self.staged.lock().unwrap().clear();
        self.defined.lock().unwrap().clear();
        self.packages.lock().unwrap().clear();
        self.define_mutexes.clear();
        self.cache.unregister_loader(self.id);

        info!("Loader {} closed.", self.id);
        Ok(())
    }

    /// This loader's current parent.
    pub fn parent(&self) -> Option<Arc<IsolatedLoader>> {
        self.parent.read().unwrap().clone()
    }

    /// Replaces the parent link, returning the previous one. Pure link
    /// surgery: client registrations are untouched.
    pub fn set_parent(&self, parent: Option<Arc<IsolatedLoader>>) -> Option<Arc<IsolatedLoader>> {
        mem::replace(&mut *self.parent.write().unwrap(), parent)
    }

    /// Rewires the ancestor chain of `loader` so that `master` becomes the
    /// parent of the chain's root, making everything visible through
    /// `master` loadable from the chain. Returns an undo token restoring
    /// the previous wiring. A `master` already part of the chain leaves the
    /// chain untouched.
    pub fn set_as_master(loader: &Arc<IsolatedLoader>, master: Arc<IsolatedLoader>) -> MasterReset {
        let mut root = loader.clone();
        while let Some(parent) = root.parent() {
            root = parent;
        }

        let mut cursor = Some(master.clone());
        while let Some(ancestor) = cursor {
            if Arc::ptr_eq(&ancestor, &root) {
                warn!(
                    "Loader {} is already reachable from the chain of {}; not rewired.",
                    master.id, loader.id
                );
                return MasterReset {
                    root,
                    previous: None,
                    rewired: false,
                };
            }
            cursor = ancestor.parent();
        }

        let previous = root.set_parent(Some(master));
        MasterReset {
            root,
            previous,
            rewired: true,
        }
    }

    fn define_from_staged(&self, name: &str) -> Result<Arc<ClassEntry>, LoaderError> {
        if self.is_closed() {
            warn!("Could not load class {} because loader {} has been closed.", name, self.id);
            return Err(LoaderError::ClassNotFound {
                name: name.to_owned(),
            });
        }

        // Definitions of the same name are serialized; unrelated names are
        // not.
        let token = self.define_mutexes.token_for(name);
        let _guard = token.lock().unwrap();

        if let Some(class) = self.defined.lock().unwrap().get(name) {
            return Ok(class.clone());
        }

        let code = self.staged.lock().unwrap().get(name).map(|code| code.share());
        let code = match code {
            Some(code) => code,
            None => {
                warn!("Compiled class {} not found in loader {}.", name, self.id);
                return Err(LoaderError::ClassNotFound {
                    name: name.to_owned(),
                });
            }
        };

        let defined = self
            .definer
            .define(name, &code, &mut |dependency| self.is_resolvable(dependency));

        match defined {
            Ok(class) => {
                let class = Arc::new(class);
                // The name must never be visible in both maps at once.
                self.staged.lock().unwrap().remove(name);
                self.defined.lock().unwrap().insert(name.to_owned(), class.clone());
                if let Some(package) = class.package() {
                    self.define_package(package);
                }
                Ok(class)
            }
            Err(DefineError::MissingDependency { name, dependency }) => {
                self.staged.lock().unwrap().remove(&name);
                warn!(
                    "Could not define class {} because class {} could not be found; staged bytecode removed.",
                    name, dependency
                );
                Err(LoaderError::Define(DefineError::MissingDependency {
                    name,
                    dependency,
                }))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn define_package(&self, name: &str) {
        if name.is_empty() {
            return;
        }

        self.packages.lock().unwrap().insert(name.to_owned());
    }

    fn is_resolvable(&self, name: &str) -> bool {
        if self.defined.lock().unwrap().contains_key(name) {
            return true;
        }
        if self.staged.lock().unwrap().contains_key(name) {
            return true;
        }

        self.parent().map(|parent| parent.is_resolvable(name)).unwrap_or(false)
    }
}

/// Undo token of [`IsolatedLoader::set_as_master`]: restores the chain
/// root's previous parent.
#[must_use]
pub struct MasterReset {
    root: Arc<IsolatedLoader>,
    previous: Option<Arc<IsolatedLoader>>,
    rewired: bool,
}

impl MasterReset {
    /// Restores the previous wiring, returning the displaced master if the
    /// chain had been rewired.
    pub fn restore(self) -> Option<Arc<IsolatedLoader>> {
        if self.rewired {
            self.root.set_parent(self.previous)
        } else {
            None
        }
    }
}
