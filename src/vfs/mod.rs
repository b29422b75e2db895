//! The virtual filesystem boundary. The cache consumes a `path -> buffer`
//! fetch contract and an idempotent path normalization; this module supplies
//! both, with a local-directory backend and a zip-archive backend behind one
//! trait.

pub mod errors;

pub mod dir;
pub use self::dir::DirectoryFs;

pub mod zip;
pub use self::zip::ZipFs;

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::utils::{clean_path, FastHashMap, HashValue};

use self::errors::*;

/// The io operations every mounted filesystem supports.
pub trait Filesystem: Send + Sync {
    /// Returns whether the path points at an existing file.
    fn exists(&self, path: &Path) -> bool;

    /// Reads all bytes until EOF, placing them into `buf`.
    fn load_into(&self, path: &Path, buf: &mut Vec<u8>) -> Result<()>;
}

/// A descriptor of a driver path, cheap to probe once and cache. It records
/// where the path routed and whether anything was there at probe time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    path: String,
    mount: String,
    exists: bool,
}

impl FileItem {
    /// Builds a descriptor directly. [`FsDriver::item`] probes the mount
    /// and builds one for you.
    pub fn new<M, P>(mount: M, path: P, exists: bool) -> Self
    where
        M: Into<String>,
        P: Into<String>,
    {
        FileItem {
            path: path.into(),
            mount: mount.into(),
            exists,
        }
    }

    /// The cleaned driver path, mount identifier included.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The identifier of the mount this path routed to.
    #[inline]
    pub fn mount(&self) -> &str {
        &self.mount
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.exists
    }
}

/// The driver of the virtual filesystem: routes `<mount>/rest` paths to the
/// filesystem mounted under `<mount>`, normalizing paths on the way in.
#[derive(Default)]
pub struct FsDriver {
    mounts: RwLock<FastHashMap<HashValue<str>, Arc<dyn Filesystem>>>,
}

impl FsDriver {
    pub fn new() -> Self {
        FsDriver {
            mounts: RwLock::new(FastHashMap::default()),
        }
    }

    /// Mounts a filesystem under `ident`.
    pub fn mount<T, F>(&self, ident: T, fs: F) -> Result<()>
    where
        T: AsRef<str>,
        F: Filesystem + 'static,
    {
        let ident = ident.as_ref();
        let hash = HashValue::from(ident);

        let mut mounts = self.mounts.write().unwrap();
        if mounts.get(&hash).is_some() {
            return Err(Error::MountDuplicated(ident.to_owned()));
        }

        info!("Mounts virtual filesystem {}.", ident);
        mounts.insert(hash, Arc::new(fs));
        Ok(())
    }

    /// Unmounts the filesystem under `ident`, if any.
    pub fn unmount<T: AsRef<str>>(&self, ident: T) {
        let hash = HashValue::from(ident.as_ref());
        self.mounts.write().unwrap().remove(&hash);
    }

    /// Returns whether the path points at an existing file on its mount.
    pub fn exists<T: AsRef<str>>(&self, path: T) -> bool {
        self.route(path.as_ref())
            .map(|(fs, _, rest)| fs.exists(rest.as_ref()))
            .unwrap_or(false)
    }

    /// Reads all bytes of the file at `path` into `buf`.
    pub fn load_into<T: AsRef<str>>(&self, path: T, buf: &mut Vec<u8>) -> Result<()> {
        let path = path.as_ref();
        let (fs, _, rest) = self
            .route(path)
            .ok_or_else(|| Error::MountNotFound(clean_path(path)))?;

        fs.load_into(rest.as_ref(), buf)
    }

    /// Probes `path` and returns its descriptor. Paths that do not route to
    /// any mount yield none.
    pub fn item<T: AsRef<str>>(&self, path: T) -> Option<Arc<FileItem>> {
        self.route(path.as_ref()).map(|(fs, mount, rest)| {
            let path = if rest.is_empty() {
                mount.clone()
            } else {
                format!("{}/{}", mount, rest)
            };

            Arc::new(FileItem::new(mount, path, fs.exists(rest.as_ref())))
        })
    }

    fn route(&self, path: &str) -> Option<(Arc<dyn Filesystem>, String, String)> {
        let cleaned = clean_path(path);
        let mut components = cleaned.splitn(2, '/');

        let mount = components.next().filter(|v| !v.is_empty())?;
        let rest = components.next().unwrap_or("");

        let fs = self.mounts.read().unwrap().get(&HashValue::from(mount)).cloned()?;
        Some((fs, mount.to_owned(), rest.to_owned()))
    }
}
