use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;

use super::errors::*;
use super::Filesystem;

/// A virtual filesystem over a zip archive. Opened containers are shareable
/// and get cached process-wide, so an archive consulted from many paths is
/// only parsed once.
pub struct ZipFs {
    archive: RwLock<::zip::ZipArchive<fs::File>>,
}

impl ZipFs {
    /// Opens the zip archive at `path`.
    pub fn new<T>(path: T) -> Result<Self>
    where
        T: AsRef<Path>,
    {
        let file = fs::File::open(path)?;
        let archive = ::zip::ZipArchive::new(file)?;
        Ok(ZipFs {
            archive: RwLock::new(archive),
        })
    }

    /// The number of entries in the container.
    pub fn len(&self) -> usize {
        self.archive.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Filesystem for ZipFs {
    fn exists(&self, path: &Path) -> bool {
        // Entry lookup advances the archive cursor, hence the write lock.
        path.to_str()
            .map(|name| self.archive.write().unwrap().by_name(name).is_ok())
            .unwrap_or(false)
    }

    fn load_into(&self, path: &Path, buf: &mut Vec<u8>) -> Result<()> {
        let name = path
            .to_str()
            .ok_or_else(|| Error::FileNotFound(path.to_string_lossy().into_owned()))?;

        let mut archive = self.archive.write().unwrap();
        let mut file = archive.by_name(name)?;
        file.read_to_end(buf)?;
        Ok(())
    }
}
