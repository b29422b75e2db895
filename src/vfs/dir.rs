use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::errors::*;
use super::Filesystem;

/// Maps a local host directory into the virtual filesystem.
pub struct DirectoryFs {
    root: PathBuf,
}

impl DirectoryFs {
    /// Creates a new directory filesystem rooted at `path`.
    pub fn new<T>(path: T) -> Result<Self>
    where
        T: AsRef<Path>,
    {
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            Ok(DirectoryFs {
                root: path.as_ref().to_owned(),
            })
        } else {
            Err(Error::FilesystemNotFound(
                path.as_ref().to_string_lossy().into_owned(),
            ))
        }
    }
}

impl Filesystem for DirectoryFs {
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(self.root.join(path)).is_ok()
    }

    fn load_into(&self, path: &Path, buf: &mut Vec<u8>) -> Result<()> {
        let mut file = fs::File::open(self.root.join(path))?;
        file.read_to_end(buf)?;
        Ok(())
    }
}
