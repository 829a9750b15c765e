//! Flash filesystem adapter.
//!
//! Implements [`StoragePort`] over `std::fs` rooted at one directory:
//! the SPIFFS mount point on the board, any directory on the host.
//!
//! - Writes go to `<name>.tmp` and are renamed over the target, so a
//!   reset mid-write leaves the previous object intact.
//! - Object names are flat; separators and `..` are rejected.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::app::ports::{StorageError, StoragePort};

/// Mount point used by [`crate::drivers::hw_init::mount_storage`].
pub const FLASH_ROOT: &str = "/spiffs";

const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        let flat = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.ends_with(TMP_SUFFIX);
        if flat {
            Ok(self.root.join(name))
        } else {
            warn!("FileStore: rejected object name {name:?}");
            Err(StorageError::IoError)
        }
    }
}

fn map_io(e: &io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound,
        ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}

impl StoragePort for FileStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|e| {
            if e.kind() != ErrorKind::NotFound {
                warn!("FileStore: read {} failed: {e}", full.display());
            }
            map_io(&e)
        })
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        let mut tmp = full.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let result = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, &full));
        match result {
            Ok(()) => {
                debug!("FileStore: wrote {} ({} bytes)", full.display(), data.len());
                Ok(())
            }
            Err(e) => {
                warn!("FileStore: write {} failed: {e}", full.display());
                let _ = fs::remove_file(&tmp);
                Err(map_io(&e))
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }
}
