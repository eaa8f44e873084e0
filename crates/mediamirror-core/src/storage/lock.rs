use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LOCK_FILE_NAME: &str = ".mirror.lock";

/// Exclusive advisory lock on a mirror root, held until dropped.
///
/// The OS releases the lock if the process dies, so a crash never leaves
/// the mirror wedged.
pub struct MirrorLock {
    file: File,
    path: PathBuf,
}

impl MirrorLock {
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired {}", path.display());
                Ok(Self { file, path })
            }
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(Error::Locked(root.to_path_buf()))
            }
            Err(err) => Err(Error::Io(err)),
        }
    }
}

impl Drop for MirrorLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            warn!("Could not release {}: {}", self.path.display(), err);
        }
    }
}
