//! Local file storage.

use std::fs::{File, OpenOptions};
#[cfg(not(unix))]
use std::io::{Read, Seek, SeekFrom, Write};
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::io::{Storage, StorageError};

/// A file on the local filesystem used as page storage.
pub struct LocalFile {
    file: File,
    path: PathBuf,
    alloc: Mutex<()>,
}

impl LocalFile {
    /// Open the file at `path`, creating it if it does not exist.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            alloc: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Storage for LocalFile {
    type Guard<'a> = MutexGuard<'a, ()>;

    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), StorageError> {
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    // Without positional I/O the cursor is shared, so reads and writes take
    // the file by reference and seek first.
    #[cfg(not(unix))]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), StorageError> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    #[cfg(unix)]
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), StorageError> {
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), StorageError> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn size(&self) -> Result<u64, StorageError> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&self) -> Result<(), StorageError> {
        self.file.sync_all()?;
        Ok(())
    }

    fn truncate(&self, len: u64) -> Result<(), StorageError> {
        self.file.set_len(len)?;
        Ok(())
    }

    fn lock(&self) -> Result<Self::Guard<'_>, StorageError> {
        self.alloc.lock().map_err(|_| StorageError::LockPoisoned)
    }
}
