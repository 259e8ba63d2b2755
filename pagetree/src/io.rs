//! Byte-addressed storage underneath the file pager.
//!
//! `Storage` is the minimal surface `FilePager` needs from a backing file:
//! positional reads and writes, the current size, durability and truncation.
//! It also exposes an allocation lock so that "query size, then write at the
//! end" happens atomically with respect to other appenders.

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error.
    Io(std::io::Error),
    /// The allocation lock was poisoned by a panicking holder.
    LockPoisoned,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::LockPoisoned => write!(f, "storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::LockPoisoned => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Abstraction over a byte-addressed backing file.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `read_at` returns the last bytes written at that range
/// - `sync` makes all previous writes durable
/// - writers holding the guard from `lock` exclude each other
pub trait Storage {
    /// Guard returned by [`Storage::lock`].
    type Guard<'a>
    where
        Self: 'a;

    /// Fill `buf` from `offset`. Fails if the range is past the end.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), StorageError>;

    /// Write all of `buf` at `offset`, extending the storage if needed.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<(), StorageError>;

    /// Current size in bytes.
    fn size(&self) -> Result<u64, StorageError>;

    /// Flush all previous writes to durable storage.
    fn sync(&self) -> Result<(), StorageError>;

    /// Shrink (or grow) the storage to `len` bytes.
    fn truncate(&self, len: u64) -> Result<(), StorageError>;

    /// Take the allocation lock.
    fn lock(&self) -> Result<Self::Guard<'_>, StorageError>;
}
