//! Page-granular storage.
//!
//! A pager is a growable array of `PAGE_SIZE` pages. It only ever grows:
//! writing at `page_count()` or appending adds a page, writing further out
//! is an error. All methods take `&self` so a pager can be shared across
//! threads; appends are serialized internally.

mod file;
mod memory;

pub use file::FilePager;
pub use memory::MemoryPager;

use crate::io::StorageError;
use crate::page::{Page, PageIndex};

/// Errors that can occur during pager operations.
#[derive(Debug)]
pub enum PagerError {
    /// Backing storage failed.
    Storage(StorageError),
    /// Read or write past the end of the pager.
    OutOfBounds { index: PageIndex, count: u64 },
    /// A negative page index.
    InvalidIndex(PageIndex),
    /// Injected fault for simulation.
    InjectedFault(String),
    /// An internal lock was poisoned by a panicking holder.
    LockPoisoned,
}

impl std::fmt::Display for PagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::OutOfBounds { index, count } => {
                write!(f, "page {index} out of bounds (total pages: {count})")
            }
            Self::InvalidIndex(index) => write!(f, "invalid page index: {index}"),
            Self::InjectedFault(msg) => write!(f, "injected fault: {msg}"),
            Self::LockPoisoned => write!(f, "pager lock poisoned"),
        }
    }
}

impl std::error::Error for PagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for PagerError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<std::io::Error> for PagerError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(StorageError::Io(e))
    }
}

/// Convert a page index to an array position, rejecting negatives.
pub(crate) fn position(index: PageIndex) -> Result<u64, PagerError> {
    u64::try_from(index).map_err(|_| PagerError::InvalidIndex(index))
}

/// Convert an array position back to a page index.
pub(crate) fn page_index(position: u64) -> Result<PageIndex, PagerError> {
    PageIndex::try_from(position).map_err(|_| PagerError::OutOfBounds {
        index: PageIndex::MAX,
        count: position,
    })
}

/// Abstraction over page-granular storage.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `read_pages_at` returns the last written content for each page
/// - concurrent appends never receive the same index
/// - `sync` makes all previous writes durable
pub trait Pager {
    /// Fill `pages` with consecutive pages starting at `index`.
    fn read_pages_at(&self, pages: &mut [Page], index: PageIndex) -> Result<(), PagerError>;

    /// Write `pages` consecutively starting at `index`, or append them at
    /// the end when `index` is `None`. Returns the index of the first page
    /// written.
    fn write_pages_at(&self, pages: &[Page], index: Option<PageIndex>)
    -> Result<PageIndex, PagerError>;

    /// Flush all previous writes to durable storage.
    fn sync(&self) -> Result<(), PagerError>;

    /// Number of pages currently stored.
    fn page_count(&self) -> Result<u64, PagerError>;

    fn read_page(&self, index: PageIndex) -> Result<Page, PagerError> {
        let mut pages = [Page::new()];
        self.read_pages_at(&mut pages, index)?;
        let [page] = pages;
        Ok(page)
    }

    fn write_page(&self, page: &Page, index: PageIndex) -> Result<(), PagerError> {
        self.write_pages_at(std::slice::from_ref(page), Some(index))
            .map(|_| ())
    }

    /// Append a page, returning its index.
    fn append_page(&self, page: &Page) -> Result<PageIndex, PagerError> {
        self.write_pages_at(std::slice::from_ref(page), None)
    }
}

impl<P: Pager + ?Sized> Pager for &P {
    fn read_pages_at(&self, pages: &mut [Page], index: PageIndex) -> Result<(), PagerError> {
        (**self).read_pages_at(pages, index)
    }

    fn write_pages_at(
        &self,
        pages: &[Page],
        index: Option<PageIndex>,
    ) -> Result<PageIndex, PagerError> {
        (**self).write_pages_at(pages, index)
    }

    fn sync(&self) -> Result<(), PagerError> {
        (**self).sync()
    }

    fn page_count(&self) -> Result<u64, PagerError> {
        (**self).page_count()
    }
}
