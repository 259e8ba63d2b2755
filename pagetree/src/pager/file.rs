//! File-backed pager.

use std::path::Path;

use crate::file::LocalFile;
use crate::io::Storage;
use crate::page::{PAGE_SIZE, PAGE_SIZE_U64, Page, PageIndex};
use crate::pager::{Pager, PagerError, page_index, position};

/// A pager storing page `i` at byte offset `i * PAGE_SIZE` of a storage
/// backend.
#[derive(Debug)]
pub struct FilePager<S: Storage = LocalFile> {
    storage: S,
}

impl FilePager<LocalFile> {
    /// Open (or create) the page file at `path`.
    pub fn open(path: &Path) -> Result<Self, PagerError> {
        Self::new(LocalFile::open(path)?)
    }
}

impl<S: Storage> FilePager<S> {
    /// Wrap a storage backend.
    ///
    /// A trailing partial page, left by an interrupted append, is truncated
    /// away so the pager only ever sees whole pages.
    pub fn new(storage: S) -> Result<Self, PagerError> {
        let size = storage.size()?;
        let torn = size % PAGE_SIZE_U64;
        if torn != 0 {
            tracing::warn!("truncating {torn} bytes of a partial trailing page (file size {size})");
            storage.truncate(size - torn)?;
            storage.sync()?;
        }
        Ok(Self { storage })
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn count(&self) -> Result<u64, PagerError> {
        Ok(self.storage.size()? / PAGE_SIZE_U64)
    }
}

impl<S: Storage> Pager for FilePager<S> {
    fn read_pages_at(&self, pages: &mut [Page], index: PageIndex) -> Result<(), PagerError> {
        let start = position(index)?;
        let count = self.count()?;
        if start + pages.len() as u64 > count {
            return Err(PagerError::OutOfBounds { index, count });
        }
        for (offset, page) in (start..).zip(pages.iter_mut()) {
            self.storage
                .read_at(page.as_bytes_mut(), offset * PAGE_SIZE_U64)?;
        }
        Ok(())
    }

    fn write_pages_at(
        &self,
        pages: &[Page],
        index: Option<PageIndex>,
    ) -> Result<PageIndex, PagerError> {
        // Held across the size query and the write so appenders never share
        // an index.
        let _guard = self.storage.lock()?;
        let count = self.count()?;
        let start = match index {
            Some(index) => position(index)?,
            None => count,
        };
        if start > count {
            return Err(PagerError::OutOfBounds {
                index: page_index(start)?,
                count,
            });
        }

        if let [page] = pages {
            self.storage.write_at(page.as_bytes(), start * PAGE_SIZE_U64)?;
        } else {
            let mut buf = Vec::with_capacity(pages.len() * PAGE_SIZE);
            for page in pages {
                buf.extend_from_slice(page.as_bytes());
            }
            self.storage.write_at(&buf, start * PAGE_SIZE_U64)?;
        }
        page_index(start)
    }

    fn sync(&self) -> Result<(), PagerError> {
        self.storage.sync()?;
        Ok(())
    }

    fn page_count(&self) -> Result<u64, PagerError> {
        self.count()
    }
}
