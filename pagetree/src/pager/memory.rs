//! In-memory pager.

use std::sync::Mutex;

use crate::page::{Page, PageIndex};
use crate::pager::{Pager, PagerError, page_index, position};

/// A pager backed by a vector of pages. Sync is a no-op.
#[derive(Debug, Default)]
pub struct MemoryPager {
    pages: Mutex<Vec<Page>>,
}

impl MemoryPager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pager for MemoryPager {
    fn read_pages_at(&self, pages: &mut [Page], index: PageIndex) -> Result<(), PagerError> {
        let stored = self.pages.lock().map_err(|_| PagerError::LockPoisoned)?;
        let start = position(index)?;
        let count = stored.len() as u64;
        if start + pages.len() as u64 > count {
            return Err(PagerError::OutOfBounds { index, count });
        }
        // Bounded by the stored length above.
        #[allow(clippy::cast_possible_truncation)]
        let start = start as usize;
        for (page, src) in pages.iter_mut().zip(&stored[start..]) {
            page.as_bytes_mut().copy_from_slice(src.as_bytes());
        }
        Ok(())
    }

    fn write_pages_at(
        &self,
        pages: &[Page],
        index: Option<PageIndex>,
    ) -> Result<PageIndex, PagerError> {
        let mut stored = self.pages.lock().map_err(|_| PagerError::LockPoisoned)?;
        let count = stored.len() as u64;
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
        let first = page_index(start)?;
        #[allow(clippy::cast_possible_truncation)]
        let start = start as usize;
        for (offset, page) in pages.iter().enumerate() {
            let target = start + offset;
            if target < stored.len() {
                stored[target].as_bytes_mut().copy_from_slice(page.as_bytes());
            } else {
                stored.push(page.clone());
            }
        }
        drop(stored);
        Ok(first)
    }

    fn sync(&self) -> Result<(), PagerError> {
        Ok(())
    }

    fn page_count(&self) -> Result<u64, PagerError> {
        let stored = self.pages.lock().map_err(|_| PagerError::LockPoisoned)?;
        Ok(stored.len() as u64)
    }
}
