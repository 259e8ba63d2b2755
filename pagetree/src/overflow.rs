//! Overflow pages hold the spilled tail of oversized values.
//!
//! Data fills the body from its end backward, so a page written once holds
//! a contiguous run of the value in order. `next` chains to the page
//! holding the following run, or 0 at the end of the chain.

use crate::page::{PAGE_SIZE, Page, PageHeader, PageIndex, PageKind};

const NEXT_OFFSET: usize = PageHeader::SIZE;
const BODY_OFFSET: usize = PageHeader::SIZE + 8;

/// Value bytes one overflow page can hold.
pub const OVERFLOW_CAPACITY: usize = PAGE_SIZE - BODY_OFFSET;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overflow {
    page: Page,
}

impl Overflow {
    #[must_use]
    pub fn new(next: PageIndex) -> Self {
        let mut page = Page::with_kind(PageKind::Overflow);
        page.write_i64(NEXT_OFFSET, next);
        Self { page }
    }

    /// # Panics
    ///
    /// Panics if the page is not an overflow page.
    #[must_use]
    pub fn from_page(page: Page) -> Self {
        assert_eq!(
            page.kind(),
            Some(PageKind::Overflow),
            "page of kind 0x{:02x} is not an overflow page",
            page.kind_byte()
        );
        Self { page }
    }

    #[must_use]
    pub const fn as_page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub fn next(&self) -> PageIndex {
        self.page.read_i64(NEXT_OFFSET)
    }

    pub fn set_next(&mut self, next: PageIndex) {
        self.page.write_i64(NEXT_OFFSET, next);
    }

    /// Value bytes stored on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.page.tail()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn free(&self) -> usize {
        OVERFLOW_CAPACITY - self.len()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.page.as_bytes()[PAGE_SIZE - self.len()..]
    }

    /// Store as many trailing bytes of `value` as fit, returning the prefix
    /// that did not.
    pub fn set_value<'v>(&mut self, value: &'v [u8]) -> &'v [u8] {
        let take = value.len().min(self.free());
        let (rest, stored) = value.split_at(value.len() - take);
        let end = PAGE_SIZE - self.len();
        self.page.write_bytes(end - take, stored);
        self.page.set_tail(self.len() + take);
        rest
    }
}
