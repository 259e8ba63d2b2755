//! Leaf pages: sorted keys with their encoded values.
//!
//! ```text
//! +--------+-----------+-------------------------------------------------+
//! | header | next (i64)| key offsets | keys ->   free   <- values | value offsets |
//! +--------+-----------+-------------------------------------------------+
//! ```
//!
//! Keys live in the front region and encoded values in the back region of
//! the body. `head` and `tail` in the header record the bytes used by each,
//! and `head + tail` never exceeds [`LEAF_CAPACITY`].

#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use crate::page::{Page, PageHeader, PageIndex, PageKind, extra_offset};
use crate::slotted::{back, front, partition};

const NEXT_OFFSET: usize = PageHeader::SIZE;
const BODY_OFFSET: usize = PageHeader::SIZE + 8;

/// Body bytes available to keys, values and their offset arrays.
pub const LEAF_CAPACITY: usize = crate::page::PAGE_SIZE - BODY_OFFSET;

/// Largest accepted key.
pub const MAX_KEY_SIZE: usize = 512;

/// Largest `key + encoded value` stored inline in a leaf.
pub const MAX_INLINE_ENTRY: usize = 1024;

/// A leaf page view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    page: Page,
}

impl Leaf {
    /// Create an empty leaf linked to `next`.
    #[must_use]
    pub fn new(next: PageIndex) -> Self {
        let mut page = Page::with_kind(PageKind::Leaf);
        page.write_i64(NEXT_OFFSET, next);
        Self { page }
    }

    /// Wrap a page whose kind byte is `Leaf`.
    ///
    /// # Panics
    ///
    /// Panics if the page is not a leaf.
    #[must_use]
    pub fn from_page(page: Page) -> Self {
        assert_eq!(
            page.kind(),
            Some(PageKind::Leaf),
            "page of kind 0x{:02x} is not a leaf",
            page.kind_byte()
        );
        Self { page }
    }

    #[must_use]
    pub const fn as_page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub fn into_page(self) -> Page {
        self.page
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.page.count()
    }

    /// Index of the next leaf in key order.
    #[must_use]
    pub fn next(&self) -> PageIndex {
        self.page.read_i64(NEXT_OFFSET)
    }

    pub fn set_next(&mut self, next: PageIndex) {
        self.page.write_i64(NEXT_OFFSET, next);
    }

    fn body(&self) -> &[u8] {
        &self.page.as_bytes()[BODY_OFFSET..]
    }

    fn body_mut(&mut self) -> &mut [u8] {
        &mut self.page.as_bytes_mut()[BODY_OFFSET..]
    }

    #[must_use]
    pub fn key(&self, i: usize) -> &[u8] {
        assert!(i < self.count(), "key index {i} out of range");
        front::item(self.body(), self.count(), i)
    }

    /// Encoded value at `i`.
    #[must_use]
    pub fn value(&self, i: usize) -> &[u8] {
        assert!(i < self.count(), "value index {i} out of range");
        back::item(self.body(), self.count(), i)
    }

    /// Body bytes in use (`head + tail`).
    #[must_use]
    pub fn used(&self) -> usize {
        self.page.head() + self.page.tail()
    }

    /// Bytes of key plus encoded value for entry `i`.
    #[must_use]
    pub fn entry_size(&self, i: usize) -> usize {
        self.key(i).len() + self.value(i).len()
    }

    /// Position of the largest key `<= key` (-1 if none) and whether it is
    /// an exact match.
    #[must_use]
    pub fn find(&self, key: &[u8]) -> (isize, bool) {
        let below = partition(self.count(), |i| self.key(i) <= key);
        let exact = below > 0 && self.key(below - 1) == key;
        (below as isize - 1, exact)
    }

    /// Whether inserting a new entry would exceed the page capacity.
    #[must_use]
    pub fn overflow_after_insert(&self, key_len: usize, value_len: usize) -> bool {
        let grown = 2 * extra_offset(self.count(), 1);
        (self.used() + key_len + value_len) as isize + grown > LEAF_CAPACITY as isize
    }

    /// Whether replacing the value at `i` would exceed the page capacity.
    #[must_use]
    pub fn overflow_after_set_value(&self, i: usize, value_len: usize) -> bool {
        self.used() - self.value(i).len() + value_len > LEAF_CAPACITY
    }

    /// Whether replacing both key and value at `i` would exceed the page
    /// capacity.
    #[must_use]
    pub fn overflow_after_set_key_value(&self, i: usize, key_len: usize, value_len: usize) -> bool {
        self.used() - self.entry_size(i) + key_len + value_len > LEAF_CAPACITY
    }

    /// Insert an entry at `index`, shifting later entries right.
    ///
    /// # Panics
    ///
    /// Panics if the entry does not fit; check [`Self::overflow_after_insert`] first.
    pub fn insert_at(&mut self, index: usize, key: &[u8], value: &[u8]) {
        let count = self.count();
        assert!(index <= count, "insert index {index} beyond count {count}");
        assert!(
            !self.overflow_after_insert(key.len(), value.len()),
            "leaf entry of {} bytes does not fit",
            key.len() + value.len()
        );
        let body = self.body_mut();
        front::insert(body, count, index, key, std::iter::once(key.len()));
        back::insert(body, count, index, value, std::iter::once(value.len()));
        self.sync_header(count + 1);
    }

    /// Replace the value at `i`.
    ///
    /// # Panics
    ///
    /// Panics if the new value does not fit.
    pub fn set_value_at(&mut self, i: usize, value: &[u8]) {
        assert!(
            !self.overflow_after_set_value(i, value.len()),
            "value of {} bytes does not fit",
            value.len()
        );
        let count = self.count();
        back::replace(self.body_mut(), count, i, value);
        self.sync_header(count);
    }

    /// Replace both key and value at `i`.
    ///
    /// # Panics
    ///
    /// Panics if the new entry does not fit.
    pub fn set_key_value_at(&mut self, i: usize, key: &[u8], value: &[u8]) {
        assert!(
            !self.overflow_after_set_key_value(i, key.len(), value.len()),
            "leaf entry of {} bytes does not fit",
            key.len() + value.len()
        );
        let count = self.count();
        let key_grows = key.len() > self.key(i).len();
        let body = self.body_mut();
        // Shrink one region before growing the other so they never overlap.
        if key_grows {
            back::replace(body, count, i, value);
            front::replace(body, count, i, key);
        } else {
            front::replace(body, count, i, key);
            back::replace(body, count, i, value);
        }
        self.sync_header(count);
    }

    /// Move entries `[from, to)` into `dst` at position `at`, removing them
    /// from this leaf.
    ///
    /// # Panics
    ///
    /// Panics if the range is invalid or the entries do not fit in `dst`.
    pub fn move_range(&mut self, dst: &mut Self, at: usize, from: usize, to: usize) {
        let count = self.count();
        assert!(from <= to && to <= count, "invalid move range {from}..{to} of {count}");
        if from == to {
            return;
        }
        let moved = to - from;
        let dst_count = dst.count();
        assert!(at <= dst_count, "insert index {at} beyond count {dst_count}");

        let body = self.body();
        let key_blob = front::items(body, count, from, to);
        let value_blob = back::items(body, count, from, to);
        let grown = 2 * extra_offset(dst_count, moved as isize);
        assert!(
            (dst.used() + key_blob.len() + value_blob.len()) as isize + grown
                <= LEAF_CAPACITY as isize,
            "moved entries do not fit the destination leaf"
        );

        let key_base = front::start(body, from);
        let value_base = back::start(body, from);
        let key_ends = (from..to).map(|i| front::end(body, i) - key_base);
        let value_ends = (from..to).map(|i| back::end(body, i) - value_base);

        let dst_body = dst.body_mut();
        front::insert(dst_body, dst_count, at, key_blob, key_ends);
        back::insert(dst_body, dst_count, at, value_blob, value_ends);
        dst.sync_header(dst_count + moved);

        let body = self.body_mut();
        front::remove(body, count, from, to);
        back::remove(body, count, from, to);
        self.sync_header(count - moved);
    }

    /// Index of the first entry at or past half of the stored bytes.
    #[must_use]
    pub fn byte_midpoint(&self) -> usize {
        let sizes: Vec<usize> = (0..self.count()).map(|i| self.entry_size(i)).collect();
        let total: usize = sizes.iter().sum();
        let mut acc = 0;
        for (i, size) in sizes.iter().enumerate() {
            if acc * 2 >= total {
                return i;
            }
            acc += size;
        }
        sizes.len()
    }

    fn sync_header(&mut self, count: usize) {
        let head = front::used(self.body(), count);
        let tail = back::used(self.body(), count);
        self.page.set_count(count);
        self.page.set_head(head);
        self.page.set_tail(tail);
    }
}
