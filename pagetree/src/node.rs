//! Internal routing pages.
//!
//! A node with `n` keys has `n + 1` children. Child `-1` holds keys below
//! key 0; child `i` holds keys `>= key i` and below key `i + 1`.
//!
//! ```text
//! +--------+-------------------------------------------------------------+
//! | header | key offsets | keys ->      free      <- child[n-1] .. child[-1] |
//! +--------+-------------------------------------------------------------+
//! ```
//!
//! Children are 8-byte little-endian page indices packed at the end of the
//! body, so `tail` is always `(count + 1) * 8`.

#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use crate::page::{PAGE_SIZE, Page, PageHeader, PageIndex, PageKind, extra_offset};
use crate::slotted::{front, partition};

const BODY_OFFSET: usize = PageHeader::SIZE;

/// Body bytes available to keys, children and the key offset array.
pub const NODE_CAPACITY: usize = PAGE_SIZE - BODY_OFFSET;

const CHILD_SIZE: usize = 8;

/// An internal node page view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    page: Page,
}

impl Node {
    /// Create a node with no keys and a single child.
    #[must_use]
    pub fn new(leftmost: PageIndex) -> Self {
        let mut node = Self {
            page: Page::with_kind(PageKind::Node),
        };
        node.page.set_tail(CHILD_SIZE);
        node.set_child(-1, leftmost);
        node
    }

    /// Create a node routing keys below `key` to `left` and the rest to
    /// `right`.
    #[must_use]
    pub fn init(key: &[u8], left: PageIndex, right: PageIndex) -> Self {
        let mut node = Self::new(left);
        node.insert_key_child_at(0, key, right);
        node
    }

    /// Wrap a page whose kind byte is `Node`.
    ///
    /// # Panics
    ///
    /// Panics if the page is not a node.
    #[must_use]
    pub fn from_page(page: Page) -> Self {
        assert_eq!(
            page.kind(),
            Some(PageKind::Node),
            "page of kind 0x{:02x} is not a node",
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

    /// Number of keys.
    #[must_use]
    pub fn count(&self) -> usize {
        self.page.count()
    }

    fn body(&self) -> &[u8] {
        &self.page.as_bytes()[BODY_OFFSET..]
    }

    fn body_mut(&mut self) -> &mut [u8] {
        &mut self.page.as_bytes_mut()[BODY_OFFSET..]
    }

    /// Byte offset (within the body) of child `j`, for `j >= -1`.
    fn child_pos(j: isize) -> usize {
        assert!(j >= -1, "child index {j} out of range");
        NODE_CAPACITY - CHILD_SIZE * (j + 2) as usize
    }

    #[must_use]
    pub fn key(&self, i: usize) -> &[u8] {
        assert!(i < self.count(), "key index {i} out of range");
        front::item(self.body(), self.count(), i)
    }

    #[must_use]
    pub fn child(&self, j: isize) -> PageIndex {
        assert!(j < self.count() as isize, "child index {j} out of range");
        let pos = Self::child_pos(j);
        let mut bytes = [0u8; CHILD_SIZE];
        bytes.copy_from_slice(&self.body()[pos..pos + CHILD_SIZE]);
        PageIndex::from_le_bytes(bytes)
    }

    pub fn set_child(&mut self, j: isize, child: PageIndex) {
        let pos = Self::child_pos(j);
        self.body_mut()[pos..pos + CHILD_SIZE].copy_from_slice(&child.to_le_bytes());
    }

    /// Body bytes in use (`head + tail`).
    #[must_use]
    pub fn used(&self) -> usize {
        self.page.head() + self.page.tail()
    }

    /// Index of the child whose subtree covers `key`.
    #[must_use]
    pub fn find(&self, key: &[u8]) -> isize {
        partition(self.count(), |i| self.key(i) <= key) as isize - 1
    }

    /// Whether adding a key of `key_len` bytes (plus its child) would exceed
    /// the page capacity.
    #[must_use]
    pub fn overflow_after_insert(&self, key_len: usize) -> bool {
        let grown = extra_offset(self.count(), 1);
        (self.used() + key_len + CHILD_SIZE) as isize + grown > NODE_CAPACITY as isize
    }

    /// Insert `key` at `i` with `child` as its right child (child index `i`).
    ///
    /// # Panics
    ///
    /// Panics if the key does not fit.
    pub fn insert_key_child_at(&mut self, i: usize, key: &[u8], child: PageIndex) {
        let count = self.count();
        assert!(i <= count, "insert index {i} beyond count {count}");
        assert!(
            !self.overflow_after_insert(key.len()),
            "node key of {} bytes does not fit",
            key.len()
        );
        front::insert(self.body_mut(), count, i, key, std::iter::once(key.len()));
        self.open_children(count, i, 1);
        self.set_child(i as isize, child);
        self.sync_header(count + 1);
    }

    /// Move keys `[from, to)` and their right children into `dst`, inserting
    /// them at key position `at`.
    ///
    /// # Panics
    ///
    /// Panics if the range is invalid or the keys do not fit in `dst`.
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
        let grown = extra_offset(dst_count, moved as isize);
        assert!(
            (dst.used() + key_blob.len() + moved * CHILD_SIZE) as isize + grown
                <= NODE_CAPACITY as isize,
            "moved keys do not fit the destination node"
        );
        let key_base = front::start(body, from);
        let key_ends = (from..to).map(|i| front::end(body, i) - key_base);
        front::insert(dst.body_mut(), dst_count, at, key_blob, key_ends);

        // Children from..to sit contiguously, highest index first.
        let children = &body[Self::child_pos(to as isize - 1)..Self::child_pos(from as isize - 1)];
        dst.open_children(dst_count, at, moved);
        let dst_pos = Self::child_pos((at + moved) as isize - 1);
        dst.body_mut()[dst_pos..dst_pos + children.len()].copy_from_slice(children);
        dst.sync_header(dst_count + moved);

        self.remove_range(from, to);
    }

    /// Remove keys `[from, to)` and their right children.
    pub fn remove_range(&mut self, from: usize, to: usize) {
        let count = self.count();
        assert!(from <= to && to <= count, "invalid remove range {from}..{to} of {count}");
        if from == to {
            return;
        }
        let removed = to - from;
        let body = self.body_mut();
        front::remove(body, count, from, to);
        // Children to..count shift right into the gap.
        let start = Self::child_pos(count as isize - 1);
        let end = Self::child_pos(to as isize - 1);
        body.copy_within(start..end, start + removed * CHILD_SIZE);
        self.sync_header(count - removed);
    }

    /// Index of the first key at or past half of the stored key bytes.
    #[must_use]
    pub fn byte_midpoint(&self) -> usize {
        let count = self.count();
        let total = front::total(self.body(), count) + count * CHILD_SIZE;
        let mut acc = 0;
        for i in 0..count {
            if acc * 2 >= total {
                return i;
            }
            acc += self.key(i).len() + CHILD_SIZE;
        }
        count
    }

    /// Shift children `at..count` left to open `added` child slots at `at`.
    fn open_children(&mut self, count: usize, at: usize, added: usize) {
        let start = Self::child_pos(count as isize - 1);
        let end = Self::child_pos(at as isize - 1);
        self.body_mut()
            .copy_within(start..end, start - added * CHILD_SIZE);
    }

    fn sync_header(&mut self, count: usize) {
        let head = front::used(self.body(), count);
        self.page.set_count(count);
        self.page.set_head(head);
        self.page.set_tail((count + 1) * CHILD_SIZE);
    }
}
