//! Page types and constants for the tree.
//!
//! Every page is exactly `PAGE_SIZE` bytes and begins with the same 8-byte
//! header, so any page slot can be reinterpreted as any kind:
//!
//! ```text
//! +------+-------+-------------+-------------+-----------+
//! | kind | count | head (LE16) | tail (LE16) | (padding) |
//! +------+-------+-------------+-------------+-----------+
//!    1      1          2             2             2
//! ```

// PAGE_SIZE and every offset inside a page fit in u16.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use crate::leaf::Leaf;
use crate::node::Node;
use crate::overflow::Overflow;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Page size as u64 for offset calculations.
pub const PAGE_SIZE_U64: u64 = PAGE_SIZE as u64;

/// A page index. Stored on disk as a little-endian int64.
pub type PageIndex = i64;

/// Size of one entry in an offset array.
pub const OFFSET_SIZE: usize = 2;

/// Offset arrays grow and shrink in batches of this many entries.
pub const SLOT_BATCH: usize = 16;

/// Page kind identifiers stored in the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageKind {
    /// Never written, or zeroed.
    None = 0,
    /// Tree metadata (root pointer, sentinel, sequence).
    Meta = 1,
    /// Internal routing node.
    Node = 2,
    /// Leaf holding key/value pairs.
    Leaf = 3,
    /// One link of an oversized value chain.
    Overflow = 4,
}

impl TryFrom<u8> for PageKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Meta),
            2 => Ok(Self::Node),
            3 => Ok(Self::Leaf),
            4 => Ok(Self::Overflow),
            _ => Err(value),
        }
    }
}

/// Header present at the start of every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub kind: PageKind,
    /// Number of entries (keys for leaves and nodes).
    pub count: u8,
    /// Bytes used by the front-growing region.
    pub head: u16,
    /// Bytes used by the back-growing region.
    pub tail: u16,
}

impl PageHeader {
    /// Size of the page header in bytes.
    pub const SIZE: usize = 8;

    /// Serialize the header to bytes.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.kind as u8;
        buf[1] = self.count;
        buf[2..4].copy_from_slice(&self.head.to_le_bytes());
        buf[4..6].copy_from_slice(&self.tail.to_le_bytes());
        // bytes 6-7 padding
        buf
    }

    /// Deserialize a header from bytes.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, PageError> {
        let kind = PageKind::try_from(bytes[0]).map_err(PageError::UnknownKind)?;
        Ok(Self {
            kind,
            count: bytes[1],
            head: u16::from_le_bytes([bytes[2], bytes[3]]),
            tail: u16::from_le_bytes([bytes[4], bytes[5]]),
        })
    }
}

/// Number of offset-array entries reserved for `count` entries.
#[must_use]
pub const fn reserved_slots(count: usize) -> usize {
    count.div_ceil(SLOT_BATCH) * SLOT_BATCH
}

/// Bytes one offset array gains (positive) or releases (negative) when the
/// entry count changes from `count` by `delta`.
///
/// Zero unless the change crosses a `SLOT_BATCH` boundary.
#[must_use]
pub fn extra_offset(count: usize, delta: isize) -> isize {
    let target = count
        .checked_add_signed(delta)
        .unwrap_or_else(|| panic!("entry count {count} cannot change by {delta}"));
    (reserved_slots(target) as isize - reserved_slots(count) as isize) * OFFSET_SIZE as isize
}

/// A raw page buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    /// Create a new zeroed page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Create a zeroed page of the given kind.
    #[must_use]
    pub fn with_kind(kind: PageKind) -> Self {
        let mut page = Self::new();
        page.init(kind);
        page
    }

    /// Reset the page to an empty page of the given kind.
    pub fn init(&mut self, kind: PageKind) {
        self.data.fill(0);
        self.data[0] = kind as u8;
    }

    /// Get the raw page data.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Get mutable access to the raw page data.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    /// Read the page header.
    pub fn header(&self) -> Result<PageHeader, PageError> {
        let mut bytes = [0u8; PageHeader::SIZE];
        bytes.copy_from_slice(&self.data[..PageHeader::SIZE]);
        PageHeader::from_bytes(bytes)
    }

    /// The kind byte as stored, even if it is not a known kind.
    #[must_use]
    pub fn kind_byte(&self) -> u8 {
        self.data[0]
    }

    /// The page kind, or `None` for an unknown kind byte.
    #[must_use]
    pub fn kind(&self) -> Option<PageKind> {
        PageKind::try_from(self.data[0]).ok()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        usize::from(self.data[1])
    }

    pub fn set_count(&mut self, count: usize) {
        self.data[1] = u8::try_from(count)
            .unwrap_or_else(|_| panic!("entry count {count} does not fit the page header"));
    }

    #[must_use]
    pub fn head(&self) -> usize {
        usize::from(self.read_u16(2))
    }

    pub fn set_head(&mut self, head: usize) {
        self.write_u16(2, head as u16);
    }

    #[must_use]
    pub fn tail(&self) -> usize {
        usize::from(self.read_u16(4))
    }

    pub fn set_tail(&mut self, tail: usize) {
        self.write_u16(4, tail as u16);
    }

    /// Read bytes at a specific offset.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Write bytes at a specific offset.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Read a u16 (little-endian) at the given offset.
    #[must_use]
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    /// Write a u16 (little-endian) at the given offset.
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Read a u64 (little-endian) at the given offset.
    #[must_use]
    pub fn read_u64(&self, offset: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(bytes)
    }

    /// Write a u64 (little-endian) at the given offset.
    pub fn write_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Read an i64 (little-endian) at the given offset.
    #[must_use]
    pub fn read_i64(&self, offset: usize) -> i64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[offset..offset + 8]);
        i64::from_le_bytes(bytes)
    }

    /// Write an i64 (little-endian) at the given offset.
    pub fn write_i64(&mut self, offset: usize, value: i64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Reinterpret the page according to its kind byte.
    pub fn typed(self) -> Result<TypedPage, PageError> {
        let kind = PageKind::try_from(self.kind_byte()).map_err(PageError::UnknownKind)?;
        Ok(match kind {
            PageKind::None => TypedPage::Empty(self),
            PageKind::Meta => TypedPage::Meta(self),
            PageKind::Node => TypedPage::Node(Node::from_page(self)),
            PageKind::Leaf => TypedPage::Leaf(Leaf::from_page(self)),
            PageKind::Overflow => TypedPage::Overflow(Overflow::from_page(self)),
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("header", &&self.data[..PageHeader::SIZE])
            .finish_non_exhaustive()
    }
}

/// A page viewed according to its header kind.
///
/// Meta pages stay raw; decode them with [`crate::meta::Meta::from_page`],
/// which validates magic and version.
#[derive(Debug)]
pub enum TypedPage {
    Empty(Page),
    Meta(Page),
    Node(Node),
    Leaf(Leaf),
    Overflow(Overflow),
}

impl TypedPage {
    #[must_use]
    pub const fn kind(&self) -> PageKind {
        match self {
            Self::Empty(_) => PageKind::None,
            Self::Meta(_) => PageKind::Meta,
            Self::Node(_) => PageKind::Node,
            Self::Leaf(_) => PageKind::Leaf,
            Self::Overflow(_) => PageKind::Overflow,
        }
    }
}

/// Errors related to page decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    /// The kind byte is not a known page kind.
    UnknownKind(u8),
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKind(v) => write!(f, "unknown page kind: 0x{v:02x}"),
        }
    }
}

impl std::error::Error for PageError {}
