//! Meta page structure and serialization.
//!
//! The meta page anchors a tree: it names the current root, the sentinel
//! leaf that terminates the leaf chain, and a commit sequence number.

use crate::page::{Page, PageIndex, PageKind};

/// Magic number identifying a tree meta page: "PAGETREE"
pub const MAGIC: [u8; 8] = *b"PAGETREE";

/// Current format version.
pub const FORMAT_VERSION: u64 = 1;

/// Meta page field offsets (after the common page header).
mod offsets {
    pub const MAGIC: usize = 8;
    pub const FORMAT_VERSION: usize = 16;
    pub const ROOT: usize = 24;
    pub const SENTINEL: usize = 32;
    pub const SEQUENCE: usize = 40;
}

/// Decoded contents of a meta page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Meta {
    /// Index of the root page (a leaf or a node).
    pub root: PageIndex,
    /// Index of the sentinel leaf; the last real leaf links to it.
    pub sentinel: PageIndex,
    /// Incremented on every commit.
    pub sequence: u64,
}

impl Meta {
    /// Serialize into a fresh meta page.
    #[must_use]
    pub fn to_page(&self) -> Page {
        let mut page = Page::with_kind(PageKind::Meta);
        page.write_bytes(offsets::MAGIC, &MAGIC);
        page.write_u64(offsets::FORMAT_VERSION, FORMAT_VERSION);
        page.write_i64(offsets::ROOT, self.root);
        page.write_i64(offsets::SENTINEL, self.sentinel);
        page.write_u64(offsets::SEQUENCE, self.sequence);
        page
    }

    /// Deserialize a meta page, validating kind, magic and version.
    pub fn from_page(page: &Page) -> Result<Self, MetaError> {
        if page.kind() != Some(PageKind::Meta) {
            return Err(MetaError::WrongKind(page.kind_byte()));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(page.read_bytes(offsets::MAGIC, 8));
        if magic != MAGIC {
            return Err(MetaError::InvalidMagic(magic));
        }

        let version = page.read_u64(offsets::FORMAT_VERSION);
        if version != FORMAT_VERSION {
            return Err(MetaError::UnsupportedVersion(version));
        }

        Ok(Self {
            root: page.read_i64(offsets::ROOT),
            sentinel: page.read_i64(offsets::SENTINEL),
            sequence: page.read_u64(offsets::SEQUENCE),
        })
    }
}

/// Errors that can occur when reading a meta page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    /// The page is not a meta page.
    WrongKind(u8),
    /// Invalid magic number.
    InvalidMagic([u8; 8]),
    /// Unsupported format version.
    UnsupportedVersion(u64),
}

impl std::fmt::Display for MetaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongKind(kind) => write!(f, "expected a meta page, found kind 0x{kind:02x}"),
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "invalid magic number: {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
        }
    }
}

impl std::error::Error for MetaError {}
