//! Copy-on-write B+tree over a pager.
//!
//! A tree is anchored by a meta page at a caller-chosen index. Reads descend
//! from the root recorded there; all mutation goes through a
//! [`Transaction`], which shadow-copies every pre-existing page before
//! overwriting it so the tree can be restored if the transaction aborts.
//!
//! Leaves are chained in key order through their `next` link. The last real
//! leaf links to a dedicated empty sentinel leaf, which is never written to
//! and marks the end of iteration.

use crate::config::TreeConfig;
use crate::cursor::TreeIter;
use crate::leaf::Leaf;
use crate::meta::{Meta, MetaError};
use crate::page::{PageError, PageIndex, PageKind, TypedPage};
use crate::pager::{self, Pager, PagerError};
use crate::transaction::Transaction;
use crate::value;

/// A B+tree stored in the pages of `P`.
pub struct Tree<P: Pager> {
    pub(crate) pager: P,
    pub(crate) meta_index: PageIndex,
    pub(crate) meta: Meta,
    pub(crate) config: TreeConfig,
}

impl<P: Pager> Tree<P> {
    /// Open the tree whose meta page is at `meta_index`, creating an empty
    /// tree there if the page does not exist yet or has never been written.
    pub fn open_or_create(pager: P, meta_index: PageIndex) -> Result<Self, TreeError> {
        Self::open_or_create_with_config(pager, meta_index, TreeConfig::default())
    }

    pub fn open_or_create_with_config(
        pager: P,
        meta_index: PageIndex,
        config: TreeConfig,
    ) -> Result<Self, TreeError> {
        if pager::position(meta_index)? < pager.page_count()? {
            let page = pager.read_page(meta_index)?;
            if page.kind() != Some(PageKind::None) {
                let meta = Meta::from_page(&page)?;
                tracing::info!(
                    "opened tree at meta page {} (root {}, sequence {})",
                    meta_index,
                    meta.root,
                    meta.sequence
                );
                return Ok(Self {
                    pager,
                    meta_index,
                    meta,
                    config,
                });
            }
        }
        Self::create(pager, meta_index, config)
    }

    fn create(pager: P, meta_index: PageIndex, config: TreeConfig) -> Result<Self, TreeError> {
        let mut meta = Meta {
            root: 0,
            sentinel: 0,
            sequence: 0,
        };
        pager.write_page(&meta.to_page(), meta_index)?;
        meta.sentinel = pager.append_page(Leaf::new(0).as_page())?;
        meta.root = pager.append_page(Leaf::new(meta.sentinel).as_page())?;
        pager.write_page(&meta.to_page(), meta_index)?;
        pager.sync()?;

        tracing::info!(
            "created tree at meta page {} (root {}, sentinel {})",
            meta_index,
            meta.root,
            meta.sentinel
        );
        Ok(Self {
            pager,
            meta_index,
            meta,
            config,
        })
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TreeError> {
        let (leaf, _) = self.find_leaf(key)?;
        match leaf.find(key) {
            (position, true) => {
                let encoded = leaf.value(position.unsigned_abs());
                Ok(Some(value::decode(&self.pager, encoded)?))
            }
            _ => Ok(None),
        }
    }

    /// Whether `key` is present. Does not read overflow chains.
    pub fn has(&self, key: &[u8]) -> Result<bool, TreeError> {
        let (leaf, _) = self.find_leaf(key)?;
        Ok(leaf.find(key).1)
    }

    /// Iterate all entries in ascending key order.
    pub fn iter(&self) -> Result<TreeIter<'_, P>, TreeError> {
        TreeIter::new(self)
    }

    /// Start a transaction. The tree is exclusively borrowed until it ends.
    pub fn begin(&mut self) -> Result<Transaction<'_, P>, TreeError> {
        Transaction::new(self)
    }

    /// Number of entries, counted by walking the leaf chain.
    pub fn entry_count(&self) -> Result<usize, TreeError> {
        let (mut leaf, _) = self.leftmost_leaf()?;
        let mut total = leaf.count();
        while leaf.next() != self.meta.sentinel {
            leaf = self.read_leaf(leaf.next())?;
            total += leaf.count();
        }
        Ok(total)
    }

    #[must_use]
    pub const fn meta(&self) -> &Meta {
        &self.meta
    }

    #[must_use]
    pub const fn meta_index(&self) -> PageIndex {
        self.meta_index
    }

    #[must_use]
    pub const fn pager(&self) -> &P {
        &self.pager
    }

    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[must_use]
    pub fn into_pager(self) -> P {
        self.pager
    }

    /// Descend from the root to the leaf covering `key`.
    pub(crate) fn find_leaf(&self, key: &[u8]) -> Result<(Leaf, PageIndex), TreeError> {
        let mut index = self.meta.root;
        loop {
            match read_typed(&self.pager, index)? {
                TypedPage::Node(node) => index = node.child(node.find(key)),
                TypedPage::Leaf(leaf) => return Ok((leaf, index)),
                other => return Err(TreeError::unexpected(index, &other)),
            }
        }
    }

    pub(crate) fn leftmost_leaf(&self) -> Result<(Leaf, PageIndex), TreeError> {
        let mut index = self.meta.root;
        loop {
            match read_typed(&self.pager, index)? {
                TypedPage::Node(node) => index = node.child(-1),
                TypedPage::Leaf(leaf) => return Ok((leaf, index)),
                other => return Err(TreeError::unexpected(index, &other)),
            }
        }
    }

    pub(crate) fn read_leaf(&self, index: PageIndex) -> Result<Leaf, TreeError> {
        match read_typed(&self.pager, index)? {
            TypedPage::Leaf(leaf) => Ok(leaf),
            other => Err(TreeError::unexpected(index, &other)),
        }
    }
}

/// Read a page and view it according to its kind byte.
pub(crate) fn read_typed<P: Pager + ?Sized>(
    pager: &P,
    index: PageIndex,
) -> Result<TypedPage, TreeError> {
    let page = pager.read_page(index)?;
    page.typed()
        .map_err(|PageError::UnknownKind(kind)| TreeError::UnexpectedPage { index, kind })
}

/// Errors that can occur during tree operations.
#[derive(Debug)]
pub enum TreeError {
    /// Pager I/O error.
    Pager(PagerError),
    /// The meta page exists but is not a compatible tree.
    FormatMismatch(MetaError),
    /// A page of the wrong kind was found where the tree expected another.
    UnexpectedPage { index: PageIndex, kind: u8 },
    /// A stored value could not be decoded.
    CorruptValue { reason: &'static str },
    /// Key longer than `MAX_KEY_SIZE`.
    KeyTooLarge { len: usize, max: usize },
    /// The operation is not supported.
    NotImplemented(&'static str),
    /// The transaction was already committed or aborted.
    TransactionClosed,
}

impl TreeError {
    fn unexpected(index: PageIndex, page: &TypedPage) -> Self {
        Self::UnexpectedPage {
            index,
            kind: page.kind() as u8,
        }
    }

    /// Whether the error came from the pager, leaving a write half done.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Pager(_))
    }
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pager(e) => write!(f, "pager error: {e}"),
            Self::FormatMismatch(e) => write!(f, "format mismatch: {e}"),
            Self::UnexpectedPage { index, kind } => {
                write!(f, "unexpected page kind 0x{kind:02x} at page {index}")
            }
            Self::CorruptValue { reason } => write!(f, "corrupt value: {reason}"),
            Self::KeyTooLarge { len, max } => {
                write!(f, "key of {len} bytes exceeds the maximum of {max}")
            }
            Self::NotImplemented(op) => write!(f, "{op} is not implemented"),
            Self::TransactionClosed => write!(f, "transaction already closed"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pager(e) => Some(e),
            Self::FormatMismatch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PagerError> for TreeError {
    fn from(e: PagerError) -> Self {
        Self::Pager(e)
    }
}

impl From<MetaError> for TreeError {
    fn from(e: MetaError) -> Self {
        Self::FormatMismatch(e)
    }
}
