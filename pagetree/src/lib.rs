//! Embedded page-oriented B+tree key/value storage.
//!
//! Keys and values are arbitrary byte strings. The tree lives in fixed-size
//! pages managed by a [`Pager`], either in memory or in a single file.
//!
//! # Page layout
//!
//! - Meta page at a caller-chosen index: root, sentinel leaf, commit sequence
//! - Node pages: routing keys and child indices
//! - Leaf pages: sorted keys and encoded values, chained in key order
//! - Overflow pages: spilled tails of values too large to store inline
//!
//! # Usage
//!
//! ```ignore
//! use pagetree::{FilePager, Tree};
//!
//! let pager = FilePager::open(path)?;
//! let mut tree = Tree::open_or_create(pager, 0)?;
//!
//! let mut txn = tree.begin()?;
//! txn.set(b"hello", b"world")?;
//! txn.commit()?;
//!
//! assert_eq!(tree.get(b"hello")?, Some(b"world".to_vec()));
//! for entry in tree.iter()? {
//!     let (key, value) = entry?;
//! }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod cursor;
pub mod file;
pub mod io;
pub mod leaf;
pub mod meta;
pub mod node;
pub mod overflow;
pub mod page;
pub mod pager;
pub mod simulation;
mod slotted;
pub mod transaction;
pub mod tree;
pub mod value;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, TreeConfig};
pub use cursor::TreeIter;
pub use meta::{Meta, MetaError};
pub use page::{PAGE_SIZE, Page, PageIndex, PageKind, TypedPage};
pub use pager::{FilePager, MemoryPager, Pager, PagerError};
pub use transaction::Transaction;
pub use tree::{Tree, TreeError};
