//! Shadow-copy transactions.
//!
//! The first time a transaction overwrites a page that existed when it
//! began, the page's current content is appended as a backup and recorded in
//! a map from original to backup index. Rollback copies every backup back
//! over its original. Pages appended during the transaction are never backed
//! up: nothing reachable from the restored tree points at them.
//!
//! New pages (split siblings, new roots) are always written before the pages
//! that reference them.
//!
//! Known simplifications: pages orphaned by an aborted transaction, backups
//! of committed transactions and overflow chains of overwritten values are
//! not reclaimed.

// Positions are `-1..count` and page counts fit in a u8 header field.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::collections::BTreeMap;

use crate::leaf::{Leaf, MAX_KEY_SIZE};
use crate::meta::Meta;
use crate::node::Node;
use crate::page::{Page, PageIndex, TypedPage};
use crate::pager::{self, Pager};
use crate::tree::{Tree, TreeError, read_typed};
use crate::value;

/// A node visited on the way down, with the child position taken.
struct PathEntry {
    node: Node,
    index: PageIndex,
    position: isize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Committed,
    Aborted,
}

/// A write transaction over a [`Tree`].
///
/// Dropping an active transaction rolls it back.
pub struct Transaction<'t, P: Pager> {
    tree: &'t mut Tree<P>,
    path: Vec<PathEntry>,
    /// Original page index -> backup page index.
    backups: BTreeMap<PageIndex, PageIndex>,
    /// Pages at or past this index were allocated by this transaction.
    fresh_from: PageIndex,
    /// Meta as of `begin`, restored in memory on rollback.
    meta_before: Meta,
    state: State,
}

impl<'t, P: Pager> Transaction<'t, P> {
    pub(crate) fn new(tree: &'t mut Tree<P>) -> Result<Self, TreeError> {
        let fresh_from = pager::page_index(tree.pager.page_count()?)?;
        let meta_before = tree.meta;
        Ok(Self {
            tree,
            path: Vec::new(),
            backups: BTreeMap::new(),
            fresh_from,
            meta_before,
            state: State::Active,
        })
    }

    /// Insert `key` or replace its value.
    ///
    /// On a pager error the transaction is rolled back and closed.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TreeError> {
        self.ensure_active()?;
        if key.len() > MAX_KEY_SIZE {
            return Err(TreeError::KeyTooLarge {
                len: key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        self.apply_set(key, value).inspect_err(|e| {
            if e.is_io() {
                self.abort_after_failure();
            }
        })
    }

    /// Deletion is not supported.
    pub fn del(&mut self, _key: &[u8]) -> Result<(), TreeError> {
        self.ensure_active()?;
        Err(TreeError::NotImplemented("delete"))
    }

    /// Look up `key`, seeing this transaction's own writes.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TreeError> {
        self.ensure_active()?;
        self.tree.get(key)
    }

    pub fn has(&self, key: &[u8]) -> Result<bool, TreeError> {
        self.ensure_active()?;
        self.tree.has(key)
    }

    /// Make the transaction's writes durable.
    pub fn commit(mut self) -> Result<(), TreeError> {
        self.ensure_active()?;
        if let Err(e) = self.write_meta_and_sync() {
            self.abort_after_failure();
            return Err(e);
        }

        self.state = State::Committed;
        tracing::info!(
            "committed transaction {} ({} pages shadowed)",
            self.tree.meta.sequence,
            self.backups.len()
        );
        Ok(())
    }

    /// Restore every page this transaction overwrote.
    pub fn rollback(mut self) -> Result<(), TreeError> {
        self.ensure_active()?;
        let restored = self.restore();
        self.state = State::Aborted;
        restored
    }

    /// Shadow-copy `index` unless it is already backed up or was allocated
    /// by this transaction.
    pub fn backup_page(&mut self, index: PageIndex) -> Result<(), TreeError> {
        if index >= self.fresh_from || self.backups.contains_key(&index) {
            return Ok(());
        }
        let page = self.tree.pager.read_page(index)?;
        let backup = self.tree.pager.append_page(&page)?;
        self.backups.insert(index, backup);
        Ok(())
    }

    /// Number of pages shadow-copied so far.
    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    fn ensure_active(&self) -> Result<(), TreeError> {
        if self.state == State::Active {
            Ok(())
        } else {
            Err(TreeError::TransactionClosed)
        }
    }

    fn write_existing(&mut self, index: PageIndex, page: &Page) -> Result<(), TreeError> {
        self.backup_page(index)?;
        self.tree.pager.write_page(page, index)?;
        Ok(())
    }

    fn apply_set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TreeError> {
        let (mut leaf, leaf_index) = self.descend(key)?;
        let (position, exact) = leaf.find(key);
        let encoded = value::encode(&self.tree.pager, key.len(), value)?;

        let (byte_overflow, fanout_overflow) = if exact {
            let overflow = leaf.overflow_after_set_value(position as usize, encoded.len());
            (overflow, false)
        } else {
            (
                leaf.overflow_after_insert(key.len(), encoded.len()),
                leaf.count() + 1 > self.tree.config.max_entries(),
            )
        };

        if !byte_overflow && !fanout_overflow {
            if exact {
                leaf.set_value_at(position as usize, &encoded);
            } else {
                leaf.insert_at((position + 1) as usize, key, &encoded);
            }
            return self.write_existing(leaf_index, leaf.as_page());
        }

        let half = split_half(leaf.count(), byte_overflow, leaf.byte_midpoint());
        let right = split_leaf(&mut leaf, position, exact, key, &encoded, half);
        let right_index = self.tree.pager.append_page(right.as_page())?;
        leaf.set_next(right_index);
        self.write_existing(leaf_index, leaf.as_page())?;
        tracing::debug!(
            "split leaf {} at {}: {} entries stay, {} move to leaf {}",
            leaf_index,
            half,
            leaf.count(),
            right.count(),
            right_index
        );

        self.propagate(leaf_index, right.key(0).to_vec(), right_index)
    }

    /// Descend to the leaf covering `key`, recording the node path.
    fn descend(&mut self, key: &[u8]) -> Result<(Leaf, PageIndex), TreeError> {
        self.path.clear();
        let mut index = self.tree.meta.root;
        loop {
            match read_typed(&self.tree.pager, index)? {
                TypedPage::Node(node) => {
                    let position = node.find(key);
                    let child = node.child(position);
                    self.path.push(PathEntry {
                        node,
                        index,
                        position,
                    });
                    index = child;
                }
                TypedPage::Leaf(leaf) => return Ok((leaf, index)),
                other => {
                    return Err(TreeError::UnexpectedPage {
                        index,
                        kind: other.kind() as u8,
                    });
                }
            }
        }
    }

    /// Insert `separator -> right` into the parents of `child`, splitting
    /// nodes and growing the root as needed.
    fn propagate(
        &mut self,
        mut child: PageIndex,
        mut separator: Vec<u8>,
        mut right: PageIndex,
    ) -> Result<(), TreeError> {
        let max_entries = self.tree.config.max_entries();
        while let Some(PathEntry {
            mut node,
            index,
            position,
        }) = self.path.pop()
        {
            node.set_child(position, child);
            let byte_overflow = node.overflow_after_insert(separator.len());
            if !byte_overflow && node.count() < max_entries {
                node.insert_key_child_at((position + 1) as usize, &separator, right);
                return self.write_existing(index, node.as_page());
            }

            let half = split_half(node.count(), byte_overflow, node.byte_midpoint());
            let (promoted, sibling) = split_node(&mut node, position, &separator, right, half);
            let sibling_index = self.tree.pager.append_page(sibling.as_page())?;
            self.write_existing(index, node.as_page())?;
            tracing::debug!(
                "split node {} at {}: {} keys stay, {} move to node {}",
                index,
                half,
                node.count(),
                sibling.count(),
                sibling_index
            );

            child = index;
            separator = promoted;
            right = sibling_index;
        }
        self.grow_root(child, &separator, right)
    }

    fn grow_root(
        &mut self,
        left: PageIndex,
        separator: &[u8],
        right: PageIndex,
    ) -> Result<(), TreeError> {
        let root = Node::init(separator, left, right);
        let root_index = self.tree.pager.append_page(root.as_page())?;
        self.backup_page(self.tree.meta_index)?;
        self.tree.meta.root = root_index;
        let meta_page = self.tree.meta.to_page();
        self.tree.pager.write_page(&meta_page, self.tree.meta_index)?;
        tracing::info!(
            "tree grew a new root {} over pages {} and {}",
            root_index,
            left,
            right
        );
        Ok(())
    }

    fn write_meta_and_sync(&mut self) -> Result<(), TreeError> {
        self.backup_page(self.tree.meta_index)?;
        self.tree.meta.sequence += 1;
        let meta_page = self.tree.meta.to_page();
        self.tree.pager.write_page(&meta_page, self.tree.meta_index)?;
        self.tree.pager.sync()?;
        Ok(())
    }

    /// Copy every backup over its original.
    ///
    /// The in-memory meta goes back first so lookups never follow pages
    /// this transaction wrote, even if the copies below fail.
    fn restore(&mut self) -> Result<(), TreeError> {
        self.tree.meta = self.meta_before;
        for (&original, &backup) in &self.backups {
            let page = self.tree.pager.read_page(backup)?;
            self.tree.pager.write_page(&page, original)?;
        }
        self.tree.pager.sync()?;
        tracing::info!(
            "rolled back transaction, restored {} pages",
            self.backups.len()
        );
        Ok(())
    }

    fn abort_after_failure(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("rollback after failed write did not complete: {e}");
        }
        self.state = State::Aborted;
    }
}

impl<P: Pager> Drop for Transaction<'_, P> {
    fn drop(&mut self) {
        if self.state == State::Active {
            tracing::warn!("transaction dropped while active, rolling back");
            if let Err(e) = self.restore() {
                tracing::warn!("rollback of dropped transaction failed: {e}");
            }
            self.state = State::Aborted;
        }
    }
}

/// Split boundary: half the entries for a fanout overflow, the byte
/// midpoint for a capacity overflow. Both sides keep at least one entry.
fn split_half(count: usize, byte_overflow: bool, midpoint: usize) -> usize {
    let half = if byte_overflow { midpoint } else { count / 2 };
    half.clamp(1, count - 1)
}

/// Split `leaf` around `half` and apply the pending write to whichever side
/// owns `position`. Returns the new right sibling, linked to the old `next`.
fn split_leaf(
    leaf: &mut Leaf,
    position: isize,
    exact: bool,
    key: &[u8],
    encoded: &[u8],
    half: usize,
) -> Leaf {
    let count = leaf.count();
    let into_left = position < half as isize - 1;
    let split_at = if into_left { half - 1 } else { half };

    let mut right = Leaf::new(leaf.next());
    leaf.move_range(&mut right, 0, split_at, count);

    if exact {
        let p = position as usize;
        if p < split_at {
            leaf.set_value_at(p, encoded);
        } else {
            right.set_value_at(p - split_at, encoded);
        }
    } else if into_left {
        leaf.insert_at((position + 1) as usize, key, encoded);
    } else {
        right.insert_at((position + 1) as usize - split_at, key, encoded);
    }
    right
}

/// Split `node` around `half` while inserting `key -> child` after
/// `position`. Returns the key promoted to the parent and the new right
/// sibling.
fn split_node(
    node: &mut Node,
    position: isize,
    key: &[u8],
    child: PageIndex,
    half: usize,
) -> (Vec<u8>, Node) {
    let count = node.count();
    let h = half as isize;

    if position < h - 1 {
        let promoted = node.key(half - 1).to_vec();
        let mut right = Node::new(node.child(h - 1));
        node.move_range(&mut right, 0, half, count);
        node.remove_range(half - 1, half);
        node.insert_key_child_at((position + 1) as usize, key, child);
        (promoted, right)
    } else if position == h - 1 {
        let mut right = Node::new(child);
        node.move_range(&mut right, 0, half, count);
        (key.to_vec(), right)
    } else {
        let promoted = node.key(half).to_vec();
        let mut right = Node::new(node.child(h));
        node.move_range(&mut right, 0, half + 1, count);
        node.remove_range(half, half + 1);
        right.insert_key_child_at((position - h) as usize, key, child);
        (promoted, right)
    }
}
