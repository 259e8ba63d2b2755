//! Forward iteration over the leaf chain.

use crate::leaf::Leaf;
use crate::pager::Pager;
use crate::tree::{Tree, TreeError};
use crate::value;

/// Iterator over `(key, value)` pairs in ascending key order.
///
/// Starts at the leftmost leaf and follows `next` links until the sentinel.
/// Iteration stops after the first error.
pub struct TreeIter<'t, P: Pager> {
    tree: &'t Tree<P>,
    leaf: Option<Leaf>,
    position: usize,
}

impl<'t, P: Pager> TreeIter<'t, P> {
    pub(crate) fn new(tree: &'t Tree<P>) -> Result<Self, TreeError> {
        let (leaf, _) = tree.leftmost_leaf()?;
        Ok(Self {
            tree,
            leaf: Some(leaf),
            position: 0,
        })
    }

    /// Advance to the next entry, or `None` once the sentinel is reached.
    pub fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>, TreeError> {
        loop {
            let Some(leaf) = &self.leaf else {
                return Ok(None);
            };
            if self.position < leaf.count() {
                let key = leaf.key(self.position).to_vec();
                let value = value::decode(self.tree.pager(), leaf.value(self.position))?;
                self.position += 1;
                return Ok(Some((key, value)));
            }

            let next = leaf.next();
            if next == self.tree.meta().sentinel {
                self.leaf = None;
                return Ok(None);
            }
            self.leaf = Some(self.tree.read_leaf(next)?);
            self.position = 0;
        }
    }
}

impl<P: Pager> Iterator for TreeIter<'_, P> {
    type Item = Result<(Vec<u8>, Vec<u8>), TreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.leaf = None;
                Some(Err(e))
            }
        }
    }
}
