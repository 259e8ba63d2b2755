//! Common helpers for end-to-end tests.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::node::Node;
use crate::page::{PageIndex, TypedPage};
use crate::pager::Pager;
use crate::tree::{Tree, read_typed};

pub use crate::testing::{
    collect, config, init_tracing, insert_all, key, memory_tree, random_bytes, rng, value_for,
};

/// Pairs `key(i) -> value_for(i)` for every `i` in `range`.
pub fn numbered(range: std::ops::Range<usize>) -> Vec<(Vec<u8>, Vec<u8>)> {
    range.map(|i| (key(i), value_for(i))).collect()
}

/// Read a node page, failing the test if it is anything else.
pub fn read_node<P: Pager>(tree: &Tree<P>, index: PageIndex) -> Node {
    match read_typed(tree.pager(), index).expect("read page") {
        TypedPage::Node(node) => node,
        other => panic!("page {index} is {:?}, expected a node", other.kind()),
    }
}

/// Depth of the tree, counting the leaf level as 1.
pub fn depth<P: Pager>(tree: &Tree<P>) -> usize {
    let mut index = tree.meta().root;
    let mut depth = 1;
    while let TypedPage::Node(node) = read_typed(tree.pager(), index).expect("read page") {
        index = node.child(-1);
        depth += 1;
    }
    depth
}

/// Walk the whole tree and check its structure:
///
/// - every leaf sits at the same depth
/// - keys are strictly ascending within and across leaves
/// - keys under child `j` of a node fall between its routing keys `j-1` and `j`
/// - each routing key equals the first key of the subtree to its right
/// - the leaf chain visits the leaves left to right and ends at the sentinel
///
/// Returns the number of entries.
pub fn check_structure<P: Pager>(tree: &Tree<P>) -> usize {
    let mut leaves = Vec::new();
    let mut leaf_depth = None;
    walk(tree, tree.meta().root, None, None, 1, &mut leaf_depth, &mut leaves);

    let mut entries = 0;
    let mut last_key: Option<Vec<u8>> = None;
    for (position, &index) in leaves.iter().enumerate() {
        let leaf = tree.read_leaf(index).expect("read leaf");
        for i in 0..leaf.count() {
            let key = leaf.key(i).to_vec();
            if let Some(last) = &last_key {
                assert!(*last < key, "keys out of order at leaf {index}");
            }
            last_key = Some(key);
        }
        entries += leaf.count();

        let expected_next = leaves
            .get(position + 1)
            .copied()
            .unwrap_or(tree.meta().sentinel);
        assert_eq!(leaf.next(), expected_next, "broken leaf chain at {index}");
    }
    entries
}

fn walk<P: Pager>(
    tree: &Tree<P>,
    index: PageIndex,
    low: Option<&[u8]>,
    high: Option<&[u8]>,
    depth: usize,
    leaf_depth: &mut Option<usize>,
    leaves: &mut Vec<PageIndex>,
) {
    match read_typed(tree.pager(), index).expect("read page") {
        TypedPage::Leaf(leaf) => {
            assert_eq!(
                *leaf_depth.get_or_insert(depth),
                depth,
                "leaf {index} at uneven depth"
            );
            for i in 0..leaf.count() {
                let key = leaf.key(i);
                assert!(low.is_none_or(|low| low <= key), "key below range in {index}");
                assert!(high.is_none_or(|high| key < high), "key above range in {index}");
            }
            if let Some(low) = low {
                assert_eq!(leaf.key(0), low, "routing key is not the first key of {index}");
            }
            leaves.push(index);
        }
        TypedPage::Node(node) => {
            assert!(node.count() >= 1, "node {index} has no keys");
            for j in -1..node.count() as isize {
                let child_low = if j < 0 { low } else { Some(node.key(j as usize)) };
                let child_high = if j + 1 < node.count() as isize {
                    Some(node.key((j + 1) as usize))
                } else {
                    high
                };
                walk(
                    tree,
                    node.child(j),
                    child_low,
                    child_high,
                    depth + 1,
                    leaf_depth,
                    leaves,
                );
            }
        }
        other => panic!("page {index} is {:?}, expected a node or leaf", other.kind()),
    }
}
