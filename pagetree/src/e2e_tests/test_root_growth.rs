//! Test that a split reaching the root grows the tree by one level.

use crate::e2e_tests::helpers::{
    check_structure, config, depth, key, memory_tree, read_node, value_for,
};
use crate::pager::MemoryPager;
use crate::tree::Tree;

#[test]
fn test_root_grows_with_two_children() {
    let mut tree = memory_tree(4);
    let mut root = tree.meta().root;
    let mut levels = depth(&tree);
    let mut growths = 0;

    let mut i = 0;
    while levels < 4 {
        let mut txn = tree.begin().expect("begin");
        txn.set(&key(i), &value_for(i)).expect("set");
        txn.commit().expect("commit");
        i += 1;

        if tree.meta().root != root {
            let node = read_node(&tree, tree.meta().root);
            assert_eq!(node.count(), 1, "a fresh root has exactly two children");
            assert_eq!(node.child(-1), root, "the old root becomes the left child");
            assert_eq!(depth(&tree), levels + 1);
            root = tree.meta().root;
            levels += 1;
            growths += 1;
        }
        assert!(i < 10_000, "tree never reached four levels");
    }

    assert_eq!(growths, 3);
    assert_eq!(check_structure(&tree), i);
    for j in 0..i {
        assert_eq!(tree.get(&key(j)).expect("get"), Some(value_for(j)));
    }
}

#[test]
fn test_root_change_survives_reopen() {
    let pager = MemoryPager::new();
    let root = {
        let mut tree =
            Tree::open_or_create_with_config(&pager, 0, config(4)).expect("create");
        let mut txn = tree.begin().expect("begin");
        for i in 0..50 {
            txn.set(&key(i), &value_for(i)).expect("set");
        }
        txn.commit().expect("commit");
        tree.meta().root
    };

    let tree = Tree::open_or_create(&pager, 0).expect("reopen");
    assert_eq!(tree.meta().root, root);
    assert!(depth(&tree) > 2);
    assert_eq!(check_structure(&tree), 50);
}
