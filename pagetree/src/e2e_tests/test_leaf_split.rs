//! Test that leaf splits keep the chain linked and the parent routing
//! correct.

use crate::e2e_tests::helpers::{
    check_structure, collect, insert_all, key, memory_tree, numbered, read_node, value_for,
};
use crate::page::PageKind;
use crate::pager::Pager;

#[test]
fn test_first_split_of_root_leaf() {
    let mut tree = memory_tree(4);
    let old_root = tree.meta().root;
    let sentinel = tree.meta().sentinel;
    insert_all(&mut tree, &numbered(0..4));

    let root = read_node(&tree, tree.meta().root);
    assert_eq!(root.count(), 1);
    assert_eq!(root.child(-1), old_root);

    let left = tree.read_leaf(old_root).expect("left leaf");
    let right_index = root.child(0);
    let right = tree.read_leaf(right_index).expect("right leaf");
    assert_eq!(left.next(), right_index);
    assert_eq!(right.next(), sentinel);
    assert_eq!(root.key(0), right.key(0));
    assert_eq!(left.count() + right.count(), 4);
    assert_eq!(left.key(0), key(0).as_slice());

    for (k, v) in numbered(0..4) {
        assert_eq!(tree.get(&k).expect("get"), Some(v));
    }
}

#[test]
fn test_splits_in_the_middle_of_the_chain() {
    let mut tree = memory_tree(4);
    let evens: Vec<_> = (0..40).map(|i| (key(i * 2), value_for(i * 2))).collect();
    insert_all(&mut tree, &evens);

    let mut splits = 0;
    for i in (0..40).rev() {
        let k = key(i * 2 + 1);
        let (before, index) = tree.find_leaf(&k).expect("find leaf");
        let old_next = before.next();

        let mut txn = tree.begin().expect("begin");
        txn.set(&k, &value_for(i * 2 + 1)).expect("set");
        txn.commit().expect("commit");

        let after = tree.read_leaf(index).expect("split leaf");
        if after.next() != old_next {
            splits += 1;
            let fresh = tree.read_leaf(after.next()).expect("new leaf");
            assert_eq!(fresh.next(), old_next, "new leaf must inherit the old next");
            assert!(after.key(after.count() - 1) < fresh.key(0));
        }
    }

    assert!(splits > 0);
    assert_eq!(check_structure(&tree), 80);
    let keys: Vec<_> = collect(&tree).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, (0..80).map(key).collect::<Vec<_>>());
}

#[test]
fn test_new_pages_are_appended() {
    let mut tree = memory_tree(4);
    let before = tree.pager().page_count().expect("count");
    insert_all(&mut tree, &numbered(0..4));

    let root = read_node(&tree, tree.meta().root);
    let right = root.child(0);
    assert!(u64::try_from(right).expect("index") >= before);
    assert!(u64::try_from(tree.meta().root).expect("index") >= before);

    let page = tree.pager().read_page(right).expect("read");
    assert_eq!(page.kind(), Some(PageKind::Leaf));
}
