//! Test that rolling back restores the tree as it was before the
//! transaction began.

use crate::e2e_tests::helpers::{
    check_structure, collect, depth, insert_all, key, memory_tree, numbered, value_for,
};

#[test]
fn test_rollback_restores_previous_state() {
    let mut tree = memory_tree(4);
    insert_all(&mut tree, &numbered(0..30));
    let baseline = collect(&tree);
    let meta = *tree.meta();

    let mut txn = tree.begin().expect("begin");
    for i in 30..130 {
        txn.set(&key(i), &value_for(i)).expect("insert");
    }
    for i in (0..30).step_by(3) {
        txn.set(&key(i), b"overwritten").expect("update");
    }
    assert_eq!(txn.get(&key(100)).expect("get"), Some(value_for(100)));
    assert_eq!(txn.get(&key(3)).expect("get"), Some(b"overwritten".to_vec()));
    assert!(txn.backup_count() > 0);
    txn.rollback().expect("rollback");

    assert_eq!(*tree.meta(), meta);
    assert_eq!(collect(&tree), baseline);
    assert_eq!(tree.get(&key(100)).expect("get"), None);
    assert_eq!(tree.get(&key(3)).expect("get"), Some(value_for(3)));
    assert_eq!(check_structure(&tree), 30);
}

#[test]
fn test_rollback_undoes_root_growth() {
    let mut tree = memory_tree(4);
    insert_all(&mut tree, &numbered(0..3));
    let meta = *tree.meta();
    assert_eq!(depth(&tree), 1);

    let mut txn = tree.begin().expect("begin");
    for i in 3..60 {
        txn.set(&key(i), &value_for(i)).expect("insert");
    }
    txn.rollback().expect("rollback");

    assert_eq!(*tree.meta(), meta);
    assert_eq!(depth(&tree), 1);
    assert_eq!(collect(&tree), numbered(0..3));
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let mut tree = memory_tree(4);
    insert_all(&mut tree, &numbered(0..10));
    {
        let mut txn = tree.begin().expect("begin");
        for i in 10..50 {
            txn.set(&key(i), &value_for(i)).expect("insert");
        }
    }
    assert_eq!(check_structure(&tree), 10);
    assert_eq!(collect(&tree), numbered(0..10));
}

#[test]
fn test_work_after_rollback_commits_normally() {
    let mut tree = memory_tree(4);
    insert_all(&mut tree, &numbered(0..10));
    {
        let mut txn = tree.begin().expect("begin");
        txn.set(&key(5), b"discarded").expect("set");
        txn.set(&key(99), b"discarded").expect("set");
        txn.rollback().expect("rollback");
    }
    insert_all(&mut tree, &numbered(10..40));

    assert_eq!(tree.meta().sequence, 2);
    assert_eq!(tree.get(&key(5)).expect("get"), Some(value_for(5)));
    assert_eq!(tree.get(&key(99)).expect("get"), None);
    assert_eq!(collect(&tree), numbered(0..40));
}
