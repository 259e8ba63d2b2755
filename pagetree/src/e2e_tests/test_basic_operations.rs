//! Test that committed writes are visible to lookups and iteration.

use crate::e2e_tests::helpers::{check_structure, collect, memory_tree};
use crate::tree::TreeError;

#[test]
fn test_set_get_commit() {
    let mut tree = memory_tree(256);
    let mut txn = tree.begin().expect("begin");
    txn.set(b"a", b"1").expect("set a");
    txn.set(b"b", b"2").expect("set b");
    txn.commit().expect("commit");

    assert_eq!(tree.get(b"a").expect("get a"), Some(b"1".to_vec()));
    assert_eq!(tree.get(b"b").expect("get b"), Some(b"2".to_vec()));
    assert!(tree.has(b"a").expect("has a"));
    assert_eq!(
        collect(&tree),
        vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]
    );
    assert_eq!(tree.meta().sequence, 1);
}

#[test]
fn test_update_replaces_value() {
    let mut tree = memory_tree(256);
    {
        let mut txn = tree.begin().expect("begin");
        txn.set(b"k", b"v1").expect("set");
        txn.commit().expect("commit");
    }
    {
        let mut txn = tree.begin().expect("begin");
        txn.set(b"k", b"v2").expect("update");
        txn.commit().expect("commit");
    }

    assert_eq!(tree.get(b"k").expect("get"), Some(b"v2".to_vec()));
    assert_eq!(tree.entry_count().expect("count"), 1);
    assert_eq!(tree.meta().sequence, 2);
}

#[test]
fn test_missing_key() {
    let mut tree = memory_tree(256);
    let mut txn = tree.begin().expect("begin");
    txn.set(b"present", b"yes").expect("set");
    txn.commit().expect("commit");

    assert_eq!(tree.get(b"absent").expect("get"), None);
    assert!(!tree.has(b"absent").expect("has"));
    assert_eq!(tree.get(b"").expect("get empty key"), None);
}

#[test]
fn test_transaction_sees_own_writes() {
    let mut tree = memory_tree(4);
    let mut txn = tree.begin().expect("begin");
    for i in 0..20u8 {
        txn.set(&[b'k', i], &[i]).expect("set");
        assert_eq!(txn.get(&[b'k', i]).expect("get"), Some(vec![i]));
    }
    assert!(txn.has(&[b'k', 0]).expect("has"));
    assert!(!txn.has(b"other").expect("has"));
    txn.commit().expect("commit");
    assert_eq!(check_structure(&tree), 20);
}

#[test]
fn test_empty_key_and_value() {
    let mut tree = memory_tree(256);
    let mut txn = tree.begin().expect("begin");
    txn.set(b"", b"empty key").expect("set empty key");
    txn.set(b"empty value", b"").expect("set empty value");
    txn.commit().expect("commit");

    assert_eq!(tree.get(b"").expect("get"), Some(b"empty key".to_vec()));
    assert_eq!(tree.get(b"empty value").expect("get"), Some(Vec::new()));
    assert_eq!(collect(&tree)[0].0, b"".to_vec());
}

#[test]
fn test_delete_is_rejected_without_closing() {
    let mut tree = memory_tree(256);
    let mut txn = tree.begin().expect("begin");
    txn.set(b"k", b"v").expect("set");
    assert!(matches!(txn.del(b"k"), Err(TreeError::NotImplemented(_))));
    assert!(txn.is_active());
    txn.commit().expect("commit");
    assert_eq!(tree.get(b"k").expect("get"), Some(b"v".to_vec()));
}

#[test]
fn test_commit_closes_transaction_and_rollback_of_nothing() {
    let mut tree = memory_tree(256);
    tree.begin().expect("begin").commit().expect("empty commit");
    assert_eq!(tree.meta().sequence, 1);

    tree.begin().expect("begin").rollback().expect("empty rollback");
    assert_eq!(tree.meta().sequence, 1);
    assert_eq!(tree.entry_count().expect("count"), 0);
}

#[test]
fn test_out_of_order_inserts_iterate_sorted() {
    let mut tree = memory_tree(256);
    let mut txn = tree.begin().expect("begin");
    txn.set(b"a", b"1").expect("set a");
    txn.set(b"c", b"3").expect("set c");
    txn.set(b"b", b"2").expect("set b");
    txn.commit().expect("commit");

    assert_eq!(
        collect(&tree),
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );
    assert!(!tree.has(b"d").expect("has d"));
}
