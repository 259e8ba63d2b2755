//! Test that a write failing at any point of a transaction leaves the tree
//! exactly as it was at the last commit.

use crate::e2e_tests::helpers::{
    check_structure, collect, config, init_tracing, insert_all, key, numbered, value_for,
};
use crate::meta::Meta;
use crate::pager::{MemoryPager, Pager};
use crate::simulation::{FaultConfig, FaultyPager};
use crate::tree::{Tree, TreeError};

const BASELINE: usize = 12;
const BATCH: std::ops::Range<usize> = 100..140;

enum Outcome {
    FailedInSet,
    FailedInCommit,
    Committed,
}

fn run_with_failure_after(successful: u64) -> Outcome {
    let pager = FaultyPager::new(MemoryPager::new(), successful);
    let mut tree = Tree::open_or_create_with_config(&pager, 0, config(4)).expect("create");
    {
        let mut txn = tree.begin().expect("begin");
        for (k, v) in numbered(0..BASELINE) {
            txn.set(&k, &v).expect("baseline set");
        }
        txn.set(&key(3), &vec![b'o'; 6000]).expect("baseline overflow value");
        txn.commit().expect("baseline commit");
    }
    let baseline = collect(&tree);
    let meta = *tree.meta();

    pager.fail_write_after(successful).expect("arm fault");
    let mut txn = tree.begin().expect("begin");
    let mut failed = false;
    for i in BATCH {
        let value = if i % 7 == 0 { vec![b'v'; 5000] } else { value_for(i) };
        match txn.set(&key(i), &value) {
            Ok(()) => {}
            Err(e) => {
                assert!(e.is_io(), "unexpected error {e}");
                assert!(!txn.is_active());
                assert!(matches!(
                    txn.set(&key(i), &value),
                    Err(TreeError::TransactionClosed)
                ));
                failed = true;
                break;
            }
        }
    }

    let outcome = if failed {
        drop(txn);
        Outcome::FailedInSet
    } else {
        match txn.commit() {
            Ok(()) => Outcome::Committed,
            Err(e) => {
                assert!(e.is_io(), "unexpected error {e}");
                Outcome::FailedInCommit
            }
        }
    };
    pager.clear_faults().expect("clear faults");

    match outcome {
        Outcome::Committed => {
            assert_eq!(tree.meta().sequence, meta.sequence + 1);
            assert_eq!(check_structure(&tree), BASELINE + BATCH.len());
        }
        Outcome::FailedInSet | Outcome::FailedInCommit => {
            assert_eq!(*tree.meta(), meta, "meta after failure at write {successful}");
            assert_eq!(collect(&tree), baseline, "entries after failure at write {successful}");
            assert_eq!(check_structure(&tree), BASELINE);

            let mut txn = tree.begin().expect("begin after failure");
            txn.set(b"after", b"failure").expect("set after failure");
            txn.commit().expect("commit after failure");
            assert_eq!(tree.get(b"after").expect("get"), Some(b"failure".to_vec()));
        }
    }
    outcome
}

#[test]
fn test_failure_at_every_write_rolls_back() {
    init_tracing();
    let mut failed_in_set = 0;
    let mut failed_in_commit = 0;
    let mut successful = 0;
    loop {
        match run_with_failure_after(successful) {
            Outcome::FailedInSet => failed_in_set += 1,
            Outcome::FailedInCommit => failed_in_commit += 1,
            Outcome::Committed => break,
        }
        successful += 1;
        assert!(successful < 10_000, "fault never stopped triggering");
    }

    assert!(failed_in_set > 0);
    // The meta write, plus its backup when no root growth already took one.
    assert!((1..=2).contains(&failed_in_commit), "{failed_in_commit} commit failures");
}

#[test]
fn test_failed_set_reports_injected_fault() {
    let pager = FaultyPager::new(MemoryPager::new(), 3);
    let mut tree = Tree::open_or_create(&pager, 0).expect("create");
    pager.fail_write_after(0).expect("arm fault");

    let mut txn = tree.begin().expect("begin");
    let error = txn.set(b"k", b"v").expect_err("write should fail");
    assert!(error.to_string().contains("injected fault"));
    assert!(matches!(txn.commit(), Err(TreeError::TransactionClosed)));

    let stats = pager.stats().expect("stats");
    assert_eq!(stats.injected_write_errors, 1);
    assert_eq!(tree.entry_count().expect("count"), 0);
}

fn failing_sync() -> FaultConfig {
    FaultConfig {
        sync_error_rate: 1.0,
        ..FaultConfig::no_faults()
    }
}

fn meta_on_disk(pager: &FaultyPager<MemoryPager>) -> Meta {
    Meta::from_page(&pager.read_page(0).expect("read meta")).expect("valid meta")
}

#[test]
fn test_failed_sync_after_root_growth_restores_meta() {
    init_tracing();
    let pager = FaultyPager::new(MemoryPager::new(), 21);
    let mut tree = Tree::open_or_create_with_config(&pager, 0, config(4)).expect("create");
    {
        let mut txn = tree.begin().expect("begin");
        for (k, v) in numbered(0..3) {
            txn.set(&k, &v).expect("baseline set");
        }
        txn.commit().expect("baseline commit");
    }
    let baseline = collect(&tree);
    let meta = *tree.meta();

    let mut txn = tree.begin().expect("begin");
    for (k, v) in numbered(3..60) {
        txn.set(&k, &v).expect("set");
    }
    pager.set_fault_config(failing_sync()).expect("arm fault");
    let error = txn.commit().expect_err("sync should fail");
    assert!(error.is_io(), "unexpected error {error}");

    assert_eq!(*tree.meta(), meta);
    assert_eq!(tree.get(&key(50)).expect("get"), None);
    assert!(!tree.has(&key(3)).expect("has"));

    pager.clear_faults().expect("clear faults");
    assert_eq!(meta_on_disk(&pager), meta);
    assert_eq!(collect(&tree), baseline);
    assert_eq!(check_structure(&tree), 3);

    insert_all(&mut tree, &numbered(3..60));
    assert_eq!(check_structure(&tree), 60);
    assert_eq!(tree.meta().sequence, meta.sequence + 1);
}

#[test]
fn test_failed_sync_restores_meta_sequence_on_disk() {
    init_tracing();
    let pager = FaultyPager::new(MemoryPager::new(), 22);
    let mut tree = Tree::open_or_create(&pager, 0).expect("create");
    insert_all(&mut tree, &numbered(0..5));
    let meta = *tree.meta();

    let mut txn = tree.begin().expect("begin");
    txn.set(&key(2), b"changed").expect("set");
    pager.set_fault_config(failing_sync()).expect("arm fault");
    assert!(txn.commit().is_err());
    pager.clear_faults().expect("clear faults");

    assert_eq!(meta_on_disk(&pager), meta);
    assert_eq!(*tree.meta(), meta);
    assert_eq!(tree.get(&key(2)).expect("get"), Some(value_for(2)));
}
