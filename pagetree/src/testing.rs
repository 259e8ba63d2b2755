//! Shared helpers for unit and end-to-end tests.

use std::sync::Once;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TreeConfig;
use crate::pager::{MemoryPager, Pager};
use crate::tree::Tree;

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pagetree=warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Seeded RNG so failures reproduce.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Fixed-width key that sorts in numeric order.
pub fn key(i: usize) -> Vec<u8> {
    format!("key-{i:06}").into_bytes()
}

pub fn value_for(i: usize) -> Vec<u8> {
    format!("value-{i}").into_bytes()
}

pub fn config(max_fanout: usize) -> TreeConfig {
    TreeConfig::new(max_fanout).expect("valid fanout")
}

/// A fresh in-memory tree with meta page 0.
pub fn memory_tree(max_fanout: usize) -> Tree<MemoryPager> {
    init_tracing();
    Tree::open_or_create_with_config(MemoryPager::new(), 0, config(max_fanout))
        .expect("create tree")
}

/// Insert every pair in one committed transaction.
pub fn insert_all<P: Pager>(tree: &mut Tree<P>, entries: &[(Vec<u8>, Vec<u8>)]) {
    let mut txn = tree.begin().expect("begin");
    for (k, v) in entries {
        txn.set(k, v).expect("set");
    }
    txn.commit().expect("commit");
}

/// All entries in iteration order.
pub fn collect<P: Pager>(tree: &Tree<P>) -> Vec<(Vec<u8>, Vec<u8>)> {
    tree.iter()
        .expect("iter")
        .collect::<Result<Vec<_>, _>>()
        .expect("iterate")
}
