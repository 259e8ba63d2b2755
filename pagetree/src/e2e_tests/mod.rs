//! End-to-end tests through the public tree and transaction API.
//!
//! Each test file covers a specific scenario. Randomized tests use seeded
//! generators so failures reproduce.

#![cfg(test)]

mod helpers;

mod test_basic_operations;
mod test_fault_injection;
mod test_leaf_split;
mod test_rollback;
mod test_root_growth;
