//! Fault-injecting pager for deterministic testing.
//!
//! `FaultyPager` wraps any pager and fails reads, writes or syncs according
//! to configurable rates drawn from a seeded RNG, so the same seed produces
//! the same sequence of faults. It can also fail one specific upcoming write,
//! which lets tests interrupt a multi-page operation at every step.

use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::page::{Page, PageIndex};
use crate::pager::{Pager, PagerError};

/// Configuration for fault injection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultConfig {
    /// Probability of a read error (0.0 - 1.0).
    pub read_error_rate: f64,
    /// Probability of a write error (0.0 - 1.0).
    pub write_error_rate: f64,
    /// Probability of a sync error (0.0 - 1.0).
    pub sync_error_rate: f64,
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Create a fault config with low fault rates (for stress testing).
    #[must_use]
    pub const fn low_faults() -> Self {
        Self {
            read_error_rate: 0.001,
            write_error_rate: 0.001,
            sync_error_rate: 0.001,
        }
    }

    /// Create a fault config with high fault rates (for extreme testing).
    #[must_use]
    pub const fn high_faults() -> Self {
        Self {
            read_error_rate: 0.05,
            write_error_rate: 0.05,
            sync_error_rate: 0.05,
        }
    }
}

/// Statistics about pager operations seen by a `FaultyPager`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FaultStats {
    /// Number of read calls.
    pub reads: u64,
    /// Number of write calls (including appends).
    pub writes: u64,
    /// Number of syncs.
    pub syncs: u64,
    /// Number of injected read errors.
    pub injected_read_errors: u64,
    /// Number of injected write errors.
    pub injected_write_errors: u64,
    /// Number of injected sync errors.
    pub injected_sync_errors: u64,
}

struct FaultState {
    config: FaultConfig,
    rng: StdRng,
    /// Writes left to pass before the armed one-shot failure.
    fail_write_after: Option<u64>,
    stats: FaultStats,
}

impl FaultState {
    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        self.rng.random::<f64>() < rate
    }

    fn should_fail_write(&mut self) -> bool {
        match self.fail_write_after {
            Some(0) => {
                self.fail_write_after = None;
                true
            }
            Some(n) => {
                self.fail_write_after = Some(n - 1);
                false
            }
            None => {
                let rate = self.config.write_error_rate;
                self.should_inject_fault(rate)
            }
        }
    }
}

/// A pager wrapper that injects faults.
pub struct FaultyPager<P> {
    inner: P,
    state: Mutex<FaultState>,
}

impl<P: Pager> FaultyPager<P> {
    /// Wrap `inner` with no faults configured.
    ///
    /// The seed ensures deterministic behavior: the same seed will produce
    /// the same sequence of faults.
    #[must_use]
    pub fn new(inner: P, seed: u64) -> Self {
        Self::with_config(inner, seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_config(inner: P, seed: u64, config: FaultConfig) -> Self {
        Self {
            inner,
            state: Mutex::new(FaultState {
                config,
                rng: StdRng::seed_from_u64(seed),
                fail_write_after: None,
                stats: FaultStats::default(),
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, FaultState>, PagerError> {
        self.state.lock().map_err(|_| PagerError::LockPoisoned)
    }

    /// Update the fault configuration.
    pub fn set_fault_config(&self, config: FaultConfig) -> Result<(), PagerError> {
        self.state()?.config = config;
        Ok(())
    }

    /// Let `successful` more writes through, then fail the next one.
    pub fn fail_write_after(&self, successful: u64) -> Result<(), PagerError> {
        self.state()?.fail_write_after = Some(successful);
        Ok(())
    }

    /// Disarm a pending one-shot failure and zero all fault rates.
    pub fn clear_faults(&self) -> Result<(), PagerError> {
        let mut state = self.state()?;
        state.fail_write_after = None;
        state.config = FaultConfig::no_faults();
        Ok(())
    }

    /// Get a snapshot of the current statistics.
    pub fn stats(&self) -> Result<FaultStats, PagerError> {
        Ok(self.state()?.stats.clone())
    }

    #[must_use]
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Pager> Pager for FaultyPager<P> {
    fn read_pages_at(&self, pages: &mut [Page], index: PageIndex) -> Result<(), PagerError> {
        {
            let mut state = self.state()?;
            state.stats.reads += 1;
            let rate = state.config.read_error_rate;
            if state.should_inject_fault(rate) {
                state.stats.injected_read_errors += 1;
                return Err(PagerError::InjectedFault(
                    "simulated read error".to_string(),
                ));
            }
        }
        self.inner.read_pages_at(pages, index)
    }

    fn write_pages_at(
        &self,
        pages: &[Page],
        index: Option<PageIndex>,
    ) -> Result<PageIndex, PagerError> {
        {
            let mut state = self.state()?;
            state.stats.writes += 1;
            if state.should_fail_write() {
                state.stats.injected_write_errors += 1;
                return Err(PagerError::InjectedFault(
                    "simulated write error".to_string(),
                ));
            }
        }
        self.inner.write_pages_at(pages, index)
    }

    fn sync(&self) -> Result<(), PagerError> {
        {
            let mut state = self.state()?;
            state.stats.syncs += 1;
            let rate = state.config.sync_error_rate;
            if state.should_inject_fault(rate) {
                state.stats.injected_sync_errors += 1;
                return Err(PagerError::InjectedFault(
                    "simulated sync error".to_string(),
                ));
            }
        }
        self.inner.sync()
    }

    fn page_count(&self) -> Result<u64, PagerError> {
        self.inner.page_count()
    }
}
