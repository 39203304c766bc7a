//! Per-transaction fault injection
//! Location: src/hal/simulation/error_injection.rs

use crate::config::constants::injection;
use crate::error::{SimError, SimResult};
use crate::hal::types::ErrorMode;
use rand::Rng;
use std::time::Duration;

/// Outcome of one injection roll that is not a clean pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    /// Device does not acknowledge its address
    NotFound,
    /// Caller blocks for the given delay, then fails
    Timeout(Duration),
    /// Generic I/O failure
    BusError,
    /// Transaction succeeds but read data is replaced with random bytes
    CorruptData,
}

/// Fault chooser owned by each device.
///
/// One roll is made per logical transaction, whether that transaction is a
/// single byte or a burst.
#[derive(Debug, Clone)]
pub struct ErrorInjector {
    mode: ErrorMode,
    probability: f64,
    forced_failure: bool,
    intermittent_ratio: f64,
    timeout_delay: Duration,
    injected_count: u64,
}

impl ErrorInjector {
    pub fn new(intermittent_ratio: f64, timeout_delay: Duration) -> Self {
        Self {
            mode: ErrorMode::None,
            probability: 0.0,
            forced_failure: false,
            intermittent_ratio,
            timeout_delay,
            injected_count: 0,
        }
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Number of faults this injector has produced
    pub fn injected_count(&self) -> u64 {
        self.injected_count
    }

    pub fn set_mode(&mut self, mode: ErrorMode, probability: f64) -> SimResult<()> {
        if !(injection::MIN_PROBABILITY..=injection::MAX_PROBABILITY).contains(&probability) {
            return Err(SimError::invalid(format!(
                "error probability {probability} is outside [0, 1]"
            )));
        }

        self.mode = mode;
        self.probability = probability;
        Ok(())
    }

    /// Force a BUS_ERROR on the next transaction only
    pub fn arm_one_shot(&mut self) {
        self.forced_failure = true;
    }

    /// Restore the no-fault configuration
    pub fn clear(&mut self) {
        self.mode = ErrorMode::None;
        self.probability = 0.0;
        self.forced_failure = false;
    }

    /// Decide the fate of one transaction
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<InjectedFault> {
        let fault = self.choose(rng);
        if fault.is_some() {
            self.injected_count += 1;
        }
        fault
    }

    fn choose<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<InjectedFault> {
        if self.forced_failure {
            self.forced_failure = false;
            return Some(InjectedFault::BusError);
        }

        if self.mode == ErrorMode::None || self.probability <= 0.0 {
            return None;
        }

        if self.probability < 1.0 && rng.gen::<f64>() >= self.probability {
            return None;
        }

        match self.mode {
            ErrorMode::None => None,
            ErrorMode::DeviceNotFound => Some(InjectedFault::NotFound),
            ErrorMode::Timeout => Some(InjectedFault::Timeout(self.timeout_delay)),
            ErrorMode::BusError => Some(InjectedFault::BusError),
            ErrorMode::CorruptData => Some(InjectedFault::CorruptData),
            // effective failure rate is probability * ratio
            ErrorMode::Intermittent => {
                if rng.gen::<f64>() < self.intermittent_ratio {
                    Some(InjectedFault::BusError)
                } else {
                    None
                }
            }
        }
    }
}
