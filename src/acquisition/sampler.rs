// src/acquisition/sampler.rs
//! Periodic background task feeding device FIFOs
//!
//! A dedicated thread waits on a `crossbeam` ticker and a shutdown channel.
//! Each tick snapshots the device handles (holding each bus lock only for
//! the copy), then visits every device under its own lock.

use crate::error::{SimError, SimResult};
use crate::hal::bus::BusRegistry;
use crate::hal::mpu6050::TickOutcome;
use crossbeam::channel::{self, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Visit every present device once; returns how many frames were appended
pub fn run_tick(registry: &BusRegistry) -> usize {
    registry
        .devices()
        .iter()
        .filter(|device| matches!(device.sampler_tick(), TickOutcome::Appended { .. }))
        .count()
}

/// Handle to the running sampler thread
pub struct BackgroundSampler {
    running: Arc<AtomicBool>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundSampler {
    /// Start ticking every `interval`; `ticks` counts completed ticks
    pub fn spawn(registry: Arc<BusRegistry>, interval: Duration, ticks: Arc<AtomicU64>) -> SimResult<Self> {
        if interval.is_zero() {
            return Err(SimError::invalid("sampler interval must be non-zero"));
        }

        let running = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("i2c-sim-sampler".into())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    channel::select! {
                        recv(shutdown_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if !thread_running.load(Ordering::Acquire) {
                                break;
                            }
                            let appended = run_tick(&registry);
                            ticks.fetch_add(1, Ordering::Relaxed);
                            if appended > 0 {
                                debug!(appended, "sampler tick");
                            }
                        }
                    }
                }
            })
            .map_err(|e| SimError::SamplerSpawn(e.to_string()))?;

        info!(interval_ms = interval.as_millis() as u64, "background sampler started");
        Ok(Self {
            running,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal shutdown and wait for the thread to exit. Returns once the
    /// thread has released every device lock it held.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => info!("background sampler stopped"),
                Err(_) => error!("background sampler thread panicked"),
            }
        }
    }
}

impl Drop for BackgroundSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatorConfig;
    use crate::hal::types::{DeviceKind, PowerState};
    use crate::utils::time::MonotonicTimeProvider;
    use std::time::Instant;

    fn registry_with_device() -> Arc<BusRegistry> {
        let registry = Arc::new(BusRegistry::new(
            &SimulatorConfig::deterministic(1),
            Arc::new(MonotonicTimeProvider::new()),
        ));
        let device = registry.add_device(0, 0x68, DeviceKind::Mpu6050).unwrap();
        let mpu = device.as_mpu6050().unwrap();
        mpu.set_power_state(PowerState::On).unwrap();
        mpu.fifo_enable(true).unwrap();
        registry
    }

    #[test]
    fn test_run_tick_appends_frames() {
        let registry = registry_with_device();
        registry.add_device(1, 0x69, DeviceKind::Mpu6050).unwrap();

        // the second device sleeps with its FIFO disabled
        assert_eq!(run_tick(&registry), 1);
        let count = registry.find_device(0, 0x68).unwrap().as_mpu6050().unwrap().fifo_count().unwrap();
        assert_eq!(count, 14);
    }

    #[test]
    fn test_sampler_runs_and_stops() {
        let registry = registry_with_device();
        let ticks = Arc::new(AtomicU64::new(0));
        let mut sampler = BackgroundSampler::spawn(registry.clone(), Duration::from_millis(2), ticks.clone()).unwrap();
        assert!(sampler.is_running());

        let deadline = Instant::now() + Duration::from_secs(2);
        while ticks.load(Ordering::Relaxed) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        sampler.stop();
        assert!(!sampler.is_running());

        let after_stop = ticks.load(Ordering::Relaxed);
        assert!(after_stop >= 3);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(ticks.load(Ordering::Relaxed), after_stop);

        // stop is idempotent
        sampler.stop();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let registry = registry_with_device();
        let result = BackgroundSampler::spawn(registry, Duration::ZERO, Arc::new(AtomicU64::new(0)));
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }
}
