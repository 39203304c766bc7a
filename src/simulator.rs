// src/simulator.rs
//! Simulator context: the bus operations API
//!
//! `I2cSimulator` owns the bus registry, the metrics collector and the
//! background sampler. Construction is init; dropping it (or calling
//! [`I2cSimulator::cleanup`]) stops the sampler and tears down every device.
//! The context is `Send + Sync`, so callers share it behind an `Arc` and
//! issue transactions from as many threads as they like.

use crate::acquisition::sampler::{self, BackgroundSampler};
use crate::config::constants::bus::{MAX_I2C_ADDRESS, MAX_NOISE_DELAY_US};
use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::hal::bus::{BusRegistry, I2cBus, VirtualDevice};
use crate::hal::mpu6050::Mpu6050;
use crate::hal::traits::I2cDevice;
use crate::hal::types::{DataPattern, DeviceKind, ErrorMode, PowerState, Sample};
use crate::metrics::{MetricsCollector, PerformanceMetrics, PerformanceReport, TransactionKind};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Virtual I2C bus simulator
pub struct I2cSimulator {
    config: SimulatorConfig,
    registry: Arc<BusRegistry>,
    metrics: MetricsCollector,
    sampler: Mutex<Option<BackgroundSampler>>,
    lifecycle: Mutex<()>,
    sampler_ticks: Arc<AtomicU64>,
    ready: AtomicBool,
    global_latency_us: AtomicU64,
    debug_logging: AtomicBool,
    bus_rng: Mutex<StdRng>,
}

impl I2cSimulator {
    /// Validate `config`, build the buses and, when configured, start the
    /// background sampler
    pub fn new(config: SimulatorConfig) -> SimResult<Self> {
        Self::with_clock(config, Arc::new(MonotonicTimeProvider::new()))
    }

    /// Like [`I2cSimulator::new`] with an injected clock for sample
    /// timestamps and simulation time
    pub fn with_clock(config: SimulatorConfig, clock: Arc<dyn TimeProvider>) -> SimResult<Self> {
        config.validate().map_err(|e| SimError::invalid(e.to_string()))?;

        let bus_rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.rotate_left(32)),
            None => StdRng::from_entropy(),
        };

        let simulator = Self {
            registry: Arc::new(BusRegistry::new(&config, clock.clone())),
            metrics: MetricsCollector::new(clock),
            sampler: Mutex::new(None),
            lifecycle: Mutex::new(()),
            sampler_ticks: Arc::new(AtomicU64::new(0)),
            ready: AtomicBool::new(true),
            global_latency_us: AtomicU64::new(config.global_latency_us),
            debug_logging: AtomicBool::new(config.debug_logging),
            bus_rng: Mutex::new(bus_rng),
            config,
        };

        if simulator.config.autostart_sampler {
            simulator.spawn_sampler()?;
        }

        info!(
            buses = simulator.config.bus_count,
            max_devices_per_bus = simulator.config.max_devices_per_bus,
            sampler = simulator.is_sampler_running(),
            "I2C simulator initialized"
        );
        Ok(simulator)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Bring a cleaned-up simulator back with empty buses and fresh
    /// metrics. No-op while already running. Operations keep failing
    /// `NotReady` until the restart has fully succeeded.
    pub fn init(&self) -> SimResult<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.is_ready() {
            return Ok(());
        }

        self.registry.clear();
        for bus in 0..self.registry.bus_count() {
            self.registry.set_noise_level(bus, self.config.default_noise_level)?;
        }
        self.metrics.reset();
        self.sampler_ticks.store(0, Ordering::Relaxed);

        if self.config.autostart_sampler {
            self.spawn_sampler()?;
        }

        self.ready.store(true, Ordering::Release);
        info!("I2C simulator re-initialized");
        Ok(())
    }

    /// Stop and join the sampler, tear down every device and refuse further
    /// operations until [`I2cSimulator::init`]. Idempotent.
    pub fn cleanup(&self) {
        let _lifecycle = self.lifecycle.lock();
        if !self.ready.swap(false, Ordering::AcqRel) {
            return;
        }

        self.stop_sampler();
        self.registry.clear();
        info!("I2C simulator cleanup completed");
    }

    /// Start the background sampler if it is not already running
    pub fn start_sampler(&self) -> SimResult<()> {
        self.ensure_ready()?;
        self.spawn_sampler()
    }

    fn spawn_sampler(&self) -> SimResult<()> {
        let mut slot = self.sampler.lock();
        if slot.as_ref().is_some_and(BackgroundSampler::is_running) {
            return Ok(());
        }

        let interval = Duration::from_millis(self.config.sampler_interval_ms);
        *slot = Some(BackgroundSampler::spawn(self.registry.clone(), interval, self.sampler_ticks.clone())?);
        Ok(())
    }

    /// Stop the background sampler and wait for its thread to exit
    pub fn stop_sampler(&self) {
        // take first so the join happens without the slot lock
        let running = self.sampler.lock().take();
        if let Some(mut sampler) = running {
            sampler.stop();
        }
    }

    pub fn is_sampler_running(&self) -> bool {
        self.sampler.lock().as_ref().is_some_and(BackgroundSampler::is_running)
    }

    /// Ticks completed by the background sampler since init
    pub fn sampler_ticks(&self) -> u64 {
        self.sampler_ticks.load(Ordering::Relaxed)
    }

    /// Run one sampler tick on the calling thread; returns frames appended
    pub fn step_sampler(&self) -> SimResult<usize> {
        self.ensure_ready()?;
        Ok(sampler::run_tick(&self.registry))
    }

    // Device management

    pub fn add_device(&self, bus: usize, address: u8, type_name: &str) -> SimResult<()> {
        self.ensure_ready()?;
        let kind: DeviceKind = type_name.parse()?;
        self.registry.add_device(bus, address, kind).map(|_| ())
    }

    pub fn remove_device(&self, bus: usize, address: u8) -> SimResult<()> {
        self.ensure_ready()?;
        self.registry.remove_device(bus, address)
    }

    /// Restore a device to its power-on defaults
    pub fn reset_device(&self, bus: usize, address: u8) -> SimResult<()> {
        self.mpu6050(bus, address)?.reset()?;
        info!(bus, address = %format!("0x{address:02X}"), "device reset");
        Ok(())
    }

    /// Present addresses on `bus`, ascending
    pub fn list_devices(&self, bus: usize) -> SimResult<Vec<u8>> {
        self.ensure_ready()?;
        self.registry.list_devices(bus)
    }

    // Raw bus transactions

    pub fn read_byte(&self, bus: usize, address: u8, reg: u8) -> SimResult<u8> {
        self.transact(bus, address, reg, TransactionKind::Read, 1, |dev| dev.read_register(reg))
    }

    pub fn write_byte(&self, bus: usize, address: u8, reg: u8, value: u8) -> SimResult<()> {
        self.transact(bus, address, reg, TransactionKind::Write, 1, |dev| dev.write_register(reg, value))
    }

    /// Read `len` consecutive registers starting at `reg`
    pub fn read_burst(&self, bus: usize, address: u8, reg: u8, len: usize) -> SimResult<Vec<u8>> {
        if len == 0 {
            return Err(SimError::invalid("burst read length must be non-zero"));
        }
        let mut buf = vec![0u8; len];
        self.read_burst_into(bus, address, reg, &mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from consecutive registers; returns the byte count
    pub fn read_burst_into(&self, bus: usize, address: u8, reg: u8, buf: &mut [u8]) -> SimResult<usize> {
        if buf.is_empty() {
            return Err(SimError::invalid("burst read length must be non-zero"));
        }
        let len = buf.len();
        self.transact(bus, address, reg, TransactionKind::Read, len, |dev| dev.read_burst(reg, buf))
    }

    /// Write `data` to consecutive registers; a read-only register anywhere
    /// in the range rejects the whole burst
    pub fn write_burst(&self, bus: usize, address: u8, reg: u8, data: &[u8]) -> SimResult<usize> {
        if data.is_empty() {
            return Err(SimError::invalid("burst write length must be non-zero"));
        }
        self.transact(bus, address, reg, TransactionKind::Write, data.len(), |dev| dev.write_burst(reg, data))
    }

    // Device configuration

    pub fn set_pattern(&self, bus: usize, address: u8, pattern: DataPattern) -> SimResult<()> {
        self.mpu6050(bus, address)?.set_pattern(pattern)?;
        debug!(bus, address = %format!("0x{address:02X}"), %pattern, "data pattern set");
        Ok(())
    }

    pub fn set_error_mode(&self, bus: usize, address: u8, mode: ErrorMode, probability: f64) -> SimResult<()> {
        self.mpu6050(bus, address)?.set_error_mode(mode, probability)?;
        debug!(bus, address = %format!("0x{address:02X}"), %mode, probability, "error mode set");
        Ok(())
    }

    /// Fail the next transaction to this device with a bus error
    pub fn inject_error(&self, bus: usize, address: u8) -> SimResult<()> {
        self.mpu6050(bus, address)?.inject_error()?;
        debug!(bus, address = %format!("0x{address:02X}"), "one-shot error armed");
        Ok(())
    }

    pub fn set_power_state(&self, bus: usize, address: u8, state: PowerState) -> SimResult<()> {
        self.mpu6050(bus, address)?.set_power_state(state)?;
        debug!(bus, address = %format!("0x{address:02X}"), %state, "power state set");
        Ok(())
    }

    pub fn get_power_state(&self, bus: usize, address: u8) -> SimResult<PowerState> {
        self.mpu6050(bus, address)?.power_state()
    }

    /// Enabling always starts from an empty FIFO
    pub fn fifo_enable(&self, bus: usize, address: u8, enabled: bool) -> SimResult<()> {
        self.mpu6050(bus, address)?.fifo_enable(enabled)?;
        debug!(bus, address = %format!("0x{address:02X}"), enabled, "FIFO enable set");
        Ok(())
    }

    pub fn fifo_reset(&self, bus: usize, address: u8) -> SimResult<()> {
        self.mpu6050(bus, address)?.fifo_reset()
    }

    pub fn fifo_get_count(&self, bus: usize, address: u8) -> SimResult<usize> {
        self.mpu6050(bus, address)?.fifo_count()
    }

    pub fn fifo_overflowed(&self, bus: usize, address: u8) -> SimResult<bool> {
        self.mpu6050(bus, address)?.fifo_overflowed()
    }

    /// Drain up to `buf.len()` FIFO bytes; returns how many were read
    pub fn fifo_read(&self, bus: usize, address: u8, buf: &mut [u8]) -> SimResult<usize> {
        if buf.is_empty() {
            return Err(SimError::invalid("FIFO read buffer must be non-empty"));
        }
        self.mpu6050(bus, address)?.fifo_read(buf)
    }

    /// Current sample, without advancing the generator
    pub fn get_sample(&self, bus: usize, address: u8) -> SimResult<Sample> {
        self.mpu6050(bus, address)?.sample()
    }

    // Diagnostics

    pub fn reset_performance_metrics(&self) {
        self.metrics.reset();
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    pub fn performance_report(&self) -> PerformanceReport {
        self.metrics.report()
    }

    /// Time since construction, init or the last metrics reset
    pub fn simulation_time(&self) -> Duration {
        self.metrics.simulation_time()
    }

    pub fn set_bus_noise_level(&self, bus: usize, level: f64) -> SimResult<()> {
        self.registry.set_noise_level(bus, level)
    }

    pub fn bus_transaction_count(&self, bus: usize) -> SimResult<u64> {
        Ok(self.registry.bus(bus)?.transaction_count())
    }

    /// Fixed processing delay added to every transaction
    pub fn set_global_latency(&self, latency_us: u64) {
        self.global_latency_us.store(latency_us, Ordering::Relaxed);
        debug!(latency_us, "global latency set");
    }

    pub fn global_latency_us(&self) -> u64 {
        self.global_latency_us.load(Ordering::Relaxed)
    }

    /// Toggle one debug line per transaction
    pub fn enable_debug_logging(&self, enabled: bool) {
        self.debug_logging.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_logging_enabled(&self) -> bool {
        self.debug_logging.load(Ordering::Relaxed)
    }

    fn ensure_ready(&self) -> SimResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SimError::NotReady)
        }
    }

    fn mpu6050(&self, bus: usize, address: u8) -> SimResult<Arc<Mpu6050>> {
        self.ensure_ready()?;
        let device = self.registry.find_device(bus, address)?;
        device
            .as_mpu6050()
            .cloned()
            .ok_or_else(|| SimError::Unsupported(device.kind().to_string()))
    }

    /// Resolve, delay, dispatch and account for one transaction. Argument
    /// errors are returned before anything is recorded; everything after
    /// device lookup counts toward metrics.
    fn transact<T, F>(&self, bus: usize, address: u8, reg: u8, kind: TransactionKind, bytes: usize, op: F) -> SimResult<T>
    where
        F: FnOnce(&VirtualDevice) -> SimResult<T>,
    {
        self.ensure_ready()?;
        if address > MAX_I2C_ADDRESS {
            return Err(SimError::invalid(format!("address 0x{address:02X} is not a 7-bit I2C address")));
        }
        let i2c_bus = self.registry.bus(bus)?;

        let started = Instant::now();
        self.bus_delay(i2c_bus);
        i2c_bus.record_transaction();

        let result = self.registry.find_device(bus, address).and_then(|device| op(&device));
        let elapsed = started.elapsed();
        self.metrics.record(kind, bytes, elapsed, &result);

        if self.debug_logging_enabled() {
            let direction = match kind {
                TransactionKind::Read => "read",
                TransactionKind::Write => "write",
            };
            match &result {
                Ok(_) => debug!(
                    bus,
                    address = %format!("0x{address:02X}"),
                    reg = %format!("0x{reg:02X}"),
                    bytes,
                    elapsed_us = elapsed.as_micros() as u64,
                    "{direction} ok"
                ),
                Err(err) => debug!(
                    bus,
                    address = %format!("0x{address:02X}"),
                    reg = %format!("0x{reg:02X}"),
                    errno = err.errno(),
                    "{direction} failed: {err}"
                ),
            }
        }
        result
    }

    /// Fixed latency, then a random extra delay on a noisy bus
    fn bus_delay(&self, bus: &I2cBus) {
        let latency_us = self.global_latency_us();
        if latency_us > 0 {
            std::thread::sleep(Duration::from_micros(latency_us));
        }

        let noise = bus.noise_level();
        if noise > 0.0 {
            let extra_us = {
                let mut rng = self.bus_rng.lock();
                if rng.gen::<f64>() < noise {
                    Some(rng.gen_range(0..=MAX_NOISE_DELAY_US))
                } else {
                    None
                }
            };
            if let Some(us) = extra_us {
                std::thread::sleep(Duration::from_micros(us));
            }
        }
    }
}

impl Drop for I2cSimulator {
    fn drop(&mut self) {
        self.cleanup();
    }
}
