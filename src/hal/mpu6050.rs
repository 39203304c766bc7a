// src/hal/mpu6050.rs
//! Virtual MPU-6050: register state machine, sample generation and FIFO
//!
//! All mutable device state, the FIFO included, sits behind one
//! `parking_lot::Mutex`. Callers reach a device through the bus registry,
//! which releases the bus lock before any method here takes the device
//! lock, so the only nesting is bus -> device.

use crate::acquisition::ring_buffer::FifoBuffer;
use crate::config::constants::{fifo::FRAME_SIZE_BYTES, mpu6050 as chip};
use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::hal::registers::{self as reg, burst_next, is_read_only, is_sensor_output};
use crate::hal::simulation::{signal_generator, ErrorInjector, InjectedFault};
use crate::hal::traits::I2cDevice;
use crate::hal::types::{DataPattern, DeviceKind, ErrorMode, PowerState, Sample};
use crate::utils::time::{sample_timestamp_millis, TimeProvider};
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Construction parameters shared by every device on a simulator
#[derive(Debug, Clone)]
pub struct Mpu6050Settings {
    pub fifo_capacity: usize,
    pub timeout_delay: Duration,
    pub intermittent_ratio: f64,
    /// Per-device streams are derived as `seed ^ address`
    pub rng_seed: Option<u64>,
}

impl Default for Mpu6050Settings {
    fn default() -> Self {
        Self::from(&SimulatorConfig::default())
    }
}

impl From<&SimulatorConfig> for Mpu6050Settings {
    fn from(config: &SimulatorConfig) -> Self {
        Self {
            fifo_capacity: config.fifo_capacity,
            timeout_delay: Duration::from_millis(config.timeout_delay_ms),
            intermittent_ratio: config.intermittent_failure_ratio,
            rng_seed: config.rng_seed,
        }
    }
}

/// Result of one background-sampler visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Device not initialized, FIFO disabled or not powered ON
    Skipped,
    /// A fresh frame was generated; `written` of its 14 bytes fit
    Appended { written: usize },
}

struct Mpu6050State {
    registers: [u8; 256],
    sample: Sample,
    power: PowerState,
    pattern: DataPattern,
    injector: ErrorInjector,
    sample_count: u32,
    fifo: FifoBuffer,
    initialized: bool,
    rng: StdRng,
}

impl Mpu6050State {
    fn new(address: u8, settings: &Mpu6050Settings) -> SimResult<Self> {
        let fifo = FifoBuffer::new(settings.fifo_capacity).map_err(|e| SimError::invalid(e.to_string()))?;
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ address as u64),
            None => StdRng::from_entropy(),
        };

        let mut state = Self {
            registers: [0u8; 256],
            sample: Sample::power_on(),
            power: PowerState::Sleep,
            pattern: DataPattern::GravityOnly,
            injector: ErrorInjector::new(settings.intermittent_ratio, settings.timeout_delay),
            sample_count: 0,
            fifo,
            initialized: true,
            rng,
        };
        state.load_register_defaults();
        Ok(state)
    }

    /// Datasheet power-on register values
    fn load_register_defaults(&mut self) {
        self.registers = [0u8; 256];
        self.registers[reg::WHO_AM_I as usize] = chip::WHO_AM_I_VALUE;
        self.registers[reg::PWR_MGMT_1 as usize] = chip::POWER_ON_PWR_MGMT_1;
    }

    /// Return to power-on defaults; the random stream keeps going
    fn restore_defaults(&mut self) {
        self.load_register_defaults();
        self.sample = Sample::power_on();
        self.power = PowerState::Sleep;
        self.pattern = DataPattern::GravityOnly;
        self.injector.clear();
        self.sample_count = 0;
        self.fifo.set_enabled(false);
        self.fifo.reset();
        self.initialized = true;
    }

    fn regenerate(&mut self, timestamp: u32) {
        self.sample_count = self.sample_count.wrapping_add(1);
        let mut sample = signal_generator::generate(self.pattern, self.sample_count, &mut self.rng);
        sample.timestamp = timestamp;
        self.sample = sample;
    }

    fn read(&mut self, r: u8, clock: &dyn TimeProvider) -> u8 {
        match r {
            reg::WHO_AM_I => chip::WHO_AM_I_VALUE,
            reg::INT_STATUS => {
                let oflow = if self.fifo.overflowed() { reg::INT_STATUS_FIFO_OFLOW } else { 0 };
                self.registers[r as usize] | oflow
            }
            reg::FIFO_COUNTH => self.fifo.count_bytes()[0],
            reg::FIFO_COUNTL => self.fifo.count_bytes()[1],
            reg::FIFO_R_W => self.fifo.pop().unwrap_or(0),
            r if is_sensor_output(r) => {
                // accel-X high byte starts a burst; outputs freeze while asleep
                if r == reg::ACCEL_XOUT_H && self.power.is_awake() {
                    self.regenerate(sample_timestamp_millis(clock));
                }
                self.sample.to_frame()[(r - reg::ACCEL_XOUT_H) as usize]
            }
            r => self.registers[r as usize],
        }
    }

    fn write(&mut self, r: u8, value: u8) -> SimResult<()> {
        if is_read_only(r) {
            return Err(SimError::Access(r));
        }

        match r {
            reg::PWR_MGMT_1 => self.write_power_management(value),
            reg::USER_CTRL => self.write_user_ctrl(value),
            reg::FIFO_R_W => {
                // a full FIFO latches overflow and drops the byte
                let _ = self.fifo.push(value);
            }
            r => self.registers[r as usize] = value,
        }
        Ok(())
    }

    fn write_power_management(&mut self, value: u8) {
        if value & reg::PWR_MGMT_1_DEVICE_RESET != 0 {
            self.load_register_defaults();
            self.power = PowerState::Sleep;
            self.fifo.set_enabled(false);
            self.fifo.reset();
            return;
        }

        self.registers[reg::PWR_MGMT_1 as usize] = value;
        self.power = if value & reg::PWR_MGMT_1_SLEEP != 0 {
            PowerState::Sleep
        } else if value & reg::PWR_MGMT_1_CYCLE != 0 {
            PowerState::Cycle
        } else {
            PowerState::On
        };
    }

    fn write_user_ctrl(&mut self, value: u8) {
        let enable = value & reg::USER_CTRL_FIFO_EN != 0;
        if enable != self.fifo.is_enabled() {
            self.fifo.set_enabled(enable);
        }
        if value & reg::USER_CTRL_FIFO_RESET != 0 {
            self.fifo.reset();
        }
        // FIFO_RESET self-clears
        self.registers[reg::USER_CTRL as usize] = value & !reg::USER_CTRL_FIFO_RESET;
    }

    fn set_power_state(&mut self, power: PowerState) {
        let pwr = &mut self.registers[reg::PWR_MGMT_1 as usize];
        match power {
            PowerState::Off | PowerState::Sleep => *pwr |= reg::PWR_MGMT_1_SLEEP,
            PowerState::On => *pwr &= !(reg::PWR_MGMT_1_SLEEP | reg::PWR_MGMT_1_CYCLE),
            PowerState::Cycle => *pwr = (*pwr & !reg::PWR_MGMT_1_SLEEP) | reg::PWR_MGMT_1_CYCLE,
        }
        self.power = power;
    }

    fn set_fifo_enabled(&mut self, enabled: bool) {
        self.fifo.set_enabled(enabled);
        let user_ctrl = &mut self.registers[reg::USER_CTRL as usize];
        if enabled {
            *user_ctrl |= reg::USER_CTRL_FIFO_EN;
        } else {
            *user_ctrl &= !reg::USER_CTRL_FIFO_EN;
        }
    }
}

/// One emulated MPU-6050
pub struct Mpu6050 {
    bus: usize,
    address: u8,
    clock: Arc<dyn TimeProvider>,
    state: Mutex<Mpu6050State>,
}

impl std::fmt::Debug for Mpu6050 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mpu6050")
            .field("bus", &self.bus)
            .field("address", &format_args!("0x{:02X}", self.address))
            .finish_non_exhaustive()
    }
}

impl Mpu6050 {
    /// Create an initialized device with datasheet defaults: SLEEP,
    /// GRAVITY_ONLY, FIFO disabled and empty, no error injection
    pub fn new(bus: usize, address: u8, settings: &Mpu6050Settings, clock: Arc<dyn TimeProvider>) -> SimResult<Self> {
        let state = Mpu6050State::new(address, settings)?;
        debug!(bus, address = %format!("0x{address:02X}"), "created virtual MPU-6050");

        Ok(Self {
            bus,
            address,
            clock,
            state: Mutex::new(state),
        })
    }

    /// Tear down; every later operation through an outstanding handle
    /// reports the device as absent
    pub fn destroy(&self) {
        self.state.lock().initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Restore power-on defaults (equivalent to destroy then create)
    pub fn reset(&self) -> SimResult<()> {
        let mut state = self.lock_initialized()?;
        state.restore_defaults();
        Ok(())
    }

    pub fn set_pattern(&self, pattern: DataPattern) -> SimResult<()> {
        self.lock_initialized()?.pattern = pattern;
        Ok(())
    }

    pub fn pattern(&self) -> SimResult<DataPattern> {
        Ok(self.lock_initialized()?.pattern)
    }

    pub fn set_error_mode(&self, mode: ErrorMode, probability: f64) -> SimResult<()> {
        self.lock_initialized()?.injector.set_mode(mode, probability)
    }

    pub fn error_mode(&self) -> SimResult<(ErrorMode, f64)> {
        let state = self.lock_initialized()?;
        Ok((state.injector.mode(), state.injector.probability()))
    }

    /// Force a bus error on the next transaction
    pub fn inject_error(&self) -> SimResult<()> {
        self.lock_initialized()?.injector.arm_one_shot();
        Ok(())
    }

    /// Faults produced by the injector since creation
    pub fn injected_faults(&self) -> SimResult<u64> {
        Ok(self.lock_initialized()?.injector.injected_count())
    }

    /// Set the power state, keeping PWR_MGMT_1 consistent with it
    pub fn set_power_state(&self, power: PowerState) -> SimResult<()> {
        self.lock_initialized()?.set_power_state(power);
        Ok(())
    }

    pub fn power_state(&self) -> SimResult<PowerState> {
        Ok(self.lock_initialized()?.power)
    }

    /// Enable (always starting empty) or disable the FIFO
    pub fn fifo_enable(&self, enabled: bool) -> SimResult<()> {
        self.lock_initialized()?.set_fifo_enabled(enabled);
        Ok(())
    }

    pub fn fifo_reset(&self) -> SimResult<()> {
        self.lock_initialized()?.fifo.reset();
        Ok(())
    }

    pub fn fifo_count(&self) -> SimResult<usize> {
        Ok(self.lock_initialized()?.fifo.count())
    }

    pub fn fifo_overflowed(&self) -> SimResult<bool> {
        Ok(self.lock_initialized()?.fifo.overflowed())
    }

    pub fn fifo_enabled(&self) -> SimResult<bool> {
        Ok(self.lock_initialized()?.fifo.is_enabled())
    }

    /// Drain up to `buf.len()` bytes; no fault injection applies
    pub fn fifo_read(&self, buf: &mut [u8]) -> SimResult<usize> {
        Ok(self.lock_initialized()?.fifo.drain_into(buf))
    }

    /// Current sample without advancing the generator
    pub fn sample(&self) -> SimResult<Sample> {
        Ok(self.lock_initialized()?.sample)
    }

    pub fn sample_count(&self) -> SimResult<u32> {
        Ok(self.lock_initialized()?.sample_count)
    }

    /// Background-sampler step: regenerate and append one frame while the
    /// device is initialized, FIFO-enabled and ON. The frame is pushed under
    /// the device lock so it is atomic with respect to register reads.
    pub fn sampler_tick(&self) -> TickOutcome {
        let mut state = self.state.lock();
        if !state.initialized || !state.fifo.is_enabled() || state.power != PowerState::On {
            return TickOutcome::Skipped;
        }

        state.regenerate(sample_timestamp_millis(self.clock.as_ref()));
        let frame = state.sample.to_frame();
        let was_overflowed = state.fifo.overflowed();
        let written = state.fifo.push_slice(&frame);

        if written < FRAME_SIZE_BYTES && !was_overflowed {
            warn!(
                bus = self.bus,
                address = %format!("0x{:02X}", self.address),
                capacity = state.fifo.capacity(),
                "FIFO overflow, dropping sensor data"
            );
        }
        TickOutcome::Appended { written }
    }

    fn not_found(&self) -> SimError {
        SimError::NotFound { bus: self.bus, address: self.address }
    }

    fn lock_initialized(&self) -> SimResult<MutexGuard<'_, Mpu6050State>> {
        let state = self.state.lock();
        if !state.initialized {
            return Err(self.not_found());
        }
        Ok(state)
    }

    /// Take the device lock and roll fault injection once for a transaction.
    /// The flag is true when the read data must be corrupted.
    fn begin_transaction(&self) -> SimResult<(MutexGuard<'_, Mpu6050State>, bool)> {
        let mut state = self.lock_initialized()?;
        let fault = {
            let s = &mut *state;
            s.injector.roll(&mut s.rng)
        };

        match fault {
            None => Ok((state, false)),
            Some(InjectedFault::CorruptData) => Ok((state, true)),
            Some(InjectedFault::NotFound) => Err(self.not_found()),
            Some(InjectedFault::BusError) => Err(SimError::BusError),
            Some(InjectedFault::Timeout(delay)) => {
                // never sleep holding the device lock
                drop(state);
                std::thread::sleep(delay);
                Err(SimError::Timeout { ms: delay.as_millis() as u64 })
            }
        }
    }
}

impl I2cDevice for Mpu6050 {
    fn read_register(&self, r: u8) -> SimResult<u8> {
        let (mut state, corrupt) = self.begin_transaction()?;
        let value = state.read(r, self.clock.as_ref());
        if corrupt {
            return Ok(state.rng.gen());
        }
        Ok(value)
    }

    fn write_register(&self, r: u8, value: u8) -> SimResult<()> {
        // corrupted writes land unchanged
        let (mut state, _) = self.begin_transaction()?;
        state.write(r, value)
    }

    fn read_burst(&self, start: u8, buf: &mut [u8]) -> SimResult<usize> {
        if buf.is_empty() {
            return Err(SimError::invalid("burst read length must be non-zero"));
        }

        let (mut state, corrupt) = self.begin_transaction()?;
        let mut r = start;
        for byte in buf.iter_mut() {
            *byte = state.read(r, self.clock.as_ref());
            r = burst_next(r);
        }

        if corrupt {
            let index = state.rng.gen_range(0..buf.len());
            buf[index] = state.rng.gen();
        }
        Ok(buf.len())
    }

    fn write_burst(&self, start: u8, data: &[u8]) -> SimResult<usize> {
        if data.is_empty() {
            return Err(SimError::invalid("burst write length must be non-zero"));
        }

        let (mut state, _) = self.begin_transaction()?;

        // all-or-nothing: a read-only register anywhere rejects the burst
        let mut r = start;
        for _ in data {
            if is_read_only(r) {
                return Err(SimError::Access(r));
            }
            r = burst_next(r);
        }

        let mut r = start;
        for &value in data {
            state.write(r, value)?;
            r = burst_next(r);
        }
        Ok(data.len())
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Mpu6050
    }

    fn address(&self) -> u8 {
        self.address
    }
}
