// src/hal/bus.rs
//! Bus registry: numbered buses holding address-keyed device slots
//!
//! Slot mutation and the noise level sit under each bus's `RwLock`.
//! Dispatch clones the device handle under a read lock and releases it
//! before touching the device, so device locks are never taken while a
//! bus lock is held.

use crate::config::constants::bus::{MAX_I2C_ADDRESS, MAX_NOISE_LEVEL, MIN_NOISE_LEVEL};
use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::hal::mpu6050::{Mpu6050, Mpu6050Settings, TickOutcome};
use crate::hal::traits::I2cDevice;
use crate::hal::types::DeviceKind;
use crate::utils::time::TimeProvider;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Handle to a device living in a bus slot. New variants only need an
/// arm here; the registry never looks inside.
#[derive(Debug, Clone)]
pub enum VirtualDevice {
    Mpu6050(Arc<Mpu6050>),
}

impl VirtualDevice {
    fn create(kind: DeviceKind, bus: usize, address: u8, settings: &Mpu6050Settings, clock: Arc<dyn TimeProvider>) -> SimResult<Self> {
        match kind {
            DeviceKind::Mpu6050 => Ok(VirtualDevice::Mpu6050(Arc::new(Mpu6050::new(bus, address, settings, clock)?))),
        }
    }

    fn as_device(&self) -> &dyn I2cDevice {
        match self {
            VirtualDevice::Mpu6050(dev) => dev.as_ref(),
        }
    }

    pub fn as_mpu6050(&self) -> Option<&Arc<Mpu6050>> {
        match self {
            VirtualDevice::Mpu6050(dev) => Some(dev),
        }
    }

    /// One background-sampler visit
    pub fn sampler_tick(&self) -> TickOutcome {
        match self {
            VirtualDevice::Mpu6050(dev) => dev.sampler_tick(),
        }
    }

    fn destroy(&self) {
        match self {
            VirtualDevice::Mpu6050(dev) => dev.destroy(),
        }
    }
}

impl I2cDevice for VirtualDevice {
    fn read_register(&self, reg: u8) -> SimResult<u8> {
        self.as_device().read_register(reg)
    }

    fn write_register(&self, reg: u8, value: u8) -> SimResult<()> {
        self.as_device().write_register(reg, value)
    }

    fn read_burst(&self, reg: u8, buf: &mut [u8]) -> SimResult<usize> {
        self.as_device().read_burst(reg, buf)
    }

    fn write_burst(&self, reg: u8, data: &[u8]) -> SimResult<usize> {
        self.as_device().write_burst(reg, data)
    }

    fn kind(&self) -> DeviceKind {
        self.as_device().kind()
    }

    fn address(&self) -> u8 {
        self.as_device().address()
    }
}

#[derive(Debug)]
struct BusState {
    slots: BTreeMap<u8, VirtualDevice>,
    noise_level: f64,
}

/// One numbered I2C bus
#[derive(Debug)]
pub struct I2cBus {
    capacity: usize,
    state: RwLock<BusState>,
    transaction_count: AtomicU64,
}

impl I2cBus {
    fn new(capacity: usize, noise_level: f64) -> Self {
        Self {
            capacity,
            state: RwLock::new(BusState {
                slots: BTreeMap::new(),
                noise_level,
            }),
            transaction_count: AtomicU64::new(0),
        }
    }

    pub fn noise_level(&self) -> f64 {
        self.state.read().noise_level
    }

    pub fn transaction_count(&self) -> u64 {
        self.transaction_count.load(Ordering::Relaxed)
    }

    pub fn record_transaction(&self) {
        self.transaction_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Directory resolving (bus, address) to a device
pub struct BusRegistry {
    buses: Vec<I2cBus>,
    settings: Mpu6050Settings,
    clock: Arc<dyn TimeProvider>,
}

impl BusRegistry {
    pub fn new(config: &SimulatorConfig, clock: Arc<dyn TimeProvider>) -> Self {
        let buses = (0..config.bus_count)
            .map(|_| I2cBus::new(config.max_devices_per_bus, config.default_noise_level))
            .collect();

        Self {
            buses,
            settings: Mpu6050Settings::from(config),
            clock,
        }
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn bus(&self, bus: usize) -> SimResult<&I2cBus> {
        self.buses
            .get(bus)
            .ok_or_else(|| SimError::invalid(format!("bus {bus} out of range (0..{})", self.buses.len())))
    }

    pub fn add_device(&self, bus: usize, address: u8, kind: DeviceKind) -> SimResult<VirtualDevice> {
        check_address(address)?;
        let i2c_bus = self.bus(bus)?;
        let mut state = i2c_bus.state.write();

        if state.slots.contains_key(&address) {
            return Err(SimError::AlreadyExists { bus, address });
        }
        if state.slots.len() >= i2c_bus.capacity {
            return Err(SimError::NoCapacity { bus, capacity: i2c_bus.capacity });
        }

        let device = VirtualDevice::create(kind, bus, address, &self.settings, self.clock.clone())?;
        state.slots.insert(address, device.clone());
        info!(bus, address = %format!("0x{address:02X}"), kind = %kind, "device added");
        Ok(device)
    }

    /// Evict the device. Handles still held by in-flight callers see it as
    /// absent from then on; re-adding the address yields a fresh device.
    pub fn remove_device(&self, bus: usize, address: u8) -> SimResult<()> {
        check_address(address)?;
        let removed = self.bus(bus)?.state.write().slots.remove(&address);

        match removed {
            Some(device) => {
                device.destroy();
                info!(bus, address = %format!("0x{address:02X}"), "device removed");
                Ok(())
            }
            None => Err(SimError::NotFound { bus, address }),
        }
    }

    pub fn find_device(&self, bus: usize, address: u8) -> SimResult<VirtualDevice> {
        check_address(address)?;
        self.bus(bus)?
            .state
            .read()
            .slots
            .get(&address)
            .cloned()
            .ok_or(SimError::NotFound { bus, address })
    }

    /// Present addresses on a bus, ascending
    pub fn list_devices(&self, bus: usize) -> SimResult<Vec<u8>> {
        Ok(self.bus(bus)?.state.read().slots.keys().copied().collect())
    }

    /// Snapshot of every present device across all buses
    pub fn devices(&self) -> Vec<VirtualDevice> {
        self.buses
            .iter()
            .flat_map(|bus| bus.state.read().slots.values().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn set_noise_level(&self, bus: usize, level: f64) -> SimResult<()> {
        if !(MIN_NOISE_LEVEL..=MAX_NOISE_LEVEL).contains(&level) {
            return Err(SimError::invalid(format!("noise level {level} is outside [0, 1]")));
        }
        self.bus(bus)?.state.write().noise_level = level;
        debug!(bus, level, "bus noise level set");
        Ok(())
    }

    /// Drop every device on every bus
    pub fn clear(&self) {
        for bus in &self.buses {
            let drained = std::mem::take(&mut bus.state.write().slots);
            for device in drained.values() {
                device.destroy();
            }
        }
    }
}

fn check_address(address: u8) -> SimResult<()> {
    if address > MAX_I2C_ADDRESS {
        return Err(SimError::invalid(format!("address 0x{address:02X} is not a 7-bit I2C address")));
    }
    Ok(())
}
