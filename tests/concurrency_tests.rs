// tests/concurrency_tests.rs
//! Many caller threads sharing one simulator alongside the sampler

use i2c_sim_core::hal::registers::{ACCEL_XOUT_H, FIFO_R_W, WHO_AM_I};
use i2c_sim_core::{ErrorMode, I2cSimulator, PowerState, SimError, SimulatorConfig};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn shared_simulator(addresses: &[u8]) -> Arc<I2cSimulator> {
    let config = SimulatorConfig {
        sampler_interval_ms: 1,
        global_latency_us: 0,
        default_noise_level: 0.0,
        rng_seed: Some(99),
        ..SimulatorConfig::default()
    };
    let sim = Arc::new(I2cSimulator::new(config).unwrap());
    for &addr in addresses {
        sim.add_device(0, addr, "mpu6050").unwrap();
        sim.set_power_state(0, addr, PowerState::On).unwrap();
        sim.fifo_enable(0, addr, true).unwrap();
    }
    sim
}

#[test]
#[serial]
fn test_parallel_readers_see_consistent_identity() {
    let sim = shared_simulator(&[0x68, 0x69]);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sim = sim.clone();
            thread::spawn(move || {
                let addr = if i % 2 == 0 { 0x68 } else { 0x69 };
                for _ in 0..500 {
                    assert_eq!(sim.read_byte(0, addr, WHO_AM_I), Ok(0x68));
                    let burst = sim.read_burst(0, addr, ACCEL_XOUT_H, 14).unwrap();
                    assert_eq!(burst.len(), 14);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = sim.get_performance_metrics();
    assert_eq!(metrics.transactions, 8 * 500 * 2);
    assert_eq!(metrics.errors, 0);
    assert_eq!(sim.bus_transaction_count(0), Ok(8000));
}

#[test]
#[serial]
fn test_fifo_never_exceeds_capacity_under_contention() {
    let sim = shared_simulator(&[0x68]);
    let stop = Arc::new(AtomicBool::new(false));

    let drainer = {
        let sim = sim.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let _ = sim.read_burst(0, 0x68, FIFO_R_W, 7);
            }
        })
    };

    let checker = {
        let sim = sim.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let count = sim.fifo_get_count(0, 0x68).unwrap();
                assert!(count <= 1024);
            }
        })
    };

    thread::sleep(Duration::from_millis(100));
    stop.store(true, Ordering::Relaxed);
    drainer.join().unwrap();
    checker.join().unwrap();
    assert!(sim.sampler_ticks() > 0);
}

#[test]
#[serial]
fn test_add_remove_races_with_transactions() {
    let sim = shared_simulator(&[]);
    let stop = Arc::new(AtomicBool::new(false));

    let churn = {
        let sim = sim.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let _ = sim.add_device(0, 0x50, "mpu6050");
                let _ = sim.remove_device(0, 0x50);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let sim = sim.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    match sim.read_byte(0, 0x50, WHO_AM_I) {
                        Ok(id) => assert_eq!(id, 0x68),
                        Err(err) => assert_eq!(err, SimError::NotFound { bus: 0, address: 0x50 }),
                    }
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    churn.join().unwrap();
}

#[test]
#[serial]
fn test_configuration_while_sampling() {
    let sim = shared_simulator(&[0x68]);

    let configurer = {
        let sim = sim.clone();
        thread::spawn(move || {
            for i in 0..200 {
                let state = if i % 2 == 0 { PowerState::Sleep } else { PowerState::On };
                sim.set_power_state(0, 0x68, state).unwrap();
                sim.set_error_mode(0, 0x68, ErrorMode::None, 0.0).unwrap();
                if i % 50 == 0 {
                    sim.fifo_reset(0, 0x68).unwrap();
                }
            }
        })
    };

    for _ in 0..1_000 {
        assert_eq!(sim.read_byte(0, 0x68, WHO_AM_I), Ok(0x68));
    }
    configurer.join().unwrap();

    sim.cleanup();
    assert!(!sim.is_sampler_running());
}
