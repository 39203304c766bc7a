// src/metrics.rs
//! Transaction counters and response-time statistics
//!
//! Every field is an independent atomic, so a snapshot taken while
//! transactions are in flight may mix slightly different moments.

use crate::config::constants::timing::MILLISECONDS_PER_SECOND;
use crate::error::{SimError, SimResult};
use crate::utils::time::TimeProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Direction of a bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Read,
    Write,
}

/// Point-in-time copy of the collector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Bytes requested by read transactions, failed ones included (a burst
    /// counts its length)
    pub total_reads: u64,
    /// Bytes carried by write transactions, failed ones included
    pub total_writes: u64,
    /// Logical transactions attempted, successful or not
    pub transactions: u64,
    /// Transactions that failed, injected or not
    pub errors: u64,
    pub timeouts: u64,
    pub avg_response_time_us: f64,
    /// 0 until the first transaction completes
    pub min_response_time_us: u64,
    pub max_response_time_us: u64,
}

/// Snapshot plus derived rates, printable as the classic report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub metrics: PerformanceMetrics,
    pub simulation_time_ms: f64,
    /// Failed transactions as a percentage of all transactions
    pub error_rate_percent: f64,
    pub throughput_ops_per_sec: f64,
}

impl PerformanceReport {
    pub fn new(metrics: PerformanceMetrics, simulation_time: Duration) -> Self {
        let simulation_time_ms = simulation_time.as_secs_f64() * MILLISECONDS_PER_SECOND as f64;
        let error_rate_percent = if metrics.transactions > 0 {
            metrics.errors as f64 / metrics.transactions as f64 * 100.0
        } else {
            0.0
        };
        let throughput_ops_per_sec = if simulation_time.is_zero() {
            0.0
        } else {
            metrics.transactions as f64 / simulation_time.as_secs_f64()
        };

        Self {
            metrics,
            simulation_time_ms,
            error_rate_percent,
            throughput_ops_per_sec,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "=== I2C Simulator Performance Report ===")?;
        writeln!(f, "Simulation time: {:.2} ms", self.simulation_time_ms)?;
        writeln!(f, "Transactions: {}", m.transactions)?;
        writeln!(f, "Total reads: {}", m.total_reads)?;
        writeln!(f, "Total writes: {}", m.total_writes)?;
        writeln!(f, "Errors: {}", m.errors)?;
        writeln!(f, "Timeouts: {}", m.timeouts)?;
        writeln!(f, "Average response time: {:.2} µs", m.avg_response_time_us)?;
        writeln!(f, "Min response time: {} µs", m.min_response_time_us)?;
        writeln!(f, "Max response time: {} µs", m.max_response_time_us)?;
        if m.transactions > 0 {
            writeln!(f, "Error rate: {:.2}%", self.error_rate_percent)?;
            writeln!(f, "Throughput: {:.2} ops/sec", self.throughput_ops_per_sec)?;
        }
        write!(f, "========================================")
    }
}

/// Lock-free aggregate updated by every transaction
pub struct MetricsCollector {
    total_reads: AtomicU64,
    total_writes: AtomicU64,
    transactions: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    response_time_sum_us: AtomicU64,
    min_response_time_us: AtomicU64,
    max_response_time_us: AtomicU64,
    started_at_nanos: AtomicU64,
    clock: Arc<dyn TimeProvider>,
}

impl MetricsCollector {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            total_reads: AtomicU64::new(0),
            total_writes: AtomicU64::new(0),
            transactions: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            response_time_sum_us: AtomicU64::new(0),
            min_response_time_us: AtomicU64::new(u64::MAX),
            max_response_time_us: AtomicU64::new(0),
            started_at_nanos: AtomicU64::new(clock.now_nanos()),
            clock,
        }
    }

    /// Account for one finished transaction
    pub fn record<T>(&self, kind: TransactionKind, bytes: usize, elapsed: Duration, outcome: &SimResult<T>) {
        self.transactions.fetch_add(1, Ordering::Relaxed);

        // totals count attempted bytes, whatever the outcome
        let counter = match kind {
            TransactionKind::Read => &self.total_reads,
            TransactionKind::Write => &self.total_writes,
        };
        counter.fetch_add(bytes as u64, Ordering::Relaxed);

        if let Err(err) = outcome {
            self.errors.fetch_add(1, Ordering::Relaxed);
            if matches!(err, SimError::Timeout { .. }) {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }

        let elapsed_us = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.response_time_sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
        self.min_response_time_us.fetch_min(elapsed_us, Ordering::Relaxed);
        self.max_response_time_us.fetch_max(elapsed_us, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        let transactions = self.transactions.load(Ordering::Relaxed);
        let sum_us = self.response_time_sum_us.load(Ordering::Relaxed);
        let min = self.min_response_time_us.load(Ordering::Relaxed);

        PerformanceMetrics {
            total_reads: self.total_reads.load(Ordering::Relaxed),
            total_writes: self.total_writes.load(Ordering::Relaxed),
            transactions,
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            avg_response_time_us: if transactions > 0 { sum_us as f64 / transactions as f64 } else { 0.0 },
            min_response_time_us: if min == u64::MAX { 0 } else { min },
            max_response_time_us: self.max_response_time_us.load(Ordering::Relaxed),
        }
    }

    /// Time since construction or the last reset
    pub fn simulation_time(&self) -> Duration {
        let elapsed = self.clock.now_nanos().saturating_sub(self.started_at_nanos.load(Ordering::Relaxed));
        Duration::from_nanos(elapsed)
    }

    pub fn report(&self) -> PerformanceReport {
        PerformanceReport::new(self.snapshot(), self.simulation_time())
    }

    pub fn reset(&self) {
        self.total_reads.store(0, Ordering::Relaxed);
        self.total_writes.store(0, Ordering::Relaxed);
        self.transactions.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.response_time_sum_us.store(0, Ordering::Relaxed);
        self.min_response_time_us.store(u64::MAX, Ordering::Relaxed);
        self.max_response_time_us.store(0, Ordering::Relaxed);
        self.started_at_nanos.store(self.clock.now_nanos(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::MockTimeProvider;

    fn collector() -> (Arc<MockTimeProvider>, MetricsCollector) {
        let clock = Arc::new(MockTimeProvider::new(0));
        let metrics = MetricsCollector::new(clock.clone());
        (clock, metrics)
    }

    #[test]
    fn test_empty_snapshot() {
        let (_, metrics) = collector();
        let snap = metrics.snapshot();
        assert_eq!(snap, PerformanceMetrics::default());
    }

    #[test]
    fn test_counts_and_timing() {
        let (_, metrics) = collector();
        metrics.record(TransactionKind::Read, 1, Duration::from_micros(100), &Ok::<u8, SimError>(0x68));
        metrics.record(TransactionKind::Read, 14, Duration::from_micros(300), &Ok::<usize, SimError>(14));
        metrics.record(TransactionKind::Write, 1, Duration::from_micros(200), &Ok::<(), SimError>(()));
        metrics.record(TransactionKind::Read, 1, Duration::from_micros(600), &Err::<u8, _>(SimError::Timeout { ms: 100 }));

        let snap = metrics.snapshot();
        // the timed-out read still counts its byte
        assert_eq!(snap.total_reads, 16);
        assert_eq!(snap.total_writes, 1);
        assert_eq!(snap.transactions, 4);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.min_response_time_us, 100);
        assert_eq!(snap.max_response_time_us, 600);
        assert_eq!(snap.avg_response_time_us, 300.0);
    }

    #[test]
    fn test_reset_restarts_clock() {
        let (clock, metrics) = collector();
        metrics.record(TransactionKind::Write, 1, Duration::from_micros(5), &Err::<(), _>(SimError::BusError));
        clock.advance_by(2_000_000_000);
        assert_eq!(metrics.simulation_time(), Duration::from_secs(2));

        metrics.reset();
        assert_eq!(metrics.snapshot(), PerformanceMetrics::default());
        assert_eq!(metrics.simulation_time(), Duration::ZERO);
    }

    #[test]
    fn test_report_rates() {
        let (clock, metrics) = collector();
        for i in 0..10 {
            let outcome = if i < 2 { Err(SimError::BusError) } else { Ok(0u8) };
            metrics.record(TransactionKind::Read, 1, Duration::from_micros(10), &outcome);
        }
        clock.advance_by(500_000_000);

        let report = metrics.report();
        assert_eq!(report.simulation_time_ms, 500.0);
        assert!((report.error_rate_percent - 20.0).abs() < 1e-9);
        assert!((report.throughput_ops_per_sec - 20.0).abs() < 1e-9);

        let text = report.to_string();
        assert!(text.contains("Error rate: 20.00%"));
        assert!(text.contains("Throughput: 20.00 ops/sec"));

        let json = report.to_json().unwrap();
        let back: PerformanceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metrics.transactions, 10);
    }

    #[test]
    fn test_concurrent_recording() {
        let (_, metrics) = collector();
        let metrics = Arc::new(metrics);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        m.record(TransactionKind::Read, 1, Duration::from_micros(1), &Ok::<u8, SimError>(0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().total_reads, 4000);
    }
}
