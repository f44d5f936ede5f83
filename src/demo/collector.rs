//! Metrics collection for `fqbench`, adapted from the same
//! accumulate-then-snapshot shape the networked collector used, minus the
//! `Arc<RwLock<_>>` sharing (the benchmark loop is single-threaded).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub strategy_name: String,
    pub avg_throughput_mbps: f64,
    pub avg_latency_ms: f64,
    pub packet_loss_rate: f64,
    pub peak_queue_length: usize,
    pub avg_queue_length: f64,
    pub jitter_ms: f64,
}

#[derive(Debug, Default)]
pub struct Collector {
    packets_sent: u64,
    packets_delivered: u64,
    packets_dropped: u64,
    total_latency_ms: f64,
    last_latency_ms: Option<f64>,
    jitter_accum_ms: f64,
    jitter_samples: u64,
    queue_lengths: Vec<usize>,
    total_bytes_delivered: u64,
    elapsed_ns: u64,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self) {
        self.packets_sent += 1;
    }

    pub fn record_dropped(&mut self) {
        self.packets_dropped += 1;
    }

    pub fn record_delivered(&mut self, bytes: u32, sojourn_ns: u64) {
        self.packets_delivered += 1;
        self.total_bytes_delivered += bytes as u64;
        let latency_ms = sojourn_ns as f64 / 1_000_000.0;
        self.total_latency_ms += latency_ms;

        if let Some(prev) = self.last_latency_ms {
            self.jitter_accum_ms += (latency_ms - prev).abs();
            self.jitter_samples += 1;
        }
        self.last_latency_ms = Some(latency_ms);
    }

    pub fn record_queue_length(&mut self, len: usize) {
        self.queue_lengths.push(len);
    }

    pub fn advance_elapsed(&mut self, ns: u64) {
        self.elapsed_ns = self.elapsed_ns.max(ns);
    }

    pub fn report(&self, strategy_name: impl Into<String>) -> AnalysisReport {
        let elapsed_s = (self.elapsed_ns as f64 / 1_000_000_000.0).max(1e-9);
        let avg_throughput_mbps = (self.total_bytes_delivered as f64 * 8.0) / elapsed_s / 1_000_000.0;

        let avg_latency_ms = if self.packets_delivered > 0 {
            self.total_latency_ms / self.packets_delivered as f64
        } else {
            0.0
        };

        let packet_loss_rate = if self.packets_sent > 0 {
            self.packets_dropped as f64 / self.packets_sent as f64
        } else {
            0.0
        };

        let peak_queue_length = self.queue_lengths.iter().copied().max().unwrap_or(0);
        let avg_queue_length = if self.queue_lengths.is_empty() {
            0.0
        } else {
            self.queue_lengths.iter().sum::<usize>() as f64 / self.queue_lengths.len() as f64
        };

        let jitter_ms = if self.jitter_samples > 0 {
            self.jitter_accum_ms / self.jitter_samples as f64
        } else {
            0.0
        };

        AnalysisReport {
            strategy_name: strategy_name.into(),
            avg_throughput_mbps,
            avg_latency_ms,
            packet_loss_rate,
            peak_queue_length,
            avg_queue_length,
            jitter_ms,
        }
    }
}
