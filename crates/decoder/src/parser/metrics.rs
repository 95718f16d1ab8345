use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Counters for a decode stage.
///
/// All operations use `Ordering::Relaxed`; `snapshot()` is not transactional
/// across fields, which is fine for observability counters.
#[derive(Debug, Default)]
pub struct StageMetrics {
    decoded: AtomicU64,
    malformed: AtomicU64,
    decode_time_nanos: AtomicU64,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully decoded line
    #[inline]
    pub fn record_decoded(&self, time_nanos: u64) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
        self.decode_time_nanos.fetch_add(time_nanos, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let decoded = self.decoded.load(Ordering::Relaxed);
        let malformed = self.malformed.load(Ordering::Relaxed);
        let time_nanos = self.decode_time_nanos.load(Ordering::Relaxed);
        let attempts = decoded + malformed;

        MetricsSnapshot {
            decoded,
            malformed,
            avg_decode_time_us: if decoded > 0 {
                (time_nanos as f64 / decoded as f64) / 1000.0
            } else {
                0.0
            },
            success_rate: if attempts > 0 {
                decoded as f64 / attempts as f64
            } else {
                1.0
            },
        }
    }
}

/// A read-only snapshot of stage metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub decoded: u64,
    pub malformed: u64,
    pub avg_decode_time_us: f64,
    pub success_rate: f64,
}
