// Run metrics module
//
// Lightweight counters for one download run, shared between the relocation
// loop and the final report without locks.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one download run.
///
/// Uses atomic operations so the orchestrating task and its helpers can
/// record progress concurrently. A fresh instance is created per run; nothing
/// is shared across runs.
#[derive(Debug)]
pub struct RunMetrics {
    /// Workshop items successfully relocated to their destination
    pub mods_relocated: AtomicUsize,

    /// Download events discarded after relocation was halted by a failure
    pub mods_discarded: AtomicUsize,

    /// Bytes downloaded, as reported by SteamCMD's success lines
    pub bytes_downloaded: AtomicU64,

    /// Cumulative directory-copy time in milliseconds
    pub copy_time_ms: AtomicU64,

    /// Run start time
    start_time: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            mods_relocated: AtomicUsize::new(0),
            mods_discarded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
            copy_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one relocated item and the copy it took.
    pub fn record_relocated(&self, bytes: u64, copy_time: Duration) {
        self.mods_relocated.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
        self.copy_time_ms
            .fetch_add(copy_time.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record an event that arrived after relocation was halted.
    pub fn record_discarded(&self) {
        self.mods_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn relocated(&self) -> usize {
        self.mods_relocated.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Relaxed)
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average copy time per relocated item in milliseconds.
    pub fn avg_copy_time_ms(&self) -> f64 {
        let total = self.copy_time_ms.load(Ordering::Relaxed);
        let count = self.relocated();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log a run summary.
    pub fn log_summary(&self) {
        tracing::info!(
            "run finished in {:.2}s: {} mods relocated ({} bytes), {} discarded, copy avg {:.1}ms",
            self.elapsed().as_secs_f64(),
            self.relocated(),
            self.bytes(),
            self.mods_discarded.load(Ordering::Relaxed),
            self.avg_copy_time_ms()
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
