// Performance metrics module
//
// Provides lightweight counters for the state store and the speech narrator

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide activity metrics
///
/// Uses atomic operations for lock-free counting. Collected throughout the
/// application lifecycle and logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Committed state mutations that changed something
    state_updates: AtomicU64,

    /// State change events delivered to at least one subscriber
    state_broadcasts: AtomicU64,

    /// State change events sent while nobody was subscribed
    broadcast_misses: AtomicU64,

    snapshot_saves: AtomicU64,
    snapshot_errors: AtomicU64,

    speech_requests: AtomicU64,
    speech_completions: AtomicU64,
    speech_failures: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            state_updates: AtomicU64::new(0),
            state_broadcasts: AtomicU64::new(0),
            broadcast_misses: AtomicU64::new(0),
            snapshot_saves: AtomicU64::new(0),
            snapshot_errors: AtomicU64::new(0),
            speech_requests: AtomicU64::new(0),
            speech_completions: AtomicU64::new(0),
            speech_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_broadcast(&self) {
        self.state_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast_miss(&self) {
        self.broadcast_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_saved(&self) {
        self.snapshot_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_error(&self) {
        self.snapshot_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_speech_request(&self) {
        self.speech_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_speech_completed(&self) {
        self.speech_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_speech_failed(&self) {
        self.speech_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn state_updates(&self) -> u64 {
        self.state_updates.load(Ordering::Relaxed)
    }

    pub fn state_broadcasts(&self) -> u64 {
        self.state_broadcasts.load(Ordering::Relaxed)
    }

    pub fn broadcast_misses(&self) -> u64 {
        self.broadcast_misses.load(Ordering::Relaxed)
    }

    pub fn snapshot_saves(&self) -> u64 {
        self.snapshot_saves.load(Ordering::Relaxed)
    }

    pub fn snapshot_errors(&self) -> u64 {
        self.snapshot_errors.load(Ordering::Relaxed)
    }

    pub fn speech_requests(&self) -> u64 {
        self.speech_requests.load(Ordering::Relaxed)
    }

    pub fn speech_completions(&self) -> u64 {
        self.speech_completions.load(Ordering::Relaxed)
    }

    pub fn speech_failures(&self) -> u64 {
        self.speech_failures.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "State updates: {}, broadcasts: {}, unheard: {}",
            self.state_updates(),
            self.state_broadcasts(),
            self.broadcast_misses()
        );
        tracing::info!(
            "Snapshots: {} saved, {} failed",
            self.snapshot_saves(),
            self.snapshot_errors()
        );
        tracing::info!(
            "Speech: {} requested, {} completed, {} failed",
            self.speech_requests(),
            self.speech_completions(),
            self.speech_failures()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
