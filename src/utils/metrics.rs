//! Observability and Metrics
//!
//! Counters for framing and dispatch activity.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for protocol operations
#[derive(Debug)]
pub struct Metrics {
    /// Frames serialized by the stream codec or engine
    pub frames_encoded: AtomicU64,
    /// Frames decoded by the stream codec
    pub frames_decoded: AtomicU64,
    /// Bytes written as frames
    pub bytes_encoded: AtomicU64,
    /// Bytes consumed as frames
    pub bytes_decoded: AtomicU64,
    /// Decode attempts that needed more bytes
    pub incomplete_reads: AtomicU64,
    /// Frames rejected for bad magic, version or length
    pub invalid_headers: AtomicU64,
    /// Frames rejected for a bad checksum
    pub checksum_mismatches: AtomicU64,
    /// Bytes discarded while resynchronizing
    pub resync_bytes_skipped: AtomicU64,
    /// Payloads routed to a handler
    pub messages_dispatched: AtomicU64,
    /// Callbacks that reported failure
    pub dispatch_failures: AtomicU64,
    /// Payloads a handler could not decode
    pub malformed_payloads: AtomicU64,
    /// Valid frames with no registered handler
    pub unrouted_messages: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            frames_encoded: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            incomplete_reads: AtomicU64::new(0),
            invalid_headers: AtomicU64::new(0),
            checksum_mismatches: AtomicU64::new(0),
            resync_bytes_skipped: AtomicU64::new(0),
            messages_dispatched: AtomicU64::new(0),
            dispatch_failures: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            unrouted_messages: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn frame_encoded(&self, byte_count: u64) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn frame_decoded(&self, byte_count: u64) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn incomplete_read(&self) {
        self.incomplete_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalid_header(&self) {
        self.invalid_headers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_mismatch(&self) {
        self.checksum_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resync_skipped(&self, byte_count: u64) {
        self.resync_bytes_skipped
            .fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn message_dispatched(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatch_failure(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_payload(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unrouted_message(&self) {
        self.unrouted_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            incomplete_reads: self.incomplete_reads.load(Ordering::Relaxed),
            invalid_headers: self.invalid_headers.load(Ordering::Relaxed),
            checksum_mismatches: self.checksum_mismatches.load(Ordering::Relaxed),
            resync_bytes_skipped: self.resync_bytes_skipped.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            unrouted_messages: self.unrouted_messages.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            frames_encoded = snapshot.frames_encoded,
            frames_decoded = snapshot.frames_decoded,
            bytes_encoded = snapshot.bytes_encoded,
            bytes_decoded = snapshot.bytes_decoded,
            incomplete_reads = snapshot.incomplete_reads,
            invalid_headers = snapshot.invalid_headers,
            checksum_mismatches = snapshot.checksum_mismatches,
            resync_bytes_skipped = snapshot.resync_bytes_skipped,
            messages_dispatched = snapshot.messages_dispatched,
            dispatch_failures = snapshot.dispatch_failures,
            malformed_payloads = snapshot.malformed_payloads,
            unrouted_messages = snapshot.unrouted_messages,
            uptime_seconds = snapshot.uptime_seconds,
            "Protocol metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_encoded: u64,
    pub frames_decoded: u64,
    pub bytes_encoded: u64,
    pub bytes_decoded: u64,
    pub incomplete_reads: u64,
    pub invalid_headers: u64,
    pub checksum_mismatches: u64,
    pub resync_bytes_skipped: u64,
    pub messages_dispatched: u64,
    pub dispatch_failures: u64,
    pub malformed_payloads: u64,
    pub unrouted_messages: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
