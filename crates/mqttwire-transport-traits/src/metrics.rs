//! Connection metrics types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A serializable snapshot of a connection's traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    /// Bytes of completely received frames.
    pub bytes_read: u64,

    /// Bytes of completely written packets.
    pub bytes_written: u64,

    /// Packets successfully received.
    pub packets_received: u64,

    /// Packets successfully sent.
    pub packets_sent: u64,
}

/// Lock-free counters updated by a connection.
///
/// Counters only grow, and only after a frame has been fully read and decoded
/// or a packet fully written.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    packets_received: AtomicU64,
    packets_sent: AtomicU64,
}

impl AtomicMetrics {
    /// Creates a new `AtomicMetrics` instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one received frame of `len` bytes.
    pub fn record_received(&self, len: u64) {
        self.bytes_read.fetch_add(len, Ordering::Relaxed);
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one sent packet of `len` bytes.
    pub fn record_sent(&self, len: u64) {
        self.bytes_written.fetch_add(len, Ordering::Relaxed);
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Total bytes read.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Total bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Creates a `ConnectionMetrics` snapshot from the current values.
    pub fn snapshot(&self) -> ConnectionMetrics {
        ConnectionMetrics {
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
        }
    }
}
