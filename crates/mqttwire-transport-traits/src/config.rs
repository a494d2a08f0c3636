//! Connection configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default initial capacity of the receive buffer.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 4096;

/// Default time allowed for the backend to shut down during close.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum total frame length accepted by `receive`.
    /// `0` = unlimited
    pub read_limit: u64,

    /// Initial capacity of the receive buffer in bytes.
    pub read_buffer_capacity: usize,

    /// How long close waits for the backend to shut down before dropping it.
    pub shutdown_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_limit: 0,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with no read limit.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            read_limit: 0,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Create a configuration with a 256KB read limit for untrusted peers.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            read_limit: 256 * 1024,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the read limit.
    #[must_use]
    pub const fn with_read_limit(mut self, read_limit: u64) -> Self {
        self.read_limit = read_limit;
        self
    }

    /// Set the initial receive buffer capacity.
    #[must_use]
    pub const fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    /// Set the backend shutdown timeout.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
