//! Core connection types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ConnectionState {
    /// Sends and receives are accepted.
    Open = 0,
    /// Teardown has started.
    Closing = 1,
    /// The backend has been released.
    Closed = 2,
}

impl ConnectionState {
    /// Decodes the value stored in an atomic state cell.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Returns `true` while the connection accepts operations.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// How a backend delimits incoming bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// A byte stream without boundaries; frames may span reads.
    Stream,
    /// Discrete messages; each message carries exactly one frame.
    Message,
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Message => write!(f, "message"),
        }
    }
}
