//! Transport error types.

use std::error::Error as StdError;
use std::fmt;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Boxed cause carried by a [`TransportError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The closed set of failure kinds a connection reports.
///
/// Every failure maps to exactly one code. Callers branch on the code rather
/// than on the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// A local or remote graceful close is in progress.
    ConnectionClose = 1,
    /// Establishing an outbound connection failed.
    DialError = 2,
    /// Starting a listening endpoint failed.
    LaunchError = 3,
    /// A packet failed to serialize.
    EncodeError = 4,
    /// A complete frame failed to decode into a valid packet.
    DecodeError = 5,
    /// The bytes could not be parsed into a frame boundary.
    DetectionError = 6,
    /// The underlying medium failed.
    NetworkError = 7,
    /// The connection was closed by the peer or by a local close.
    ExpectedClose = 8,
    /// An incoming frame would exceed the configured read limit.
    ReadLimitExceeded = 9,
    /// The operation was attempted on a connection that is already closed.
    ConnectionError = 10,
}

impl ErrorCode {
    /// Every code, in numeric order.
    pub const ALL: [Self; 10] = [
        Self::ConnectionClose,
        Self::DialError,
        Self::LaunchError,
        Self::EncodeError,
        Self::DecodeError,
        Self::DetectionError,
        Self::NetworkError,
        Self::ExpectedClose,
        Self::ReadLimitExceeded,
        Self::ConnectionError,
    ];

    /// Lowercase kind name used when rendering an error.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionClose => "connection close",
            Self::DialError => "dial error",
            Self::LaunchError => "launch error",
            Self::EncodeError => "encode error",
            Self::DecodeError => "decode error",
            Self::DetectionError => "detection error",
            Self::NetworkError => "network error",
            Self::ExpectedClose => "expected close",
            Self::ReadLimitExceeded => "read limit exceeded",
            Self::ConnectionError => "connection error",
        }
    }

    /// Stable numeric value.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a numeric value does not name an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code {0}")]
pub struct UnknownErrorCode(pub u8);

impl TryFrom<u8> for ErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(UnknownErrorCode(value))
    }
}

/// An error returned by a connection: a code plus the underlying cause.
///
/// Renders as `"<kind>: <cause>"`, or just `"<kind>"` when there is no cause.
#[derive(Debug)]
pub struct TransportError {
    code: ErrorCode,
    cause: Option<BoxError>,
}

impl TransportError {
    /// Creates an error of kind `code` wrapping `cause`.
    pub fn new(code: ErrorCode, cause: impl Into<BoxError>) -> Self {
        Self {
            code,
            cause: Some(cause.into()),
        }
    }

    /// Creates an error of kind `code` without a cause.
    pub const fn bare(code: ErrorCode) -> Self {
        Self { code, cause: None }
    }

    /// The error kind.
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns `true` if this error is of kind `code`.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Consumes the error and returns the wrapped cause.
    pub fn into_cause(self) -> Option<BoxError> {
        self.cause
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.code, cause),
            None => f.write_str(self.code.as_str()),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<ErrorCode> for TransportError {
    fn from(code: ErrorCode) -> Self {
        Self::bare(code)
    }
}
