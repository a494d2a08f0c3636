//! Frame boundary detection.
//!
//! A frame is one header byte, a remaining length field of one to four bytes
//! (base 128, high bit set on every byte but the last) and that many body
//! bytes. Detection only looks at the header and the length field, so it can
//! run on a partially filled buffer before the body has arrived.

use thiserror::Error;

use crate::error::ErrorCode;

/// Smallest possible frame: a header byte and a one byte length field.
pub const MIN_FRAME_LEN: usize = 2;

const MAX_LENGTH_BYTES: usize = 4;

/// Outcome of inspecting a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// The buffer does not hold a complete frame yet.
    Incomplete {
        /// Lower bound on the number of additional bytes required.
        needed: usize,
    },
    /// The buffer starts with a complete frame.
    Complete {
        /// Total frame length: header, length field and body.
        length: usize,
    },
}

/// Reasons a buffer cannot be framed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetectError {
    /// The header byte names packet type 0 or 15.
    #[error("reserved packet type {0} in frame header")]
    ReservedPacketType(u8),

    /// All four length bytes carry the continuation bit.
    #[error("remaining length field exceeds four bytes")]
    RemainingLengthOverflow,

    /// The frame, or the bytes needed to finish its length field, exceed the limit.
    #[error("frame requires {required} bytes but the read limit is {limit}")]
    ReadLimitExceeded {
        /// Bytes required so far
        required: u64,
        /// Configured limit
        limit: u64,
    },

    /// A message does not hold exactly one frame.
    #[error("message of {message} bytes does not hold exactly one frame")]
    MessageBoundary {
        /// Size of the offending message
        message: usize,
    },
}

impl DetectError {
    /// The error kind a connection reports for this failure.
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ReadLimitExceeded { .. } => ErrorCode::ReadLimitExceeded,
            _ => ErrorCode::DetectionError,
        }
    }
}

fn check_limit(required: usize, read_limit: u64) -> Result<(), DetectError> {
    let required = required as u64;
    if read_limit > 0 && required > read_limit {
        return Err(DetectError::ReadLimitExceeded {
            required,
            limit: read_limit,
        });
    }
    Ok(())
}

/// Inspects the start of `buf` for a frame boundary.
///
/// `read_limit` caps the total frame length; 0 disables the check. The limit
/// is also applied to the bytes needed merely to finish the length field, so
/// an oversized frame is rejected as early as possible. An empty buffer is
/// never over the limit.
pub fn detect(buf: &[u8], read_limit: u64) -> Result<Detection, DetectError> {
    let Some(&header) = buf.first() else {
        return Ok(Detection::Incomplete {
            needed: MIN_FRAME_LEN,
        });
    };

    let packet_type = header >> 4;
    if packet_type == 0 || packet_type == 15 {
        return Err(DetectError::ReservedPacketType(packet_type));
    }

    let mut remaining = 0usize;
    for i in 0..MAX_LENGTH_BYTES {
        let Some(&byte) = buf.get(1 + i) else {
            let required = 2 + i;
            check_limit(required, read_limit)?;
            return Ok(Detection::Incomplete {
                needed: required - buf.len(),
            });
        };

        remaining |= usize::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            let length = 1 + (i + 1) + remaining;
            check_limit(length, read_limit)?;
            if buf.len() < length {
                return Ok(Detection::Incomplete {
                    needed: length - buf.len(),
                });
            }
            return Ok(Detection::Complete { length });
        }
    }

    Err(DetectError::RemainingLengthOverflow)
}

/// Checks that `message` holds exactly one complete frame and returns its length.
///
/// Used by message-oriented backends, where the medium already delimits
/// frames and a short or over-long message cannot be resynchronized.
pub fn detect_message(message: &[u8], read_limit: u64) -> Result<usize, DetectError> {
    match detect(message, read_limit)? {
        Detection::Complete { length } if length == message.len() => Ok(length),
        _ => Err(DetectError::MessageBoundary {
            message: message.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_buffers() {
        assert_eq!(detect(&[], 0), Ok(Detection::Incomplete { needed: 2 }));
        assert_eq!(detect(&[0x10], 0), Ok(Detection::Incomplete { needed: 1 }));
        assert_eq!(
            detect(&[0x10, 0x80], 0),
            Ok(Detection::Incomplete { needed: 1 })
        );
    }

    #[test]
    fn test_complete_frames() {
        assert_eq!(
            detect(&[0xC0, 0x00], 0),
            Ok(Detection::Complete { length: 2 })
        );
        assert_eq!(
            detect(&[0x20, 0x02, 0x00, 0x00, 0xFF], 0),
            Ok(Detection::Complete { length: 4 })
        );
        assert_eq!(
            detect(&[0x30, 0x80, 0x01], 0),
            Ok(Detection::Incomplete { needed: 128 })
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            detect(&[0x00, 0x00], 0),
            Err(DetectError::ReservedPacketType(0))
        );
        assert_eq!(
            detect(&[0xF0, 0x00], 0),
            Err(DetectError::ReservedPacketType(15))
        );
        assert_eq!(
            detect(&[0x10, 0xFF, 0xFF, 0xFF, 0x80], 0),
            Err(DetectError::RemainingLengthOverflow)
        );
    }

    #[test]
    fn test_read_limit() {
        assert_eq!(
            detect(&[0x10, 0x0C], 1),
            Err(DetectError::ReadLimitExceeded {
                required: 14,
                limit: 1
            })
        );
        // not over the limit until the length field is known to need more
        assert_eq!(detect(&[], 1), Ok(Detection::Incomplete { needed: 2 }));
        assert_eq!(
            detect(&[0x10], 1),
            Err(DetectError::ReadLimitExceeded {
                required: 2,
                limit: 1
            })
        );
        assert_eq!(
            detect(&[0xC0, 0x00], 2),
            Ok(Detection::Complete { length: 2 })
        );
        assert_eq!(
            detect(&[0x30, 0xFF, 0xFF], 3),
            Err(DetectError::ReadLimitExceeded {
                required: 4,
                limit: 3
            })
        );
    }

    #[test]
    fn test_message_framing() {
        assert_eq!(detect_message(&[0xC0, 0x00], 0), Ok(2));
        assert_eq!(
            detect_message(&[0xC0, 0x00, 0x00], 0),
            Err(DetectError::MessageBoundary { message: 3 })
        );
        assert_eq!(
            detect_message(&[0x20, 0x02, 0x00], 0),
            Err(DetectError::MessageBoundary { message: 3 })
        );
        assert_eq!(
            detect_message(&[0x10, 0xFF, 0xFF, 0xFF, 0x80], 0),
            Err(DetectError::RemainingLengthOverflow)
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            DetectError::RemainingLengthOverflow.error_code(),
            ErrorCode::DetectionError
        );
        assert_eq!(
            DetectError::ReadLimitExceeded {
                required: 2,
                limit: 1
            }
            .error_code(),
            ErrorCode::ReadLimitExceeded
        );
    }
}
