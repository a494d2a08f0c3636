//! Property-based tests for frame detection
//!
//! Uses proptest to verify invariants of:
//! - Complete frame detection for every representable remaining length
//! - Incomplete detection on truncated frames
//! - Read limit enforcement

use mqttwire_transport_traits::{DetectError, Detection, detect, detect_message};
use proptest::prelude::*;

const MAX_REMAINING_LENGTH: usize = 268_435_455;

fn encode_length(mut len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            return out;
        }
    }
}

/// Header plus length field for a frame with `remaining` body bytes.
fn frame_head(header: u8, remaining: usize) -> Vec<u8> {
    let mut head = vec![header];
    head.extend(encode_length(remaining));
    head
}

fn header_strategy() -> impl Strategy<Value = u8> {
    (1u8..=14, 0u8..=15).prop_map(|(packet_type, flags)| (packet_type << 4) | flags)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a complete small frame is detected with its exact length
    #[test]
    fn prop_complete_frame_length(
        header in header_strategy(),
        body in prop::collection::vec(any::<u8>(), 0..512),
        trailing in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let mut buf = frame_head(header, body.len());
        let expected = buf.len() + body.len();
        buf.extend(&body);
        buf.extend(&trailing);
        prop_assert_eq!(detect(&buf, 0), Ok(Detection::Complete { length: expected }));
    }

    /// Property: every representable remaining length yields header + field + body
    #[test]
    fn prop_declared_length(header in header_strategy(), remaining in 0..=MAX_REMAINING_LENGTH) {
        let head = frame_head(header, remaining);
        let total = head.len() + remaining;
        let detection = detect(&head, 0).unwrap();
        if remaining == 0 {
            prop_assert_eq!(detection, Detection::Complete { length: total });
        } else {
            prop_assert_eq!(detection, Detection::Incomplete { needed: remaining });
        }
    }

    /// Property: any strict prefix of a frame is incomplete
    #[test]
    fn prop_truncated_frame_incomplete(
        header in header_strategy(),
        body in prop::collection::vec(any::<u8>(), 1..256),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut buf = frame_head(header, body.len());
        buf.extend(&body);
        let prefix = &buf[..cut.index(buf.len())];
        let is_incomplete = matches!(detect(prefix, 0), Ok(Detection::Incomplete { .. }));
        prop_assert!(is_incomplete);
    }

    /// Property: a limit below the frame length is always reported, a limit at or above never
    #[test]
    fn prop_read_limit(
        header in header_strategy(),
        remaining in 0usize..100_000,
        limit in 1u64..200_000,
    ) {
        let head = frame_head(header, remaining);
        let total = (head.len() + remaining) as u64;
        let result = detect(&head, limit);
        if total > limit {
            prop_assert_eq!(result, Err(DetectError::ReadLimitExceeded { required: total, limit }));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Property: a message framed with extra bytes never passes the boundary check
    #[test]
    fn prop_message_with_extra_bytes(
        header in header_strategy(),
        body in prop::collection::vec(any::<u8>(), 0..64),
        extra in prop::collection::vec(any::<u8>(), 1..8),
    ) {
        let mut buf = frame_head(header, body.len());
        buf.extend(&body);
        prop_assert_eq!(detect_message(&buf, 0), Ok(buf.len()));
        let len = buf.len();
        buf.extend(&extra);
        prop_assert_eq!(
            detect_message(&buf, 0),
            Err(DetectError::MessageBoundary { message: len + extra.len() })
        );
    }
}

#[test]
fn test_overflowing_length_field() {
    for header in [0x10, 0x30, 0xE0] {
        assert_eq!(
            detect(&[header, 0xFF, 0xFF, 0xFF, 0x80], 0),
            Err(DetectError::RemainingLengthOverflow)
        );
    }
}
