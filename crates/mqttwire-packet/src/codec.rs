//! Wire primitives: remaining length varint, length-prefixed fields and a
//! bounds-checked field reader.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PacketError, PacketResult};
use crate::types::PacketType;

/// Largest value a four byte remaining length field can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Number of bytes needed to encode `len` as a remaining length field.
pub const fn remaining_length_size(len: usize) -> usize {
    match len {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

pub(crate) fn put_remaining_length(buf: &mut BytesMut, mut len: usize) {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if len == 0 {
            break;
        }
    }
}

/// Parses a remaining length field at the start of `src`.
///
/// Returns the value and the number of bytes the field occupied.
pub(crate) fn read_remaining_length(src: &[u8]) -> PacketResult<(usize, usize)> {
    let mut value = 0usize;
    for (i, byte) in src.iter().take(4).enumerate() {
        value |= usize::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if src.len() >= 4 {
        Err(PacketError::MalformedLength)
    } else {
        Err(PacketError::IncompleteFrame)
    }
}

pub(crate) fn check_field(len: usize) -> PacketResult<()> {
    if len > usize::from(u16::MAX) {
        return Err(PacketError::FieldTooLong(len));
    }
    Ok(())
}

pub(crate) fn put_binary(buf: &mut BytesMut, field: &[u8]) {
    buf.put_u16(field.len() as u16);
    buf.put_slice(field);
}

pub(crate) fn put_string(buf: &mut BytesMut, field: &str) {
    put_binary(buf, field.as_bytes());
}

/// Length of a two byte prefixed field.
pub(crate) const fn field_len(len: usize) -> usize {
    2 + len
}

/// Bounds-checked cursor over a packet body.
pub(crate) struct Reader {
    packet_type: PacketType,
    buf: Bytes,
}

impl Reader {
    pub(crate) fn new(packet_type: PacketType, buf: Bytes) -> Self {
        Self { packet_type, buf }
    }

    fn need(&self, n: usize) -> PacketResult<()> {
        if self.buf.remaining() < n {
            return Err(PacketError::Truncated(self.packet_type));
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> PacketResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u16(&mut self) -> PacketResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub(crate) fn binary(&mut self) -> PacketResult<Bytes> {
        let len = usize::from(self.u16()?);
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    pub(crate) fn string(&mut self) -> PacketResult<String> {
        let raw = self.binary()?;
        String::from_utf8(raw.to_vec()).map_err(|_| PacketError::InvalidUtf8)
    }

    pub(crate) fn rest(&mut self) -> Bytes {
        std::mem::take(&mut self.buf)
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    pub(crate) fn finish(self) -> PacketResult<()> {
        if self.buf.has_remaining() {
            return Err(PacketError::TrailingBytes(
                self.packet_type,
                self.buf.remaining(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(len: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_remaining_length(&mut buf, len);
        buf.to_vec()
    }

    #[test]
    fn test_remaining_length_boundaries() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(127), vec![0x7F]);
        assert_eq!(encoded(128), vec![0x80, 0x01]);
        assert_eq!(encoded(16_383), vec![0xFF, 0x7F]);
        assert_eq!(encoded(16_384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encoded(MAX_REMAINING_LENGTH), vec![0xFF, 0xFF, 0xFF, 0x7F]);

        for len in [0, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152] {
            assert_eq!(encoded(len).len(), remaining_length_size(len));
        }
    }

    #[test]
    fn test_read_remaining_length() {
        assert_eq!(read_remaining_length(&[0x7F]), Ok((127, 1)));
        assert_eq!(read_remaining_length(&[0x80, 0x01, 0xAA]), Ok((128, 2)));
        assert_eq!(
            read_remaining_length(&[0xFF, 0xFF, 0xFF, 0x80]),
            Err(PacketError::MalformedLength)
        );
        assert_eq!(
            read_remaining_length(&[0xFF, 0xFF]),
            Err(PacketError::IncompleteFrame)
        );
    }

    #[test]
    fn test_reader_bounds() {
        let mut reader = Reader::new(PacketType::Publish, Bytes::from_static(&[0x00, 0x05, b'a']));
        assert_eq!(
            reader.string(),
            Err(PacketError::Truncated(PacketType::Publish))
        );

        let reader = Reader::new(PacketType::Pingreq, Bytes::from_static(&[0x01]));
        assert_eq!(
            reader.finish(),
            Err(PacketError::TrailingBytes(PacketType::Pingreq, 1))
        );
    }
}
