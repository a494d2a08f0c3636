//! Packet codec errors.

use thiserror::Error;

use crate::types::PacketType;

/// A specialized `Result` type for packet encoding and decoding.
pub type PacketResult<T> = std::result::Result<T, PacketError>;

/// Errors raised while validating, encoding or decoding a packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PacketError {
    /// The header byte names packet type 0 or 15.
    #[error("reserved packet type {0}")]
    ReservedType(u8),

    /// The fixed header flags are not the ones mandated for the packet type.
    #[error("invalid fixed header flags {flags:#06b} for {packet_type} packet")]
    InvalidFlags {
        /// Packet type from the header byte
        packet_type: PacketType,
        /// Low nibble of the header byte
        flags: u8,
    },

    /// The frame ended before the remaining length field did.
    #[error("frame ends inside the remaining length field")]
    IncompleteFrame,

    /// The remaining length field uses more than four bytes.
    #[error("remaining length field exceeds four bytes")]
    MalformedLength,

    /// The packet is too large to be framed.
    #[error("remaining length {0} exceeds the maximum of 268435455")]
    LengthTooLarge(usize),

    /// The frame does not hold exactly the declared number of bytes.
    #[error("remaining length {declared} does not match the {actual} bytes in the frame")]
    LengthMismatch {
        /// Value of the remaining length field
        declared: usize,
        /// Bytes actually present after the length field
        actual: usize,
    },

    /// A field runs past the end of the packet.
    #[error("unexpected end of {0} packet")]
    Truncated(PacketType),

    /// Bytes are left over after the last field.
    #[error("{0} packet has {1} trailing bytes")]
    TrailingBytes(PacketType, usize),

    /// A string field is not valid UTF-8.
    #[error("string field is not valid utf-8")]
    InvalidUtf8,

    /// A string or binary field is longer than a two byte length prefix allows.
    #[error("field of {0} bytes exceeds 65535")]
    FieldTooLong(usize),

    /// CONNECT carries an unknown protocol name.
    #[error("invalid protocol name {0:?}")]
    InvalidProtocolName(String),

    /// CONNECT carries a protocol level that does not match its protocol name.
    #[error("invalid protocol level {0}")]
    InvalidProtocolLevel(u8),

    /// CONNECT flags violate the reserved bit or will rules.
    #[error("invalid connect flags {0:#010b}")]
    InvalidConnectFlags(u8),

    /// CONNACK acknowledge flags use reserved bits.
    #[error("invalid connack flags {0:#010b}")]
    InvalidConnackFlags(u8),

    /// CONNACK return code is outside 0..=5.
    #[error("invalid connack return code {0}")]
    InvalidReturnCode(u8),

    /// A QoS level above 2.
    #[error("invalid qos level {0}")]
    InvalidQos(u8),

    /// A SUBACK return code other than 0, 1, 2 or 0x80.
    #[error("invalid suback return code {0:#04x}")]
    InvalidSubackCode(u8),

    /// The packet needs a non-zero packet identifier.
    #[error("{0} packet requires a non-zero packet identifier")]
    ZeroPacketId(PacketType),

    /// A QoS 0 PUBLISH carries a packet identifier.
    #[error("qos 0 publish must not carry a packet identifier")]
    UnexpectedPacketId,

    /// A QoS 0 PUBLISH has the DUP flag set.
    #[error("qos 0 publish must not set the dup flag")]
    InvalidDup,

    /// The packet needs at least one entry in its payload.
    #[error("{0} packet must carry at least one entry")]
    EmptyPayload(PacketType),

    /// A topic name or filter is empty.
    #[error("topic must not be empty")]
    EmptyTopic,

    /// A password was given without a username.
    #[error("password requires a username")]
    PasswordWithoutUsername,
}
