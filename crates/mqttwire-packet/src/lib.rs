//! # mqttwire packet
//!
//! MQTT 3.1.1 control packets and their wire codec.
//!
//! Every packet knows its own encoded length ([`Packet::len`]) and can encode
//! itself ([`Packet::encode`]) or be decoded from exactly one complete frame
//! ([`Packet::decode`]). Field validation happens on both paths, so a packet
//! that the encoder accepts always decodes back to an equal value.
//!
//! ```rust
//! use mqttwire_packet::{Connack, ConnackCode, Packet};
//!
//! let packet = Packet::Connack(Connack::new(ConnackCode::Accepted));
//! let bytes = packet.encode().unwrap();
//! assert_eq!(bytes.len(), packet.len());
//! assert_eq!(Packet::decode(bytes).unwrap(), packet);
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod codec;
mod error;
mod packet;
mod types;

pub use codec::{MAX_REMAINING_LENGTH, remaining_length_size};
pub use error::{PacketError, PacketResult};
pub use packet::{Connack, Connect, Packet, Publish, Suback, Subscribe, Subscription, Unsubscribe, Will};
pub use types::{ConnackCode, PacketType, ProtocolVersion, QoS};
