//! The connection trait.

use async_trait::async_trait;
use mqttwire_packet::Packet;

use crate::error::TransportResult;

/// A packet connection, independent of the backend that carries it.
///
/// One sender and one receiver may run concurrently. `close` may be called
/// from anywhere at any time; in-flight operations then fail instead of
/// blocking.
#[async_trait]
pub trait Conn: Send + Sync + std::fmt::Debug {
    /// Encodes and writes one packet.
    async fn send(&self, packet: &Packet) -> TransportResult<()>;

    /// Reads and decodes the next packet.
    async fn receive(&self) -> TransportResult<Packet>;

    /// Tears the connection down. Idempotent.
    async fn close(&self) -> TransportResult<()>;

    /// Bytes of all completely received frames.
    fn bytes_read(&self) -> u64;

    /// Bytes of all completely sent packets.
    fn bytes_written(&self) -> u64;

    /// Sets the maximum frame length accepted by `receive`; 0 disables it.
    fn set_read_limit(&self, limit: u64);
}
