//! Test-only helpers.
//!
//! Compiled for this crate's own tests and behind the `test-utils` feature.

use async_trait::async_trait;
use bytes::Bytes;

use mqttwire_transport_traits::{Backend, TransportResult};

use crate::connection::Connection;

/// Writes bytes to the peer without going through the packet encoder.
///
/// Used to feed malformed frames to the other end of a connection. On a
/// stream backend the bytes are written as is; on a message backend they
/// become one message.
#[async_trait]
pub trait RawInject {
    /// Writes `bytes` verbatim.
    async fn inject_raw(&self, bytes: Bytes) -> TransportResult<()>;
}

#[async_trait]
impl<B: Backend> RawInject for Connection<B> {
    async fn inject_raw(&self, bytes: Bytes) -> TransportResult<()> {
        self.write_raw(bytes).await
    }
}
