//! The packet connection.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use mqttwire_packet::Packet;
use mqttwire_transport_traits::{
    AtomicMetrics, Backend, ChunkWriter, Conn, ConnectionConfig, ConnectionMetrics,
    ConnectionState, ErrorCode, Framing, TransportError, TransportResult,
};

use crate::reader::FrameReader;

/// A packet connection over a backend.
///
/// `send` and `receive` may run concurrently with each other; concurrent
/// calls of the same operation are serialized. `close` may be called from
/// any task at any time and interrupts both.
///
/// Any detection, decode, encode, limit or I/O failure closes the
/// connection before the error is returned. The frame boundary cannot be
/// recovered once it is lost.
pub struct Connection<B: Backend> {
    id: Uuid,
    framing: Framing,
    reader: Mutex<Option<FrameReader<B::Reader>>>,
    writer: Mutex<Option<B::Writer>>,
    state: AtomicU8,
    read_limit: AtomicU64,
    metrics: AtomicMetrics,
    shutdown: CancellationToken,
    shutdown_timeout: Duration,
}

impl<B: Backend> fmt::Debug for Connection<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("framing", &self.framing)
            .field("state", &self.state())
            .field("read_limit", &self.read_limit())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Connection<B> {
    /// Wrap `backend` with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ConnectionConfig::default())
    }

    /// Wrap `backend` with an explicit configuration.
    pub fn with_config(backend: B, config: ConnectionConfig) -> Self {
        let framing = backend.framing();
        let (reader, writer) = backend.split();
        let id = Uuid::new_v4();
        debug!(conn_id = %id, %framing, read_limit = config.read_limit, "connection opened");

        Self {
            id,
            framing,
            reader: Mutex::new(Some(FrameReader::new(
                reader,
                framing,
                config.read_buffer_capacity,
            ))),
            writer: Mutex::new(Some(writer)),
            state: AtomicU8::new(ConnectionState::Open as u8),
            read_limit: AtomicU64::new(config.read_limit),
            metrics: AtomicMetrics::new(),
            shutdown: CancellationToken::new(),
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Encodes and writes `packet`.
    ///
    /// An invalid packet fails with [`ErrorCode::EncodeError`] and closes the
    /// connection. A write failure yields [`ErrorCode::NetworkError`]. Once the
    /// connection is closing, [`ErrorCode::ConnectionError`] is returned
    /// without touching the backend.
    pub async fn send(&self, packet: &Packet) -> TransportResult<()> {
        if !self.state().is_open() {
            return Err(TransportError::bare(ErrorCode::ConnectionError));
        }

        let bytes = match packet.encode() {
            Ok(bytes) => bytes,
            Err(err) => return self.fail(TransportError::new(ErrorCode::EncodeError, err)).await,
        };
        let len = bytes.len() as u64;

        let result = {
            let mut guard = self.writer.lock().await;
            let Some(writer) = guard.as_mut() else {
                return Err(TransportError::bare(ErrorCode::ConnectionError));
            };
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    Err(TransportError::new(ErrorCode::ExpectedClose, "connection closed during send"))
                }
                result = writer.write_chunk(bytes) => {
                    result.map_err(|err| TransportError::new(ErrorCode::NetworkError, err))
                }
            }
        };

        match result {
            Ok(()) => {
                self.metrics.record_sent(len);
                trace!(conn_id = %self.id, packet = %packet.packet_type(), len, "packet sent");
                Ok(())
            }
            Err(err) if err.is(ErrorCode::ExpectedClose) => Err(err),
            Err(err) => self.fail(err).await,
        }
    }

    /// Reads and decodes the next packet.
    ///
    /// Returns [`ErrorCode::ExpectedClose`] when the peer closed the medium or
    /// the connection is closed locally. A malformed length field is a
    /// [`ErrorCode::DetectionError`], an oversized frame is
    /// [`ErrorCode::ReadLimitExceeded`] and an undecodable frame is a
    /// [`ErrorCode::DecodeError`]. Every failure closes the connection.
    pub async fn receive(&self) -> TransportResult<Packet> {
        if !self.state().is_open() {
            return Err(TransportError::bare(ErrorCode::ExpectedClose));
        }

        let result = {
            let mut guard = self.reader.lock().await;
            let Some(reader) = guard.as_mut() else {
                return Err(TransportError::bare(ErrorCode::ExpectedClose));
            };
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    Err(TransportError::new(ErrorCode::ExpectedClose, "connection closed during receive"))
                }
                result = reader.next_frame(&self.read_limit) => result,
            }
        };

        let frame = match result {
            Ok(frame) => frame,
            Err(err) => return self.fail(err).await,
        };
        let len = frame.len() as u64;

        match Packet::decode(frame) {
            Ok(packet) => {
                self.metrics.record_received(len);
                trace!(conn_id = %self.id, packet = %packet.packet_type(), len, "packet received");
                Ok(packet)
            }
            Err(err) => self.fail(TransportError::new(ErrorCode::DecodeError, err)).await,
        }
    }

    /// Closes the connection. Only the first call tears the backend down;
    /// later and concurrent calls return immediately.
    pub async fn close(&self) -> TransportResult<()> {
        if self.begin_close() {
            self.teardown().await;
        }
        Ok(())
    }

    fn begin_close(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Open as u8,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    async fn teardown(&self) {
        self.shutdown.cancel();

        // A peer that stopped reading can stall the shutdown flush forever.
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            match tokio::time::timeout(self.shutdown_timeout, writer.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(conn_id = %self.id, "backend shutdown failed: {}", err),
                Err(_) => warn!(
                    conn_id = %self.id,
                    "backend shutdown timed out after {:?}", self.shutdown_timeout
                ),
            }
        }
        drop(self.reader.lock().await.take());

        self.state
            .store(ConnectionState::Closed as u8, Ordering::Release);
        debug!(conn_id = %self.id, "connection closed");
    }

    async fn fail<T>(&self, err: TransportError) -> TransportResult<T> {
        match err.code() {
            ErrorCode::ExpectedClose => debug!(conn_id = %self.id, "peer closed: {}", err),
            ErrorCode::NetworkError => debug!(conn_id = %self.id, "{}", err),
            _ => warn!(conn_id = %self.id, "{}", err),
        }
        if self.begin_close() {
            self.teardown().await;
        }
        Err(err)
    }

    /// Sets the maximum total frame length accepted by `receive`; 0 disables it.
    ///
    /// Applies to a receive that is already waiting for bytes.
    pub fn set_read_limit(&self, limit: u64) {
        self.read_limit.store(limit, Ordering::Release);
    }

    /// The current read limit, 0 when unlimited.
    pub fn read_limit(&self) -> u64 {
        self.read_limit.load(Ordering::Acquire)
    }

    /// Bytes of all completely received frames.
    pub fn bytes_read(&self) -> u64 {
        self.metrics.bytes_read()
    }

    /// Bytes of all completely sent packets.
    pub fn bytes_written(&self) -> u64 {
        self.metrics.bytes_written()
    }

    /// Snapshot of the traffic counters.
    pub fn metrics(&self) -> ConnectionMetrics {
        self.metrics.snapshot()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Identifier used in log output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// How the backend delimits frames.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Writes `bytes` to the backend as is, bypassing the encoder.
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) async fn write_raw(&self, bytes: bytes::Bytes) -> TransportResult<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or(TransportError::bare(ErrorCode::ConnectionError))?;
        writer
            .write_chunk(bytes)
            .await
            .map_err(|err| TransportError::new(ErrorCode::NetworkError, err))
    }
}

#[async_trait]
impl<B: Backend> Conn for Connection<B> {
    async fn send(&self, packet: &Packet) -> TransportResult<()> {
        Connection::send(self, packet).await
    }

    async fn receive(&self) -> TransportResult<Packet> {
        Connection::receive(self).await
    }

    async fn close(&self) -> TransportResult<()> {
        Connection::close(self).await
    }

    fn bytes_read(&self) -> u64 {
        Connection::bytes_read(self)
    }

    fn bytes_written(&self) -> u64 {
        Connection::bytes_written(self)
    }

    fn set_read_limit(&self, limit: u64) {
        Connection::set_read_limit(self, limit);
    }
}

#[cfg(all(test, feature = "tcp"))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use mqttwire_packet::{Connack, ConnackCode, Connect};
    use mqttwire_tcp::StreamBackend;
    use pretty_assertions::assert_eq;
    use tokio::io::{DuplexStream, duplex};

    use super::*;
    use crate::testing::RawInject;

    type Pipe = Connection<StreamBackend<DuplexStream>>;

    fn pair() -> (Pipe, Pipe) {
        let (a, b) = duplex(4096);
        (
            Connection::new(StreamBackend::new(a)),
            Connection::new(StreamBackend::new(b)),
        )
    }

    #[tokio::test]
    async fn test_new_connection_state() {
        let (conn, _peer) = pair();
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.framing(), Framing::Stream);
        assert_eq!(conn.read_limit(), 0);
        assert_eq!(conn.metrics(), ConnectionMetrics::default());
    }

    #[tokio::test]
    async fn test_with_config_sets_limit() {
        let (a, _b) = duplex(64);
        let conn = Connection::with_config(StreamBackend::new(a), ConnectionConfig::strict());
        assert_eq!(conn.read_limit(), 256 * 1024);
        conn.set_read_limit(0);
        assert_eq!(conn.read_limit(), 0);
    }

    #[tokio::test]
    async fn test_metrics_count_packets() {
        let (a, b) = pair();
        let connect = Packet::Connect(Connect::new("metrics"));
        a.send(&connect).await.unwrap();
        a.send(&Packet::Pingreq).await.unwrap();

        assert_eq!(b.receive().await.unwrap(), connect);
        assert_eq!(b.receive().await.unwrap(), Packet::Pingreq);

        let expected = (connect.len() + Packet::Pingreq.len()) as u64;
        assert_eq!(a.metrics().bytes_written, expected);
        assert_eq!(a.metrics().packets_sent, 2);
        assert_eq!(b.metrics().bytes_read, expected);
        assert_eq!(b.metrics().packets_received, 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (a, _b) = pair();
        a.close().await.unwrap();
        a.close().await.unwrap();
        assert_eq!(a.state(), ConnectionState::Closed);

        let err = a.receive().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedClose);
        let err = a.send(&Packet::Pingreq).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionError);
    }

    #[tokio::test]
    async fn test_close_unblocks_receive() {
        let (a, _b) = pair();
        let a = Arc::new(a);

        let receiver = {
            let a = Arc::clone(&a);
            tokio::spawn(async move { a.receive().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let closers: Vec<_> = (0..4)
            .map(|_| {
                let a = Arc::clone(&a);
                tokio::spawn(async move { a.close().await })
            })
            .collect();
        for closer in closers {
            closer.await.unwrap().unwrap();
        }

        let err = tokio::time::timeout(Duration::from_secs(5), receiver)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedClose);
    }

    #[tokio::test]
    async fn test_limit_set_during_receive() {
        let (a, b) = pair();
        let b = Arc::new(b);

        let receiver = {
            let b = Arc::clone(&b);
            tokio::spawn(async move { b.receive().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        b.set_read_limit(4);

        a.send(&Packet::Connect(Connect::new("too-big"))).await.unwrap();
        let err = receiver.await.unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReadLimitExceeded);
        assert_eq!(b.state(), ConnectionState::Closed);
        assert_eq!(b.bytes_read(), 0);
    }

    #[tokio::test]
    async fn test_encode_error_closes() {
        let (a, b) = pair();
        let invalid = Packet::Connack(Connack {
            session_present: false,
            return_code: 11,
        });
        let err = a.send(&invalid).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EncodeError);
        assert_eq!(a.state(), ConnectionState::Closed);
        assert_eq!(a.bytes_written(), 0);

        let err = b.receive().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedClose);
    }

    #[tokio::test]
    async fn test_partial_frame_not_counted() {
        let (a, b) = pair();
        a.inject_raw(Bytes::from_static(&[0x20, 0x02, 0x00])).await.unwrap();
        a.close().await.unwrap();

        let err = b.receive().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedClose);
        assert_eq!(b.bytes_read(), 0);
    }

    #[tokio::test]
    async fn test_decode_error_after_complete_frame() {
        let (a, b) = pair();
        let connack = Packet::Connack(Connack::new(ConnackCode::Accepted));
        a.send(&connack).await.unwrap();
        a.inject_raw(Bytes::from_static(&[0x20, 0x02, 0x00, 0x06]))
            .await
            .unwrap();

        assert_eq!(b.receive().await.unwrap(), connack);
        let err = b.receive().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DecodeError);
        assert_eq!(b.bytes_read(), connack.len() as u64);
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let (a, b) = pair();
        let a: Box<dyn Conn> = Box::new(a);
        a.send(&Packet::Pingreq).await.unwrap();
        assert_eq!(b.receive().await.unwrap(), Packet::Pingreq);
        assert_eq!(a.bytes_written(), 2);
        a.close().await.unwrap();
    }

    // ========================================================================
    // Backend failures
    // ========================================================================

    /// A backend whose medium fails on every read and write.
    #[derive(Debug, Default)]
    struct Broken {
        shutdowns: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[derive(Debug)]
    struct BrokenReader;

    #[derive(Debug)]
    struct BrokenWriter {
        shutdowns: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Backend for Broken {
        type Reader = BrokenReader;
        type Writer = BrokenWriter;

        fn framing(&self) -> Framing {
            Framing::Stream
        }

        fn split(self) -> (Self::Reader, Self::Writer) {
            (
                BrokenReader,
                BrokenWriter {
                    shutdowns: self.shutdowns,
                },
            )
        }
    }

    #[async_trait]
    impl mqttwire_transport_traits::ChunkReader for BrokenReader {
        async fn read_chunk(
            &mut self,
            _buf: &mut bytes::BytesMut,
        ) -> Result<usize, mqttwire_transport_traits::BackendError> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer").into())
        }
    }

    #[async_trait]
    impl ChunkWriter for BrokenWriter {
        async fn write_chunk(
            &mut self,
            _chunk: Bytes,
        ) -> Result<(), mqttwire_transport_traits::BackendError> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe").into())
        }

        async fn shutdown(&mut self) -> Result<(), mqttwire_transport_traits::BackendError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_network_error() {
        let backend = Broken::default();
        let shutdowns = Arc::clone(&backend.shutdowns);
        let conn = Connection::new(backend);

        let err = conn.send(&Packet::Pingreq).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkError);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.metrics(), ConnectionMetrics::default());

        let err = conn.send(&Packet::Pingreq).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionError);
        conn.close().await.unwrap();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_failure_is_network_error() {
        let backend = Broken::default();
        let shutdowns = Arc::clone(&backend.shutdowns);
        let conn = Connection::new(backend);

        let err = conn.receive().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkError);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.bytes_read(), 0);
        assert_eq!(conn.metrics().packets_received, 0);

        let err = conn.receive().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedClose);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    /// A writer whose shutdown never completes.
    #[derive(Debug)]
    struct Stalled;

    #[derive(Debug)]
    struct StalledWriter;

    impl Backend for Stalled {
        type Reader = BrokenReader;
        type Writer = StalledWriter;

        fn framing(&self) -> Framing {
            Framing::Message
        }

        fn split(self) -> (Self::Reader, Self::Writer) {
            (BrokenReader, StalledWriter)
        }
    }

    #[async_trait]
    impl ChunkWriter for StalledWriter {
        async fn write_chunk(
            &mut self,
            _chunk: Bytes,
        ) -> Result<(), mqttwire_transport_traits::BackendError> {
            std::future::pending().await
        }

        async fn shutdown(&mut self) -> Result<(), mqttwire_transport_traits::BackendError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_close_bounded_by_shutdown_timeout() {
        let config = ConnectionConfig::default().with_shutdown_timeout(Duration::from_millis(50));
        let conn = Arc::new(Connection::with_config(Stalled, config));

        let sender = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.send(&Packet::Pingreq).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(5), conn.close())
            .await
            .expect("close must not wait for a stalled backend")
            .unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);

        let err = sender.await.unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedClose);
        assert_eq!(conn.bytes_written(), 0);
    }
}
