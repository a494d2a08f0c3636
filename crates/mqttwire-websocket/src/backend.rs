//! WebSocket backend implementation

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use mqttwire_transport_traits::{Backend, BackendError, ChunkReader, ChunkWriter, Framing};

/// Backend over an established WebSocket.
///
/// Every binary message carries exactly one frame. Control messages are
/// handled by the WebSocket layer and never reach the connection.
pub struct WebSocketBackend<S> {
    socket: WebSocketStream<S>,
}

impl<S> fmt::Debug for WebSocketBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketBackend").finish_non_exhaustive()
    }
}

impl<S> WebSocketBackend<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap a WebSocket whose handshake has already completed.
    #[must_use]
    pub fn new(socket: WebSocketStream<S>) -> Self {
        Self { socket }
    }

    /// Return the wrapped WebSocket.
    pub fn into_inner(self) -> WebSocketStream<S> {
        self.socket
    }
}

impl<S> From<WebSocketStream<S>> for WebSocketBackend<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    fn from(socket: WebSocketStream<S>) -> Self {
        Self::new(socket)
    }
}

impl<S> Backend for WebSocketBackend<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Reader = WebSocketReader<S>;
    type Writer = WebSocketWriter<S>;

    fn framing(&self) -> Framing {
        Framing::Message
    }

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (sink, stream) = self.socket.split();
        (WebSocketReader { stream }, WebSocketWriter { sink })
    }
}

fn map_ws_error(err: WsError) -> BackendError {
    match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => BackendError::Closed,
        WsError::Io(err) => BackendError::Io(err),
        other => BackendError::Protocol(other.to_string()),
    }
}

/// Read half of a [`WebSocketBackend`].
pub struct WebSocketReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

impl<S> fmt::Debug for WebSocketReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketReader").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> ChunkReader for WebSocketReader<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, BackendError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    trace!("received binary message: {} bytes", data.len());
                    buf.extend_from_slice(&data);
                    return Ok(data.len());
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Text(text))) => {
                    return Err(BackendError::Protocol(format!(
                        "unexpected text message of {} bytes",
                        text.len()
                    )));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("received close frame: {:?}", frame);
                    return Err(BackendError::Closed);
                }
                Some(Err(err)) => return Err(map_ws_error(err)),
                None => return Err(BackendError::Closed),
            }
        }
    }
}

/// Write half of a [`WebSocketBackend`].
pub struct WebSocketWriter<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> fmt::Debug for WebSocketWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketWriter").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> ChunkWriter for WebSocketWriter<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BackendError> {
        self.sink
            .send(Message::Binary(chunk))
            .await
            .map_err(map_ws_error)
    }

    async fn shutdown(&mut self) -> Result<(), BackendError> {
        match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(map_ws_error(err)),
        }
    }
}
