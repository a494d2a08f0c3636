//! Byte-stream backend implementation

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

use mqttwire_transport_traits::{Backend, BackendError, ChunkReader, ChunkWriter, Framing};

/// Default number of bytes reserved in the receive buffer per read.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Backend over any bidirectional byte stream.
///
/// The stream carries no message boundaries, so a frame may arrive split
/// across several reads or several frames may arrive in one.
pub struct StreamBackend<S> {
    stream: S,
    chunk_size: usize,
}

/// Backend over a connected TCP socket.
pub type TcpBackend = StreamBackend<TcpStream>;

impl<S> fmt::Debug for StreamBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBackend")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl<S> StreamBackend<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap an already connected stream.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set how many bytes are reserved per read. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamBackend<TcpStream> {
    /// Wrap a connected TCP socket, setting `TCP_NODELAY` as requested.
    pub fn from_tcp(stream: TcpStream, nodelay: bool) -> io::Result<Self> {
        stream.set_nodelay(nodelay)?;
        Ok(Self::new(stream))
    }
}

impl<S> Backend for StreamBackend<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Reader = StreamReader<S>;
    type Writer = StreamWriter<S>;

    fn framing(&self) -> Framing {
        Framing::Stream
    }

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (reader, writer) = tokio::io::split(self.stream);
        (
            StreamReader {
                inner: reader,
                chunk_size: self.chunk_size,
            },
            StreamWriter { inner: writer },
        )
    }
}

/// Read half of a [`StreamBackend`].
pub struct StreamReader<S> {
    inner: ReadHalf<S>,
    chunk_size: usize,
}

impl<S> fmt::Debug for StreamReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> ChunkReader for StreamReader<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, BackendError> {
        buf.reserve(self.chunk_size);
        let n = self.inner.read_buf(buf).await?;
        if n == 0 {
            return Err(BackendError::Closed);
        }
        trace!("read {} bytes from stream", n);
        Ok(n)
    }
}

/// Write half of a [`StreamBackend`].
pub struct StreamWriter<S> {
    inner: WriteHalf<S>,
}

impl<S> fmt::Debug for StreamWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> ChunkWriter for StreamWriter<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BackendError> {
        self.inner.write_all(&chunk).await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), BackendError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
