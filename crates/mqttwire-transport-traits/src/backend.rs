//! Backend adapter contracts.
//!
//! A backend owns the underlying medium and knows how to move raw bytes in
//! and out of it. Frame detection, packet decoding and error classification
//! live above this layer and are identical for every backend.

use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::types::Framing;

/// Failures reported by a backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// The peer performed an orderly shutdown.
    #[error("connection closed by peer")]
    Closed,

    /// The medium failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The medium delivered something the backend cannot carry.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// The read half of a backend.
#[async_trait]
pub trait ChunkReader: Send + std::fmt::Debug {
    /// Appends the next chunk of bytes to `buf` and returns how many were added.
    ///
    /// Stream backends append whatever is available; message backends append
    /// exactly one message. An orderly end of input is [`BackendError::Closed`].
    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, BackendError>;
}

/// The write half of a backend.
#[async_trait]
pub trait ChunkWriter: Send + std::fmt::Debug {
    /// Writes one chunk. Message backends send it as a single message.
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BackendError>;

    /// Closes the medium for writing and signals the peer.
    async fn shutdown(&mut self) -> Result<(), BackendError>;
}

/// A medium that can carry frames, split into independent halves.
pub trait Backend: Send + std::fmt::Debug + 'static {
    /// Read half.
    type Reader: ChunkReader + 'static;
    /// Write half.
    type Writer: ChunkWriter + 'static;

    /// How the medium delimits frames.
    fn framing(&self) -> Framing;

    /// Splits the backend so reads and writes can proceed concurrently.
    fn split(self) -> (Self::Reader, Self::Writer);
}
