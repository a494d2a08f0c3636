//! Frame reassembly on top of a backend read half.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{Bytes, BytesMut};

use mqttwire_transport_traits::{
    BackendError, ChunkReader, DetectError, Detection, ErrorCode, Framing, TransportError,
    TransportResult, detect, detect_message,
};

pub(crate) fn detect_failure(err: DetectError) -> TransportError {
    TransportError::new(err.error_code(), err)
}

pub(crate) fn read_failure(err: BackendError) -> TransportError {
    match err {
        BackendError::Closed => TransportError::new(ErrorCode::ExpectedClose, err),
        other => TransportError::new(ErrorCode::NetworkError, other),
    }
}

/// Pulls chunks from a backend until one complete frame is buffered.
#[derive(Debug)]
pub(crate) struct FrameReader<R> {
    inner: R,
    buffer: BytesMut,
    framing: Framing,
    max_reserve: usize,
}

impl<R: ChunkReader> FrameReader<R> {
    pub(crate) fn new(inner: R, framing: Framing, capacity: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(capacity),
            framing,
            max_reserve: capacity.max(1),
        }
    }

    /// Returns the next complete frame.
    ///
    /// The limit is reloaded before every detection step so that a change
    /// made while this read is pending still applies to it. The buffer grows
    /// with the bytes that actually arrive, never by the declared length alone.
    pub(crate) async fn next_frame(&mut self, read_limit: &AtomicU64) -> TransportResult<Bytes> {
        match self.framing {
            Framing::Stream => loop {
                let limit = read_limit.load(Ordering::Acquire);
                match detect(&self.buffer, limit).map_err(detect_failure)? {
                    Detection::Complete { length } => {
                        return Ok(self.buffer.split_to(length).freeze());
                    }
                    Detection::Incomplete { needed } => {
                        self.buffer.reserve(needed.min(self.max_reserve));
                        self.inner
                            .read_chunk(&mut self.buffer)
                            .await
                            .map_err(read_failure)?;
                    }
                }
            },
            Framing::Message => {
                self.buffer.clear();
                self.inner
                    .read_chunk(&mut self.buffer)
                    .await
                    .map_err(read_failure)?;
                let limit = read_limit.load(Ordering::Acquire);
                let length = detect_message(&self.buffer, limit).map_err(detect_failure)?;
                Ok(self.buffer.split_to(length).freeze())
            }
        }
    }
}
