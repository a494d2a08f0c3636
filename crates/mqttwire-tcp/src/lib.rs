//! # mqttwire TCP Backend
//!
//! Byte-stream backend for mqttwire connections. Wraps an already connected
//! TCP socket, or any other tokio `AsyncRead + AsyncWrite` stream such as an
//! in-memory duplex pipe or a TLS stream.
//!
//! ## Features
//!
//! - **No dialing**: the caller establishes the socket, this crate only moves bytes
//! - **Split halves**: reads and writes proceed concurrently
//! - **Orderly close**: end of input is reported as a closed peer, not an error
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mqttwire_tcp::TcpBackend;
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = TcpStream::connect("127.0.0.1:1883").await?;
//!     let backend = TcpBackend::from_tcp(stream, true)?;
//!     // hand the backend to mqttwire_transport::Connection::new
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod backend;

pub use backend::{DEFAULT_CHUNK_SIZE, StreamBackend, StreamReader, StreamWriter, TcpBackend};

// Re-export transport traits for convenience
pub use mqttwire_transport_traits::{Backend, BackendError, ChunkReader, ChunkWriter, Framing};
