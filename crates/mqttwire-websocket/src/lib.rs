//! # mqttwire WebSocket Backend
//!
//! Message-oriented backend for mqttwire connections. Each binary WebSocket
//! message carries exactly one frame, so the connection checks message and
//! frame boundaries against each other instead of reassembling a stream.
//!
//! ## Features
//!
//! - **No handshake logic**: wraps a `WebSocketStream` that is already open
//! - **Binary only**: text messages are a protocol violation
//! - **Orderly close**: a close frame or a dropped socket is reported as a closed peer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mqttwire_websocket::WebSocketBackend;
//! use tokio_tungstenite::connect_async;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (socket, _) = connect_async("ws://127.0.0.1:8080/mqtt").await?;
//!     let backend = WebSocketBackend::new(socket);
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

pub use backend::{WebSocketBackend, WebSocketReader, WebSocketWriter};
pub use tokio_tungstenite::WebSocketStream;

// Re-export transport traits for convenience
pub use mqttwire_transport_traits::{Backend, BackendError, ChunkReader, ChunkWriter, Framing};
