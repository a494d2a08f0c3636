//! # mqttwire Transport
//!
//! Packet connections over byte streams and WebSockets. A [`Connection`]
//! wraps an already established backend and exchanges MQTT packets over it,
//! with the same framing rules, error codes and close behaviour whichever
//! backend carries the bytes.
//!
//! ## Supported Backends
//!
//! - **Byte stream** (`tcp` feature): TCP or any tokio `AsyncRead + AsyncWrite`, see [`NetConn`]
//! - **WebSocket** (`websocket` feature): one frame per binary message, see [`WebSocketConn`]
//!
//! ## Error Handling
//!
//! Every failure carries an [`ErrorCode`]. Detection, decode, encode, limit
//! and I/O failures are fatal: the connection closes itself before the error
//! is returned, and the peer then observes [`ErrorCode::ExpectedClose`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "tcp")]
//! # {
//! use mqttwire_transport::{Connect, ErrorCode, NetConn, Packet};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = TcpStream::connect("127.0.0.1:1883").await?;
//!     let conn = NetConn::from_tcp(stream, true)?;
//!
//!     conn.send(&Packet::Connect(Connect::new("client-1"))).await?;
//!     match conn.receive().await {
//!         Ok(Packet::Connack(connack)) => println!("connected: {:?}", connack.code()),
//!         Ok(other) => println!("unexpected {:?}", other.packet_type()),
//!         Err(err) if err.is(ErrorCode::ExpectedClose) => println!("server went away"),
//!         Err(err) => return Err(err.into()),
//!     }
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! # }
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

mod backends;
mod connection;
mod reader;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use connection::Connection;

#[cfg(feature = "tcp")]
pub use backends::NetConn;
#[cfg(feature = "websocket")]
pub use backends::WebSocketConn;

// Re-export the packet model
pub use mqttwire_packet::{
    Connack, ConnackCode, Connect, Packet, PacketError, PacketType, ProtocolVersion, Publish, QoS,
    Suback, Subscribe, Subscription, Unsubscribe, Will,
};

// Re-export transport traits for convenience
pub use mqttwire_transport_traits::{
    AtomicMetrics, Backend, BackendError, ChunkReader, ChunkWriter, Conn, ConnectionConfig,
    ConnectionMetrics, ConnectionState, DetectError, Detection, ErrorCode, Framing,
    TransportError, TransportResult,
};

// Re-export backend crates
#[cfg(feature = "tcp")]
pub use mqttwire_tcp::{StreamBackend, TcpBackend};
#[cfg(feature = "websocket")]
pub use mqttwire_websocket::{WebSocketBackend, WebSocketStream};
