//! # mqttwire Transport Traits
//!
//! Core transport traits and types for mqttwire. This crate provides the
//! foundation every backend and the connection itself depend on.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Errors**: [`ErrorCode`], [`TransportError`], [`TransportResult`]
//! - **Detection**: [`detect`], [`detect_message`], [`Detection`], [`DetectError`]
//! - **Backends**: [`Backend`], [`ChunkReader`], [`ChunkWriter`], [`BackendError`]
//! - **Traits**: [`Conn`]
//! - **Config**: [`ConnectionConfig`]
//! - **Metrics**: [`ConnectionMetrics`], [`AtomicMetrics`]
//!
//! ## Usage
//!
//! Backends implement [`Backend`] and hand out a reader and a writer half:
//!
//! ```rust,ignore
//! use mqttwire_transport_traits::{Backend, Framing};
//!
//! #[derive(Debug)]
//! struct MyBackend { /* ... */ }
//!
//! impl Backend for MyBackend {
//!     type Reader = MyReader;
//!     type Writer = MyWriter;
//!     fn framing(&self) -> Framing { Framing::Stream }
//!     fn split(self) -> (MyReader, MyWriter) { /* ... */ }
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
mod config;
mod detect;
mod error;
mod metrics;
mod traits;
mod types;

// Re-export all public items
pub use backend::{Backend, BackendError, ChunkReader, ChunkWriter};
pub use config::{ConnectionConfig, DEFAULT_READ_BUFFER_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
pub use detect::{DetectError, Detection, MIN_FRAME_LEN, detect, detect_message};
pub use error::{BoxError, ErrorCode, TransportError, TransportResult, UnknownErrorCode};
pub use metrics::{AtomicMetrics, ConnectionMetrics};
pub use traits::Conn;
pub use types::{ConnectionState, Framing};
