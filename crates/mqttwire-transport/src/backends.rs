//! Connection aliases and constructors for the bundled backends.

#[cfg(feature = "tcp")]
mod stream {
    use std::io;

    use mqttwire_tcp::StreamBackend;
    use tokio::io::{AsyncRead, AsyncWrite};
    use tokio::net::TcpStream;

    use crate::connection::Connection;

    /// A connection over a byte stream, TCP by default.
    pub type NetConn<S = TcpStream> = Connection<StreamBackend<S>>;

    impl<S> Connection<StreamBackend<S>>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        /// Wrap an already connected byte stream.
        pub fn from_stream(stream: S) -> Self {
            Self::new(StreamBackend::new(stream))
        }
    }

    impl Connection<StreamBackend<TcpStream>> {
        /// Wrap a connected TCP socket, setting `TCP_NODELAY` as requested.
        pub fn from_tcp(stream: TcpStream, nodelay: bool) -> io::Result<Self> {
            StreamBackend::from_tcp(stream, nodelay).map(Self::new)
        }
    }
}

#[cfg(feature = "websocket")]
mod websocket {
    use mqttwire_websocket::{WebSocketBackend, WebSocketStream};
    use tokio::io::{AsyncRead, AsyncWrite};
    use tokio::net::TcpStream;

    use crate::connection::Connection;

    /// A connection over binary WebSocket messages, on TCP by default.
    pub type WebSocketConn<S = TcpStream> = Connection<WebSocketBackend<S>>;

    impl<S> Connection<WebSocketBackend<S>>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        /// Wrap a WebSocket whose handshake has already completed.
        pub fn from_websocket(socket: WebSocketStream<S>) -> Self {
            Self::new(WebSocketBackend::new(socket))
        }
    }
}

#[cfg(feature = "tcp")]
pub use stream::NetConn;
#[cfg(feature = "websocket")]
pub use websocket::WebSocketConn;
