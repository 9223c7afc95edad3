//! # Socket Transport
//!
//! The seam between the stream client and the wire. Production dials a
//! `tokio-tungstenite` socket; tests script transports frame-by-frame
//! without any network.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Close code reported when the peer vanished without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Errors from the stream client and its transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// The socket failed to open or dropped mid-frame.
    #[error("transport error: {0}")]
    Transport(String),

    /// The hard connect timeout fired before the socket opened.
    #[error("connect timed out")]
    ConnectTimeout,

    /// Every reconnect attempt failed.
    #[error("connection lost after {attempts} reconnect attempts")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
    },

    /// The session was destroyed; nothing can be done with it anymore.
    #[error("stream client destroyed")]
    Destroyed,
}

/// One frame as seen by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A text payload.
    Text(String),
    /// The peer closed the socket.
    Closed {
        /// Close code; [`CLOSE_ABNORMAL`] when none was sent.
        code: u16,
    },
}

/// An open socket. Ping/pong and binary frames are the transport's own
/// business and never surface here.
#[async_trait]
pub trait SocketTransport: Send {
    /// Sends one text frame.
    async fn send(&mut self, text: String) -> Result<(), StreamError>;

    /// Receives the next frame; `None` once the socket is exhausted.
    async fn recv(&mut self) -> Option<Result<Frame, StreamError>>;

    /// Closes the socket with the given code. Idempotent best-effort.
    async fn close(&mut self, code: u16) -> Result<(), StreamError>;
}

/// Opens sockets. One connector per stream client; redials go through
/// the same connector.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Opens a fresh socket.
    async fn dial(&self) -> Result<Box<dyn SocketTransport>, StreamError>;
}

/// Production connector over `tokio-tungstenite`.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Creates a connector for the given socket endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SocketConnector for WsConnector {
    async fn dial(&self) -> Result<Box<dyn SocketTransport>, StreamError> {
        let (socket, _) = connect_async(&self.url)
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        tracing::debug!(url = %self.url, "socket open");
        Ok(Box::new(WsTransport { socket }))
    }
}

/// Production transport wrapping one open socket.
pub struct WsTransport {
    socket: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl SocketTransport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), StreamError> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, StreamError>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text))),
                Ok(Message::Close(frame)) => {
                    let code = frame.map_or(CLOSE_ABNORMAL, |f| u16::from(f.code));
                    return Some(Ok(Frame::Closed { code }));
                }
                // Ping/pong are answered by tungstenite itself; binary
                // frames are not part of this protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(StreamError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self, code: u16) -> Result<(), StreamError> {
        self.socket
            .close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            }))
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }
}
