// Transport codecs: lift accepted sockets into normalized byte streams.

pub mod lines;
pub mod passthrough;
pub mod websocket;

use crate::domain::{StreamReader, StreamWriter};
use passthrough::{PassthroughReader, PassthroughWriter};
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::warn;
use websocket::{FrameReader, FrameWriter, HANDSHAKE_TIMEOUT, HandshakeError, HandshakePolicy};

/// Wire encoding spoken on a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    // Raw lines, no framing.
    Telnet,
    // RFC 6455 frames after an HTTP upgrade.
    WebSocket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transport::Telnet => "telnet",
            Transport::WebSocket => "websocket",
        })
    }
}

/// A configuration value that names no known option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown option: {0}")]
pub struct UnknownPolicy(pub String);

/// One accepted stream, already decoded into its read and write halves.
pub struct Connection {
    pub peer: String,
    pub transport: Transport,
    pub reader: Box<dyn StreamReader>,
    pub writer: Box<dyn StreamWriter>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn telnet<S>(stream: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            peer: peer.into(),
            transport: Transport::Telnet,
            reader: Box::new(PassthroughReader::new(read_half)),
            writer: Box::new(PassthroughWriter::new(write_half)),
        }
    }

    /// Performs the upgrade handshake, then serves frames. Returns `None`
    /// only when the handshake failed and the policy is `Reject`.
    pub async fn websocket<S>(
        stream: S,
        peer: impl Into<String>,
        policy: HandshakePolicy,
    ) -> Option<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let peer = peer.into();
        let (read_half, mut write_half) = tokio::io::split(stream);
        // The buffered reader stays in place after the upgrade so no frame
        // bytes read ahead with the request are lost.
        let mut read_half = BufReader::new(read_half);

        let handshake = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            websocket::accept_upgrade(&mut read_half, &mut write_half),
        )
        .await
        .unwrap_or(Err(HandshakeError::Timeout));

        if let Err(error) = handshake {
            match policy {
                HandshakePolicy::Degrade => {
                    warn!(%peer, %error, "websocket upgrade failed; serving degraded stream");
                }
                HandshakePolicy::Reject => {
                    warn!(%peer, %error, "websocket upgrade failed; dropping connection");
                    return None;
                }
            }
        }

        Some(Self {
            peer,
            transport: Transport::WebSocket,
            reader: Box::new(FrameReader::new(read_half)),
            writer: Box::new(FrameWriter::new(write_half)),
        })
    }

    pub async fn wrap<S>(
        stream: S,
        peer: impl Into<String>,
        transport: Transport,
        policy: HandshakePolicy,
    ) -> Option<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        match transport {
            Transport::Telnet => Some(Self::telnet(stream, peer)),
            Transport::WebSocket => Self::websocket(stream, peer, policy).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const UPGRADE: &str = "GET / HTTP/1.1\r\n\
        Host: localhost\r\n\
        Upgrade: websocket\r\n\
        Connection: keep-alive, Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    #[tokio::test]
    async fn websocket_connection_upgrades_then_speaks_frames() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(UPGRADE.as_bytes()).await.expect("send upgrade");

        let mut connection = Connection::websocket(server, "test", HandshakePolicy::Reject)
            .await
            .expect("valid upgrade should be accepted");
        assert_eq!(connection.transport, Transport::WebSocket);

        let mut head = vec![0u8; 256];
        let n = client.read(&mut head).await.expect("read response");
        let head = String::from_utf8_lossy(&head[..n]).to_string();
        assert!(head.starts_with("HTTP/1.1 101"), "{head}");

        connection.writer.write(b"help\n").await.expect("write frame");
        let mut frame = [0u8; 6];
        client.read_exact(&mut frame).await.expect("read frame");
        assert_eq!(frame, [0x81, 4, b'h', b'e', b'l', b'p']);
    }

    #[tokio::test]
    async fn failed_upgrade_is_dropped_under_reject() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"start test\n\n").await.expect("send garbage");

        let connection = Connection::websocket(server, "test", HandshakePolicy::Reject).await;
        assert!(connection.is_none());
    }

    #[tokio::test]
    async fn failed_upgrade_is_served_degraded_under_degrade() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"start test\n\n").await.expect("send garbage");

        let connection = Connection::websocket(server, "test", HandshakePolicy::Degrade).await;
        let connection = connection.expect("degraded connection is still returned");
        assert_eq!(connection.transport, Transport::WebSocket);
    }

    #[test]
    fn transport_names() {
        assert_eq!(Transport::Telnet.to_string(), "telnet");
        assert_eq!(Transport::WebSocket.to_string(), "websocket");
    }
}
