// Connection source: accept loop publishing decoded streams on a bounded queue.

use crate::interface_adapters::transport::websocket::HandshakePolicy;
use crate::interface_adapters::transport::{Connection, Transport, UnknownPolicy};
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

/// What to do with a freshly accepted connection when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Shed the new connection so the accept loop never stalls.
    #[default]
    DropOnFull,
    /// Hold the connection until the server catches up.
    WaitForCapacity,
}

impl FromStr for OverflowPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(OverflowPolicy::DropOnFull),
            "wait" => Ok(OverflowPolicy::WaitForCapacity),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SourceSettings {
    pub transport: Transport,
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    pub handshake: HandshakePolicy,
}

/// Binds `address` and starts accepting. A bind failure is returned to the
/// caller; there is no retry.
pub async fn listen(
    address: &str,
    settings: SourceSettings,
) -> std::io::Result<(SocketAddr, mpsc::Receiver<Connection>)> {
    let listener = TcpListener::bind(address).await.inspect_err(|e| {
        error!(%address, transport = %settings.transport, error = %e, "failed to bind");
    })?;
    let local = listener.local_addr()?;
    info!(address = %local, transport = %settings.transport, "listening");
    Ok((local, serve(listener, settings)))
}

/// Spawns the accept loop on an already bound listener. The returned queue
/// closes once accepting fails and every in-flight wrapper has finished.
pub fn serve(listener: TcpListener, settings: SourceSettings) -> mpsc::Receiver<Connection> {
    let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
    tokio::spawn(accept_loop(listener, tx, settings));
    rx
}

async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::Sender<Connection>,
    settings: SourceSettings,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(transport = %settings.transport, error = %e, "accept failed; closing connection source");
                return;
            }
        };
        debug!(%peer, transport = %settings.transport, "accepted connection");

        // Wrapping runs off the accept loop so a slow upgrade never blocks it.
        let tx = tx.clone();
        tokio::spawn(async move {
            let Some(connection) =
                Connection::wrap(stream, peer.to_string(), settings.transport, settings.handshake)
                    .await
            else {
                return;
            };
            offer(&tx, connection, settings.overflow).await;
        });
    }
}

/// Hands a connection to the server. Returns false if it was shed or the
/// queue is closed.
pub async fn offer(
    tx: &mpsc::Sender<Connection>,
    connection: Connection,
    policy: OverflowPolicy,
) -> bool {
    match policy {
        OverflowPolicy::DropOnFull => match tx.try_send(connection) {
            Ok(()) => true,
            Err(TrySendError::Full(connection)) => {
                warn!(peer = %connection.peer, "connection queue full; dropping connection");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        },
        OverflowPolicy::WaitForCapacity => tx.send(connection).await.is_ok(),
    }
}
