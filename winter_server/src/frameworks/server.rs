// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{self, OverflowPolicy, SourceSettings};
use crate::interface_adapters::transport::websocket::HandshakePolicy;
use crate::interface_adapters::transport::{Connection, Transport};
use crate::use_cases::{GameRegistry, Session, SessionSettings};

use std::{io::Result, sync::Arc};
use tokio::sync::mpsc;
use tracing::{Instrument, field};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Everything the server needs besides its listeners.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub session: SessionSettings,
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    pub handshake: HandshakePolicy,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            session: SessionSettings {
                width: config::board_width(),
                height: config::board_height(),
                step_interval: config::step_interval(),
                input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
                read_buffer_size: config::READ_BUFFER_SIZE,
            },
            queue_capacity: config::CONNECTION_QUEUE_CAPACITY,
            overflow: config::overflow_policy(),
            handshake: config::handshake_policy(),
        }
    }

    pub fn source(&self, transport: Transport) -> SourceSettings {
        SourceSettings {
            transport,
            queue_capacity: self.queue_capacity,
            overflow: self.overflow,
            handshake: self.handshake,
        }
    }
}

/// Serves both connection sources against one shared registry until
/// Ctrl-C, or until both sources have closed.
pub async fn run(
    telnet: mpsc::Receiver<Connection>,
    websocket: mpsc::Receiver<Connection>,
    settings: ServerSettings,
) -> Result<()> {
    // One registry for both transports so players can join across them.
    let registry = Arc::new(GameRegistry::new());

    let telnet_task = tokio::spawn(serve_sessions(
        telnet,
        registry.clone(),
        settings.session.clone(),
    ));
    let websocket_task = tokio::spawn(serve_sessions(
        websocket,
        registry,
        settings.session.clone(),
    ));

    let both_closed = async {
        let _ = telnet_task.await;
        let _ = websocket_task.await;
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.inspect_err(|e| tracing::error!(error = %e, "failed to listen for shutdown signal"))?;
            tracing::info!("shutting down");
        }
        _ = both_closed => {
            tracing::warn!("connection sources closed");
        }
    }
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let settings = ServerSettings::from_env();

    // Bind failures are fatal; there is no retry.
    let (_, telnet) =
        net::listen(&config::telnet_address(), settings.source(Transport::Telnet)).await?;
    let (_, websocket) = net::listen(
        &config::websocket_address(),
        settings.source(Transport::WebSocket),
    )
    .await?;

    run(telnet, websocket, settings).await
}

/// Starts a session for every connection a source hands over.
async fn serve_sessions(
    mut connections: mpsc::Receiver<Connection>,
    registry: Arc<GameRegistry>,
    settings: SessionSettings,
) {
    while let Some(connection) = connections.recv().await {
        let span = tracing::info_span!(
            "session",
            player_id = field::Empty,
            transport = %connection.transport,
            peer = %connection.peer,
        );
        // Build inside the span so the input reader task inherits it.
        let session =
            span.in_scope(|| Session::start(connection, registry.clone(), settings.clone()));
        span.record("player_id", session.player_id().get());
        tokio::spawn(session.run().instrument(span));
    }
}
