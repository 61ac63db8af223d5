// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};
use winter_server::ServerSettings;
use winter_server::interface_adapters::net::{self, OverflowPolicy};
use winter_server::interface_adapters::transport::Transport;
use winter_server::interface_adapters::transport::websocket::HandshakePolicy;
use winter_server::use_cases::SessionSettings;

/// Where the shared test server listens.
#[derive(Debug, Clone, Copy)]
pub struct ServerAddresses {
    pub telnet: SocketAddr,
    pub websocket: SocketAddr,
}

static SERVER: OnceLock<ServerAddresses> = OnceLock::new();

// Steps are slow so tests never see WALK lines unless they wait for them.
fn test_settings() -> ServerSettings {
    ServerSettings {
        session: SessionSettings {
            width: 30,
            height: 10,
            step_interval: Duration::from_secs(600),
            input_channel_capacity: 64,
            read_buffer_size: 4096,
        },
        queue_capacity: 10,
        overflow: OverflowPolicy::WaitForCapacity,
        handshake: HandshakePolicy::Reject,
    }
}

/// Ensure the test server is running and return its addresses.
pub fn ensure_server() -> ServerAddresses {
    *SERVER.get_or_init(|| {
        let published = Arc::new(OnceLock::<ServerAddresses>::new());
        let published_thread = Arc::clone(&published);
        // The server gets its own thread and runtime so it outlives each
        // `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let settings = test_settings();
                let (telnet_addr, telnet) =
                    net::listen("127.0.0.1:0", settings.source(Transport::Telnet))
                        .await
                        .expect("bind telnet port");
                let (websocket_addr, websocket) =
                    net::listen("127.0.0.1:0", settings.source(Transport::WebSocket))
                        .await
                        .expect("bind websocket port");
                let _ = published_thread.set(ServerAddresses {
                    telnet: telnet_addr,
                    websocket: websocket_addr,
                });
                winter_server::run(telnet, websocket, settings)
                    .await
                    .expect("server failed");
            });
        });
        wait_for_readiness(published)
    })
}

fn wait_for_readiness(published: Arc<OnceLock<ServerAddresses>>) -> ServerAddresses {
    let addresses = loop {
        if let Some(addresses) = published.get() {
            break *addresses;
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    // Listeners are bound before publishing, so one connect per port is
    // enough; these check connections just close again.
    for addr in [addresses.telnet, addresses.websocket] {
        std::net::TcpStream::connect(addr).expect("server accepting");
    }
    addresses
}
