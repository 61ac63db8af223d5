use crate::interface_adapters::net::OverflowPolicy;
use crate::interface_adapters::transport::websocket::HandshakePolicy;
use std::{env, str::FromStr, time::Duration};

// Listener and gameplay settings, read from the environment with defaults.

pub fn telnet_address() -> String {
    env::var("TELNET_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

pub fn websocket_address() -> String {
    env::var("WEBSOCKET_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8888".to_string())
}

pub fn board_width() -> u32 {
    positive("BOARD_WIDTH").unwrap_or(30)
}

pub fn board_height() -> u32 {
    positive("BOARD_HEIGHT").unwrap_or(10)
}

pub fn step_interval() -> Duration {
    let millis = env::var("STEP_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(3000);
    Duration::from_millis(millis)
}

pub fn overflow_policy() -> OverflowPolicy {
    policy("CONNECTION_OVERFLOW")
}

pub fn handshake_policy() -> HandshakePolicy {
    policy("HANDSHAKE_FAILURE")
}

fn positive(key: &str) -> Option<u32> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
}

// Unknown values fall back to the default with a warning.
fn policy<T>(key: &str) -> T
where
    T: FromStr + Default,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            tracing::warn!(key, %value, error = %e, "ignoring invalid setting");
            T::default()
        }),
        Err(_) => T::default(),
    }
}

pub const CONNECTION_QUEUE_CAPACITY: usize = 10;
pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const READ_BUFFER_SIZE: usize = 4096;
