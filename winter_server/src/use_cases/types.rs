// Use-case level inputs and settings for sessions and games.

use std::time::Duration;

/// One input line, tagged with the sender's display name at the time the
/// session received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub line: String,
    pub player_name: String,
}

/// Shared configuration for every session the server spawns.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Board width; the target escapes once it reaches this column.
    pub width: u32,
    /// Board height; target rows are clamped to `0..height`.
    pub height: u32,
    /// Time between target moves.
    pub step_interval: Duration,
    /// Capacity of each session's raw input queue.
    pub input_channel_capacity: usize,
    /// Size of the buffer each transport read fills.
    pub read_buffer_size: usize,
}
