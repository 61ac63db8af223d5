// Ports between the session engine and whatever transport carries its bytes.

use async_trait::async_trait;
use std::io;

/// Outcome of a single read: how many bytes landed in the caller's buffer and
/// whether the stream ended with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadChunk {
    pub len: usize,
    pub eof: bool,
}

impl ReadChunk {
    pub fn data(len: usize) -> Self {
        Self { len, eof: false }
    }

    pub fn end(len: usize) -> Self {
        Self { len, eof: true }
    }
}

/// Inbound half of a normalized byte stream.
#[async_trait]
pub trait StreamReader: Send {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadChunk>;
}

/// Outbound half of a normalized byte stream. Each call is flushed before it
/// returns.
#[async_trait]
pub trait StreamWriter: Send {
    async fn write(&mut self, buf: &[u8]) -> io::Result<()>;
}
