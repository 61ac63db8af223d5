// Framed-message codec: RFC 6455 frames unwrapped into lines and back.

use crate::domain::{ReadChunk, StreamReader, StreamWriter};
use async_trait::async_trait;
use std::io::{self, Cursor};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::tungstenite::{
    self,
    handshake::server::create_response,
    http::{Request, Version},
    protocol::frame::{
        FrameHeader,
        coding::{Control, Data, OpCode},
    },
};

use super::UnknownPolicy;

// 2 fixed bytes + 8 bytes extended length + 4 bytes mask.
const MAX_HEADER_LEN: usize = 14;
const MAX_REQUEST_HEADERS: usize = 64;
const MAX_REQUEST_BYTES: u64 = 8 * 1024;
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// What to do with a connection whose upgrade handshake failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakePolicy {
    /// Log the failure and serve the stream through the frame codec anyway.
    #[default]
    Degrade,
    /// Log the failure and drop the connection.
    Reject,
}

impl FromStr for HandshakePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(HandshakePolicy::Degrade),
            "reject" => Ok(HandshakePolicy::Reject),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("io error during upgrade: {0}")]
    Io(#[from] io::Error),
    #[error("malformed upgrade request: {0}")]
    Malformed(&'static str),
    #[error("invalid upgrade request: {0}")]
    Http(#[from] tungstenite::http::Error),
    #[error("upgrade refused: {0}")]
    Refused(#[from] tungstenite::Error),
    #[error("upgrade timed out")]
    Timeout,
}

/// Header of one decoded frame. Produced by each read; never reused for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub opcode: OpCode,
    pub mask: Option<[u8; 4]>,
    pub len: u64,
}

impl FrameDescriptor {
    /// Final, unmasked text frame as sent by the server.
    pub fn text(len: usize) -> Self {
        Self {
            opcode: OpCode::Data(Data::Text),
            mask: None,
            len: len as u64,
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self.opcode, OpCode::Control(Control::Close))
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(
            self.opcode,
            OpCode::Control(Control::Ping) | OpCode::Control(Control::Pong)
        )
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> io::Result<()> {
        let header = FrameHeader {
            is_final: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: self.opcode,
            mask: self.mask,
        };
        header.format(self.len, out).map_err(io::Error::other)
    }

    /// Reads exactly one frame header off the stream.
    pub async fn decode<R>(reader: &mut R) -> io::Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut head = [0u8; MAX_HEADER_LEN];
        reader.read_exact(&mut head[..2]).await?;

        let mut len = 2;
        len += match head[1] & 0x7F {
            126 => 2,
            127 => 8,
            _ => 0,
        };
        if head[1] & 0x80 != 0 {
            len += 4;
        }
        reader.read_exact(&mut head[2..len]).await?;

        let mut cursor = Cursor::new(&head[..len]);
        match FrameHeader::parse(&mut cursor)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        {
            Some((header, len)) => Ok(Self {
                opcode: header.opcode,
                mask: header.mask,
                len,
            }),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "incomplete frame header",
            )),
        }
    }
}

/// XOR cipher keyed by the 4-byte mask, byte index modulo 4.
pub fn apply_mask(payload: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

pub struct FrameReader<R> {
    inner: R,
}

impl<R> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R> StreamReader for FrameReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadChunk> {
        let frame = FrameDescriptor::decode(&mut self.inner).await?;
        let len = usize::try_from(frame.len)
            .ok()
            .filter(|len| *len <= buf.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "frame payload exceeds read buffer",
                )
            })?;

        self.inner.read_exact(&mut buf[..len]).await?;
        if let Some(mask) = frame.mask {
            apply_mask(&mut buf[..len], mask);
        }

        if frame.is_heartbeat() {
            return Ok(ReadChunk::data(0));
        }

        let mut n = len;
        if n < buf.len() {
            buf[n] = b'\n';
            n += 1;
        }

        Ok(ReadChunk {
            len: n,
            eof: frame.is_close(),
        })
    }
}

pub struct FrameWriter<W> {
    inner: W,
}

impl<W> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W> StreamWriter for FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        let payload = buf.trim_ascii();
        let mut frame = Vec::with_capacity(payload.len() + MAX_HEADER_LEN);
        FrameDescriptor::text(payload.len()).encode(&mut frame)?;
        frame.extend_from_slice(payload);

        self.inner.write_all(&frame).await?;
        self.inner.flush().await
    }
}

/// Answers the HTTP upgrade request that opens a WebSocket connection.
pub async fn accept_upgrade<R, W>(reader: &mut R, writer: &mut W) -> Result<(), HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = read_upgrade_request(reader).await?;
    let response = create_response(&request)?;

    let mut head = format!("{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    writer.write_all(head.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_upgrade_request<R>(reader: &mut R) -> Result<Request<()>, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = reader.take(MAX_REQUEST_BYTES);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(HandshakeError::Malformed("connection closed before request"));
    }
    if !line.ends_with('\n') {
        return Err(HandshakeError::Malformed("request too large"));
    }

    let mut parts = line.split_ascii_whitespace();
    let (Some(method), Some(uri), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HandshakeError::Malformed("bad request line"));
    };
    if version != "HTTP/1.1" {
        return Err(HandshakeError::Malformed("unsupported http version"));
    }

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .version(Version::HTTP_11);

    for _ in 0..MAX_REQUEST_HEADERS {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(HandshakeError::Malformed("truncated headers"));
        }
        if !line.ends_with('\n') {
            return Err(HandshakeError::Malformed("request too large"));
        }

        let header = line.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            return Ok(builder.body(())?);
        }

        let Some((name, value)) = header.split_once(':') else {
            return Err(HandshakeError::Malformed("bad header line"));
        };
        builder = builder.header(name.trim(), value.trim());
    }

    Err(HandshakeError::Malformed("too many headers"))
}
