// Identity codec used by the raw line (telnet) transport.

use crate::domain::{ReadChunk, StreamReader, StreamWriter};
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub struct PassthroughReader<R> {
    inner: R,
}

impl<R> PassthroughReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R> StreamReader for PassthroughReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadChunk> {
        let n = self.inner.read(buf).await?;
        Ok(if n == 0 {
            ReadChunk::end(0)
        } else {
            ReadChunk::data(n)
        })
    }
}

pub struct PassthroughWriter<W> {
    inner: W,
}

impl<W> PassthroughWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W> StreamWriter for PassthroughWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf).await?;
        self.inner.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_pass_through_untouched() {
        let (client, server) = tokio::io::duplex(64);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        let mut reader = PassthroughReader::new(server_read);
        let mut writer = PassthroughWriter::new(server_write);

        client_write.write_all(b"  help \r\n").await.expect("client write");
        let mut buf = [0u8; 32];
        let chunk = reader.read(&mut buf).await.expect("server read");
        assert_eq!(&buf[..chunk.len], b"  help \r\n");
        assert!(!chunk.eof);

        writer.write(b" hello \n").await.expect("server write");
        let mut out = [0u8; 8];
        client_read.read_exact(&mut out).await.expect("client read");
        assert_eq!(&out, b" hello \n");
    }

    #[tokio::test]
    async fn closed_peer_reads_as_end_of_stream() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);

        let mut reader = PassthroughReader::new(server);
        let mut buf = [0u8; 8];
        let chunk = reader.read(&mut buf).await.expect("read after close");
        assert_eq!(chunk, ReadChunk::end(0));
    }
}
