//! The byte-sink abstraction that content payloads serialize into.
//!
//! A [`ContentSink`] is any destination accepting written bytes. The engine
//! hands a sink to [`ContentPayload::serialize`](crate::ContentPayload::serialize)
//! exactly once per buffering pass; payloads never learn whether they are
//! writing into an in-memory buffer or straight into an outbound stream.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ContentError;

/// An abstract destination accepting written bytes.
#[async_trait]
pub trait ContentSink: Send {
    /// Appends `bytes` to the sink.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ContentError>;

    /// Appends a single byte to the sink.
    async fn write_byte(&mut self, byte: u8) -> Result<(), ContentError> {
        self.write(&[byte]).await
    }
}

#[async_trait]
impl ContentSink for Vec<u8> {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ContentError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Adapts any [`AsyncWrite`] into a [`ContentSink`].
///
/// Used when copying content into network or file streams, which speak
/// tokio's write traits rather than this crate's sink trait.
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
}

impl<W> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> ContentSink for IoSink<W> {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ContentError> {
        self.inner.write_all(bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentSink, IoSink};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn vec_sink_collects_writes() {
        let mut sink = Vec::new();
        sink.write(b"hello ").await.unwrap();
        sink.write_byte(b'w').await.unwrap();
        sink.write(b"orld").await.unwrap();

        assert_eq!(&sink[..], b"hello world");
    }

    #[tokio::test]
    async fn io_sink_writes_through() {
        let (client, mut server) = tokio::io::duplex(64);

        let mut sink = IoSink::new(client);
        sink.write(b"hello").await.unwrap();
        drop(sink);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..], b"hello");
    }
}
