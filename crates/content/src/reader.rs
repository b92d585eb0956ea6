//! Read-side handles over content bytes.
//!
//! Two kinds of readers exist, matching the two read sources a content can
//! have. A *view* is an independent cursor over the frozen buffer; every
//! call to [`Content::reader`](crate::Content::reader) on buffered content
//! yields a fresh one, so concurrent readers never disturb each other. A
//! *shared* reader wraps a live payload stream: the handle is cached by the
//! owning content and every caller receives the same underlying cursor, so a
//! partially consumed stream is handed out as-is on the next call. That
//! aliasing is the documented sharing contract of live streams, not a copy.

use std::fmt;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

/// A dedicated read stream produced by a content payload.
pub type PayloadReader = Box<dyn AsyncRead + Send + Unpin>;

/// A cached live stream, cloned out to every caller of `reader()`.
///
/// All clones poll the same underlying reader and therefore share its cursor.
pub(crate) struct SharedReader {
    inner: Arc<Mutex<PayloadReader>>,
}

impl SharedReader {
    pub(crate) fn new(reader: PayloadReader) -> Self {
        Self { inner: Arc::new(Mutex::new(reader)) }
    }
}

impl Clone for SharedReader {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl fmt::Debug for SharedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReader").finish_non_exhaustive()
    }
}

/// An [`AsyncRead`] over a content's bytes.
///
/// Obtained from [`Content::reader`](crate::Content::reader).
pub struct ContentReader {
    kind: ReaderKind,
}

enum ReaderKind {
    /// Independent cursor over the frozen buffer.
    View(Cursor<Bytes>),
    /// Shared cursor over a cached live stream.
    Shared(SharedReader),
}

impl ContentReader {
    pub(crate) fn view(bytes: Bytes) -> Self {
        Self { kind: ReaderKind::View(Cursor::new(bytes)) }
    }

    pub(crate) fn shared(reader: SharedReader) -> Self {
        Self { kind: ReaderKind::Shared(reader) }
    }
}

impl fmt::Debug for ContentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ReaderKind::View(_) => "view",
            ReaderKind::Shared(_) => "shared",
        };
        f.debug_struct("ContentReader").field("kind", &kind).finish()
    }
}

impl AsyncRead for ContentReader {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().kind {
            ReaderKind::View(cursor) => Pin::new(cursor).poll_read(cx, buf),
            ReaderKind::Shared(shared) => {
                let mut reader = shared.inner.lock().unwrap_or_else(PoisonError::into_inner);
                Pin::new(&mut **reader).poll_read(cx, buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn views_read_independently() {
        let bytes = Bytes::from_static(b"hello world");
        let mut first = ContentReader::view(bytes.clone());
        let mut second = ContentReader::view(bytes);

        let mut head = [0u8; 5];
        first.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"hello");

        let mut all = Vec::new();
        second.read_to_end(&mut all).await.unwrap();
        assert_eq!(&all[..], b"hello world");
    }

    #[tokio::test]
    async fn shared_readers_share_the_cursor() {
        let shared = SharedReader::new(Box::new(Cursor::new(b"hello world".to_vec())));
        let mut first = ContentReader::shared(shared.clone());
        let mut second = ContentReader::shared(shared);

        let mut head = [0u8; 6];
        first.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"hello ");

        let mut rest = Vec::new();
        second.read_to_end(&mut rest).await.unwrap();
        assert_eq!(&rest[..], b"world");
    }
}
