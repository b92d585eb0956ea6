//! The content engine: buffering state machine, cached reads, disposal.
//!
//! A [`Content`] owns a serialization contract ([`ContentPayload`]) and
//! memoizes its single write pass. The state machine is
//! `Unbuffered → Buffering → Buffered`: the first caller of [`Content::buffer`]
//! installs a shared future driving the pass, concurrent callers await that
//! same future, and a completed pass is terminal for the content's lifetime.
//! A failed pass reverts to `Unbuffered` and never exposes partial bytes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use http::HeaderMap;
use http::header;
use once_cell::sync::OnceCell;
use tracing::{debug, error, trace};

use crate::buffer::BoundedBuffer;
use crate::encoding;
use crate::error::ContentError;
use crate::payload::ContentPayload;
use crate::reader::{ContentReader, SharedReader};
use crate::sink::ContentSink;
use crate::utils::ensure;

/// Default byte cap applied by [`Content::buffer_default`].
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 0x7FFF_FFFF;

/// The in-flight serialization pass, awaited by every concurrent caller.
type BufferingFuture = Shared<BoxFuture<'static, Result<Bytes, ContentError>>>;

enum BufferState {
    Unbuffered,
    Buffering(BufferingFuture),
    Buffered(Bytes),
}

/// The in-flight `read_stream` call; `None` means the payload has no
/// dedicated stream and the engine buffers instead.
type StreamFuture = Shared<BoxFuture<'static, Result<Option<SharedReader>, ContentError>>>;

enum ReaderState {
    None,
    Creating(StreamFuture),
    Cached(SharedReader),
}

/// Whether the payload's length estimation has been consulted, and its answer.
enum LengthState {
    Unknown,
    Computable(u64),
    NotComputable,
}

/// An HTTP message body that buffers its payload's single write pass and
/// serves every later read from the result.
///
/// Reads come in three shapes, all satisfied from one serialization:
/// [`bytes`](Content::bytes) for the raw buffer, [`text`](Content::text) for
/// charset-aware decoding, and [`reader`](Content::reader) for stream access.
/// [`copy_to`](Content::copy_to) writes the content into an external sink,
/// straight through when nothing is buffered yet.
///
/// Once buffered, the bytes are immutable and may be read concurrently;
/// every reader gets its own cursor. Disposal is the owner's single-writer
/// responsibility and releases the buffer; it also runs on drop.
pub struct Content {
    payload: Arc<dyn ContentPayload>,
    headers: OnceCell<HeaderMap>,
    state: Mutex<BufferState>,
    reader: Mutex<ReaderState>,
    length: Mutex<LengthState>,
    disposed: AtomicBool,
}

impl Content {
    pub fn new<P: ContentPayload + 'static>(payload: P) -> Self {
        Self::from_arc(Arc::new(payload))
    }

    pub fn from_arc(payload: Arc<dyn ContentPayload>) -> Self {
        Self {
            payload,
            headers: OnceCell::new(),
            state: Mutex::new(BufferState::Unbuffered),
            reader: Mutex::new(ReaderState::None),
            length: Mutex::new(LengthState::Unknown),
            disposed: AtomicBool::new(false),
        }
    }

    /// The content's headers, created lazily on first access.
    pub fn headers(&self) -> &HeaderMap {
        self.headers.get_or_init(HeaderMap::new)
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        if self.headers.get().is_none() {
            self.headers = OnceCell::with_value(HeaderMap::new());
        }
        self.headers.get_mut().expect("headers cell initialized above")
    }

    /// Materializes the payload into an in-memory buffer of at most
    /// `max_size` bytes.
    ///
    /// Idempotent once buffered. Concurrent callers share a single
    /// serialization pass and all observe its outcome; a failed pass leaves
    /// the content unbuffered, so a later call may retry.
    ///
    /// # Errors
    ///
    /// [`ContentError::PayloadTooLarge`] when the payload writes past
    /// `max_size`, [`ContentError::Disposed`] after disposal, and any error
    /// the payload's serialization raises.
    pub async fn buffer(&self, max_size: usize) -> Result<(), ContentError> {
        self.ensure_not_disposed()?;

        let pending = {
            let mut state = self.lock_state();
            match &*state {
                BufferState::Buffered(_) => return Ok(()),
                BufferState::Buffering(pending) => pending.clone(),
                BufferState::Unbuffered => {
                    trace!(max_size, "start buffering content");
                    let payload = Arc::clone(&self.payload);
                    let pending = async move {
                        let mut buffer = BoundedBuffer::new(max_size);
                        payload.serialize(&mut buffer).await?;
                        Ok(buffer.freeze())
                    }
                    .boxed()
                    .shared();
                    *state = BufferState::Buffering(pending.clone());
                    pending
                }
            }
        };

        match pending.clone().await {
            Ok(bytes) => {
                let mut state = self.lock_state();
                if let BufferState::Buffering(current) = &*state
                    && current.ptr_eq(&pending)
                {
                    trace!(len = bytes.len(), "content buffered");
                    *state = BufferState::Buffered(bytes);
                }
                Ok(())
            }
            Err(e) => {
                let mut state = self.lock_state();
                if let BufferState::Buffering(current) = &*state
                    && current.ptr_eq(&pending)
                {
                    error!("failed to buffer content, {}", e);
                    *state = BufferState::Unbuffered;
                }
                Err(e)
            }
        }
    }

    /// [`buffer`](Content::buffer) with [`DEFAULT_MAX_BUFFER_SIZE`].
    pub async fn buffer_default(&self) -> Result<(), ContentError> {
        self.buffer(DEFAULT_MAX_BUFFER_SIZE).await
    }

    /// The content's bytes, buffering without a cap if necessary.
    ///
    /// The returned [`Bytes`] is an immutable view over the frozen buffer,
    /// cheap to clone and safe to read concurrently.
    pub async fn bytes(&self) -> Result<Bytes, ContentError> {
        self.buffer(usize::MAX).await?;
        self.buffered_bytes()
    }

    /// The content decoded as text.
    ///
    /// A charset declared in the `Content-Type` header wins; otherwise the
    /// byte-order mark decides, defaulting to UTF-8. An empty content
    /// decodes to an empty string without consulting any encoding.
    pub async fn text(&self) -> Result<String, ContentError> {
        let bytes = self.bytes().await?;
        let charset = self.declared_charset();
        encoding::decode(&bytes, charset.as_deref())
    }

    /// A stream over the content's bytes.
    ///
    /// Buffered content yields a fresh independent view on every call.
    /// Unbuffered content asks the payload for a dedicated stream; when one
    /// is produced it is cached, and every later call returns that same
    /// cursor-bearing handle, including any consumption progress a prior
    /// caller made. Payloads without a dedicated stream are buffered fully.
    ///
    /// Like [`buffer`](Content::buffer), concurrent callers share a single
    /// `read_stream` invocation rather than racing the payload.
    pub async fn reader(&self) -> Result<ContentReader, ContentError> {
        self.ensure_not_disposed()?;

        if let BufferState::Buffered(bytes) = &*self.lock_state() {
            return Ok(ContentReader::view(bytes.clone()));
        }

        let pending = {
            let mut cached = self.lock_reader();
            match &*cached {
                ReaderState::Cached(shared) => return Ok(ContentReader::shared(shared.clone())),
                ReaderState::Creating(pending) => pending.clone(),
                ReaderState::None => {
                    let payload = Arc::clone(&self.payload);
                    let pending = async move {
                        match payload.read_stream().await {
                            Some(Ok(reader)) => Ok(Some(SharedReader::new(reader))),
                            Some(Err(e)) => Err(e),
                            None => Ok(None),
                        }
                    }
                    .boxed()
                    .shared();
                    *cached = ReaderState::Creating(pending.clone());
                    pending
                }
            }
        };

        match pending.clone().await {
            Ok(Some(shared)) => {
                debug!("caching dedicated payload stream");
                let mut cached = self.lock_reader();
                if let ReaderState::Creating(current) = &*cached
                    && current.ptr_eq(&pending)
                {
                    *cached = ReaderState::Cached(shared.clone());
                }
                Ok(ContentReader::shared(shared))
            }
            Ok(None) => {
                self.reset_reader_if_current(&pending);
                self.buffer(usize::MAX).await?;
                Ok(ContentReader::view(self.buffered_bytes()?))
            }
            Err(e) => {
                self.reset_reader_if_current(&pending);
                Err(e)
            }
        }
    }

    fn reset_reader_if_current(&self, pending: &StreamFuture) {
        let mut cached = self.lock_reader();
        if let ReaderState::Creating(current) = &*cached
            && current.ptr_eq(pending)
        {
            *cached = ReaderState::None;
        }
    }

    /// Copies the content into `sink`.
    ///
    /// Buffered content writes its cached bytes; otherwise the payload
    /// serializes directly into `sink`, uncapped and without changing the
    /// buffering state.
    pub async fn copy_to(&self, sink: &mut dyn ContentSink) -> Result<(), ContentError> {
        self.ensure_not_disposed()?;

        let buffered = match &*self.lock_state() {
            BufferState::Buffered(bytes) => Some(bytes.clone()),
            _ => None,
        };

        match buffered {
            Some(bytes) => sink.write(&bytes).await,
            None => self.payload.serialize(sink).await,
        }
    }

    /// The content's byte length, when it can be known without serializing.
    ///
    /// Buffered content answers from the buffer. Otherwise the payload's
    /// length estimation is consulted at most once per content lifetime;
    /// a "not computable" answer is remembered and never asked again.
    /// Disposed content always answers `None`.
    pub fn length(&self) -> Option<u64> {
        if self.is_disposed() {
            return None;
        }

        if let BufferState::Buffered(bytes) = &*self.lock_state() {
            return Some(bytes.len() as u64);
        }

        let mut length = self.lock_length();
        match &*length {
            LengthState::Computable(n) => Some(*n),
            LengthState::NotComputable => None,
            LengthState::Unknown => match self.payload.compute_length() {
                Some(n) => {
                    *length = LengthState::Computable(n);
                    Some(n)
                }
                None => {
                    *length = LengthState::NotComputable;
                    None
                }
            },
        }
    }

    /// Releases the buffer and the cached stream. Idempotent.
    ///
    /// Later read operations fail with [`ContentError::Disposed`];
    /// [`length`](Content::length) answers `None` instead of failing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("content disposed");
        *self.lock_state() = BufferState::Unbuffered;
        *self.lock_reader() = ReaderState::None;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_not_disposed(&self) -> Result<(), ContentError> {
        ensure!(!self.is_disposed(), ContentError::Disposed);
        Ok(())
    }

    fn buffered_bytes(&self) -> Result<Bytes, ContentError> {
        match &*self.lock_state() {
            BufferState::Buffered(bytes) => Ok(bytes.clone()),
            // only reachable when disposal raced the buffering pass
            _ => Err(ContentError::Disposed),
        }
    }

    fn declared_charset(&self) -> Option<String> {
        let value = self.headers.get()?.get(header::CONTENT_TYPE)?;
        let mime = value.to_str().ok()?.parse::<mime::Mime>().ok()?;
        mime.get_param(mime::CHARSET).map(|charset| charset.as_str().to_owned())
    }

    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_reader(&self) -> MutexGuard<'_, ReaderState> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_length(&self) -> MutexGuard<'_, LengthState> {
        self.length.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Content {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.lock_state() {
            BufferState::Unbuffered => "unbuffered",
            BufferState::Buffering(_) => "buffering",
            BufferState::Buffered(_) => "buffered",
        };
        f.debug_struct("Content").field("state", &state).field("disposed", &self.is_disposed()).finish_non_exhaustive()
    }
}
