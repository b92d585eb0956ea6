//! Buffered and streaming HTTP content bodies.
//!
//! This crate provides the buffering core behind HTTP message bodies: a
//! content body is defined abstractly by a single "serialize yourself into a
//! sink" operation, yet callers may want the raw bytes, decoded text, or a
//! byte stream. [`Content`] satisfies all of those from one serialization
//! pass, caches the result, and enforces a memory cap on it.
//!
//! # Features
//!
//! - One serialization pass per content, shared by concurrent callers
//! - Bounded in-memory buffering with whole-write cap enforcement
//! - Byte, text and stream reads served from the same frozen buffer
//! - Charset resolution from declared metadata or byte-order marks
//! - Straight-through copying into external sinks, uncapped
//! - Deterministic disposal releasing the buffer
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use micro_content::{Content, ContentError, ContentPayload, ContentSink};
//!
//! struct Utf8Text(&'static str);
//!
//! #[async_trait]
//! impl ContentPayload for Utf8Text {
//!     async fn serialize(&self, sink: &mut dyn ContentSink) -> Result<(), ContentError> {
//!         sink.write(self.0.as_bytes()).await
//!     }
//!
//!     fn compute_length(&self) -> Option<u64> {
//!         Some(self.0.len() as u64)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ContentError> {
//!     let content = Content::new(Utf8Text("hello"));
//!
//!     assert_eq!(content.length(), Some(5));
//!     assert_eq!(content.bytes().await?, Bytes::from_static(b"hello"));
//!     assert_eq!(content.text().await?, "hello");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`content`]: the buffering state machine and read operations
//! - [`payload`]: the serialization contract concrete content types implement
//! - [`buffer`]: the bounded in-memory byte sink
//! - [`sink`]: the byte-sink abstraction payloads write into
//! - [`reader`]: independent and shared read handles
//! - [`encoding`]: charset detection and text decoding
//!
//! # Concurrency
//!
//! All operations take `&self` and may be called from multiple tasks.
//! [`Content::buffer`] guarantees at most one in-flight serialization pass
//! per content: concurrent callers await a shared future and all observe the
//! pass's outcome. Once buffered, the bytes are immutable and read through
//! per-caller cursors. Disposal is the owner's single-writer responsibility.
//!
//! # Error Handling
//!
//! All operations surface [`error::ContentError`], which distinguishes cap
//! violations, use after disposal, charset problems and payload failures.
//! Nothing is retried internally: neither the cap nor the disposal state
//! changes by retrying, so that decision belongs to the caller.

pub mod buffer;
pub mod content;
pub mod encoding;
pub mod error;
pub mod payload;
pub mod reader;
pub mod sink;

mod utils;

pub use buffer::BoundedBuffer;
pub use content::{Content, DEFAULT_MAX_BUFFER_SIZE};
pub use error::{BoxError, ContentError};
pub use payload::ContentPayload;
pub use reader::{ContentReader, PayloadReader};
pub use sink::{ContentSink, IoSink};
