//! The serialization contract implemented by concrete content types.

use async_trait::async_trait;

use crate::error::ContentError;
use crate::reader::PayloadReader;
use crate::sink::ContentSink;

/// The capability a concrete content type provides to the engine.
///
/// A payload is defined by the single required operation: write your bytes
/// into a sink. The engine drives that operation at most once per buffering
/// pass and never inspects payload semantics. String, byte, stream and
/// multipart content types all live outside this crate and plug in here.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use micro_content::{ContentError, ContentPayload, ContentSink};
///
/// struct Utf8Text(&'static str);
///
/// #[async_trait]
/// impl ContentPayload for Utf8Text {
///     async fn serialize(&self, sink: &mut dyn ContentSink) -> Result<(), ContentError> {
///         sink.write(self.0.as_bytes()).await
///     }
///
///     fn compute_length(&self) -> Option<u64> {
///         Some(self.0.len() as u64)
///     }
/// }
/// ```
#[async_trait]
pub trait ContentPayload: Send + Sync {
    /// Writes the payload's bytes into `sink`.
    ///
    /// Called at most once per buffering pass; may also be called by
    /// [`Content::copy_to`](crate::Content::copy_to) when the content is not
    /// buffered. Errors pass through to the caller unchanged.
    async fn serialize(&self, sink: &mut dyn ContentSink) -> Result<(), ContentError>;

    /// Estimates the total byte length without serializing.
    ///
    /// `None` means the length is not computable. The engine consults this
    /// at most once per content lifetime and memoizes the answer.
    fn compute_length(&self) -> Option<u64> {
        None
    }

    /// Produces a dedicated read stream for this payload.
    ///
    /// The default returns `None`, which makes the engine buffer the payload
    /// fully and serve an in-memory view instead. Override this when the
    /// payload already owns a stream that should be read through directly.
    async fn read_stream(&self) -> Option<Result<PayloadReader, ContentError>> {
        None
    }
}
