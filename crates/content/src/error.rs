use std::error::Error;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error type used at the boundary to concrete content payloads.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors produced by content buffering, reading and decoding.
///
/// The enum is `Clone`: a single serialization pass may be awaited by several
/// concurrent callers through a shared future, and each of them receives the
/// pass's outcome. Non-clonable sources are therefore held behind [`Arc`],
/// keeping the source chain intact for every receiver.
#[derive(Error, Debug, Clone)]
pub enum ContentError {
    #[error("content size exceeds buffer limit {max_size}")]
    PayloadTooLarge { max_size: usize },

    #[error("content has been disposed")]
    Disposed,

    #[error("unsupported charset: {charset}")]
    UnsupportedCharset { charset: String },

    #[error("invalid text for charset {charset}")]
    Decode { charset: String },

    #[error("serialize error: {source}")]
    Serialize { source: Arc<dyn Error + Send + Sync> },

    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },
}

impl ContentError {
    pub fn payload_too_large(max_size: usize) -> Self {
        Self::PayloadTooLarge { max_size }
    }

    pub fn unsupported_charset<S: ToString>(charset: S) -> Self {
        Self::UnsupportedCharset { charset: charset.to_string() }
    }

    pub fn decode<S: ToString>(charset: S) -> Self {
        Self::Decode { charset: charset.to_string() }
    }

    pub fn serialize<E: Into<BoxError>>(e: E) -> Self {
        Self::Serialize { source: Arc::from(e.into()) }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: Arc::new(e.into()) }
    }
}

impl From<io::Error> for ContentError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}
