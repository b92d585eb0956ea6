//! The bounded in-memory buffer used during a buffering pass.
//!
//! A [`BoundedBuffer`] is the sink handed to a content payload when the
//! engine materializes it. The buffer enforces a fixed byte cap so any
//! payload gets memory bounding for free, independent of what it writes.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::error::ContentError;
use crate::sink::ContentSink;
use crate::utils::ensure;

/// A growable byte store with a fixed maximum capacity.
///
/// Writes that would push the total length past `max_size` fail with
/// [`ContentError::PayloadTooLarge`] and retain none of the offending bytes.
/// After the single write pass the buffer is frozen into an immutable
/// [`Bytes`], which every subsequent read view starts from offset zero.
#[derive(Debug)]
pub struct BoundedBuffer {
    data: BytesMut,
    max_size: usize,
}

impl BoundedBuffer {
    /// Creates an empty buffer accepting at most `max_size` bytes.
    pub fn new(max_size: usize) -> Self {
        Self { data: BytesMut::new(), max_size }
    }

    /// The configured byte cap.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current number of buffered bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends `bytes`, rejecting the whole write if it would exceed the cap.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ContentError> {
        // len() <= max_size holds, so the subtraction cannot underflow
        ensure!(bytes.len() <= self.max_size - self.data.len(), ContentError::PayloadTooLarge { max_size: self.max_size });
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Consumes the buffer, yielding its bytes as an immutable [`Bytes`].
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}

#[async_trait]
impl ContentSink for BoundedBuffer {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ContentError> {
        Self::write(self, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_within_cap() {
        let mut buffer = BoundedBuffer::new(16);
        buffer.write(b"0123456789").unwrap();
        buffer.write(b"abcdef").unwrap();

        assert_eq!(buffer.len(), 16);
        assert_eq!(&buffer.freeze()[..], b"0123456789abcdef");
    }

    #[test]
    fn write_past_cap_rejected_whole() {
        let mut buffer = BoundedBuffer::new(8);
        buffer.write(b"01234").unwrap();

        let err = buffer.write(b"56789").unwrap_err();
        assert!(matches!(err, ContentError::PayloadTooLarge { max_size: 8 }));

        // nothing of the failing write is retained
        assert_eq!(buffer.len(), 5);
        assert_eq!(&buffer.freeze()[..], b"01234");
    }

    #[test]
    fn exact_fit_is_accepted() {
        let mut buffer = BoundedBuffer::new(4);
        buffer.write(b"1234").unwrap();
        assert!(buffer.write(b"5").is_err());
    }

    #[test]
    fn zero_cap_rejects_first_byte() {
        let mut buffer = BoundedBuffer::new(0);
        assert!(buffer.write(b"").is_ok());
        assert!(buffer.write(b"x").is_err());
        assert!(buffer.is_empty());
    }
}
