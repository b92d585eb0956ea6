//! Charset detection and text decoding for buffered content bytes.
//!
//! A declared charset (from content metadata) always wins and skips
//! sniffing. Otherwise the byte-order marks of UTF-8, UTF-32 and UTF-16 are
//! tested in that priority order; UTF-32 before UTF-16 because the UTF-32LE
//! mark begins with the UTF-16LE one. No match falls back to UTF-8.
//!
//! Charset labels resolve through the WHATWG registry ([`encoding_rs`]).
//! UTF-32 is absent from that registry, so this module carries its own
//! minimal UTF-32 decoding path.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::ContentError;
use crate::utils::ensure;

/// A text encoding resolved from a charset label or a byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// An encoding from the WHATWG registry.
    Standard(&'static Encoding),
    Utf32Le,
    Utf32Be,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Standard(encoding) => encoding.name(),
            TextEncoding::Utf32Le => "UTF-32LE",
            TextEncoding::Utf32Be => "UTF-32BE",
        }
    }
}

/// Byte-order marks in detection priority order.
static BOMS: [(TextEncoding, &[u8]); 5] = [
    (TextEncoding::Standard(UTF_8), &[0xEF, 0xBB, 0xBF]),
    (TextEncoding::Utf32Le, &[0xFF, 0xFE, 0x00, 0x00]),
    (TextEncoding::Utf32Be, &[0x00, 0x00, 0xFE, 0xFF]),
    (TextEncoding::Standard(UTF_16LE), &[0xFF, 0xFE]),
    (TextEncoding::Standard(UTF_16BE), &[0xFE, 0xFF]),
];

/// Detects the encoding of `bytes` and the length of its preamble.
///
/// A `declared` charset resolves directly with a zero-length preamble.
/// Without one, the first byte-order mark that fits and matches from offset
/// zero wins; no match means UTF-8 with no preamble. A mark that does not
/// fit or match is not an error.
pub fn detect(bytes: &[u8], declared: Option<&str>) -> Result<(TextEncoding, usize), ContentError> {
    if let Some(charset) = declared {
        return Ok((resolve(charset)?, 0));
    }

    for (encoding, bom) in &BOMS {
        if bytes.len() >= bom.len() && &bytes[..bom.len()] == *bom {
            return Ok((*encoding, bom.len()));
        }
    }

    Ok((TextEncoding::Standard(UTF_8), 0))
}

/// Decodes `bytes` under the declared or sniffed encoding.
///
/// An empty input short-circuits to an empty string without consulting any
/// encoding. Malformed text under the resolved encoding is an error, not a
/// lossy replacement.
pub fn decode(bytes: &[u8], declared: Option<&str>) -> Result<String, ContentError> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    let (encoding, preamble_len) = detect(bytes, declared)?;
    let text = &bytes[preamble_len..];

    match encoding {
        TextEncoding::Standard(encoding) => {
            let (decoded, had_errors) = encoding.decode_without_bom_handling(text);
            ensure!(!had_errors, ContentError::decode(encoding.name()));
            Ok(decoded.into_owned())
        }
        TextEncoding::Utf32Le | TextEncoding::Utf32Be => decode_utf32(text, encoding),
    }
}

fn resolve(charset: &str) -> Result<TextEncoding, ContentError> {
    if charset.eq_ignore_ascii_case("utf-32") || charset.eq_ignore_ascii_case("utf-32le") {
        return Ok(TextEncoding::Utf32Le);
    }
    if charset.eq_ignore_ascii_case("utf-32be") {
        return Ok(TextEncoding::Utf32Be);
    }

    match Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => Ok(TextEncoding::Standard(encoding)),
        None => Err(ContentError::unsupported_charset(charset)),
    }
}

fn decode_utf32(bytes: &[u8], encoding: TextEncoding) -> Result<String, ContentError> {
    ensure!(bytes.len() % 4 == 0, ContentError::decode(encoding.name()));

    let mut decoded = String::with_capacity(bytes.len() / 4);
    for unit in bytes.chunks_exact(4) {
        let value = match encoding {
            TextEncoding::Utf32Be => u32::from_be_bytes([unit[0], unit[1], unit[2], unit[3]]),
            _ => u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]]),
        };
        match char::from_u32(value) {
            Some(c) => decoded.push(c),
            None => return Err(ContentError::decode(encoding.name())),
        }
    }
    Ok(decoded)
}
