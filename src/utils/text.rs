//! Byte-to-text helpers shared by the normalizer and the rewriters.

use std::borrow::Cow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode bytes as UTF-8, dropping a leading byte-order mark.
///
/// Invalid sequences are replaced, so this never fails. Use [`decode_utf8_strict`]
/// when a lossy decode would corrupt content that must be passed through.
#[must_use]
pub fn decode_utf8_lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))
}

/// Decode bytes as UTF-8, returning `None` on any invalid sequence.
///
/// A leading byte-order mark is dropped.
#[must_use]
pub fn decode_utf8_strict(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)).ok()
}

/// Return the media type of a `Content-Type` value: no parameters, trimmed, lowercase.
#[must_use]
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
