//! The common reader contract: `next() -> batch | end`,
//! `format() -> {tall, wide, json-v2, json-v3}`.
//!
//! Readers are single-threaded, consume an input stream once, own buffered
//! I/O of at least 256 KiB, and strip a leading UTF-8 BOM. Every string field
//! they produce has already been sanitized per [`crate::util::sanitize_utf8_lossy`].

pub mod csv;
pub mod json;
pub(crate) mod raw_json;

use crate::error::ReaderError;
use crate::row::ChargeRow;

/// Buffered-I/O capacity every reader opens its underlying file/stream with.
pub const READ_BUFFER_CAPACITY: usize = 256 * 1024;

/// The detected shape of the input, reported by `format()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderFormat {
    Tall,
    Wide,
    JsonV2,
    JsonV3,
    /// A JSON file whose `version` field didn't start with `2` or `3`.
    Json,
}

impl ReaderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderFormat::Tall => "tall",
            ReaderFormat::Wide => "wide",
            ReaderFormat::JsonV2 => "json-v2",
            ReaderFormat::JsonV3 => "json-v3",
            ReaderFormat::Json => "json",
        }
    }
}

/// One call to `next()`: either a non-empty batch of rows, or end-of-input.
#[derive(Debug)]
pub enum NextBatch {
    Rows(Vec<ChargeRow>),
    End,
}

/// Common contract every streaming reader implements.
pub trait ChargeReader {
    /// Returns the next non-empty batch of rows, or `End` once the input is
    /// exhausted. Returns `Err` and aborts on any structural error; value-coercion errors are recovered locally and
    /// never surface here.
    fn next_batch(&mut self) -> Result<NextBatch, ReaderError>;

    /// The detected input shape.
    fn format(&self) -> ReaderFormat;

    /// Drains every remaining batch. A convenience built on `next_batch`,
    /// useful for small fixtures and tests; production pipelines should
    /// prefer streaming batch-by-batch into the columnar writer.
    fn read_all(&mut self) -> Result<Vec<ChargeRow>, ReaderError> {
        let mut all = Vec::new();
        loop {
            match self.next_batch()? {
                NextBatch::Rows(mut rows) => all.append(&mut rows),
                NextBatch::End => break,
            }
        }
        Ok(all)
    }
}

/// Strips a leading UTF-8 BOM (`EF BB BF`) from a byte buffer, returning the
/// remaining slice. Every reader applies this before any further parsing.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
    if bytes.starts_with(&BOM) {
        &bytes[3..]
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_bom_removes_leading_bom_only() {
        let with_bom = [0xEF, 0xBB, 0xBF, b'a', b'b'];
        assert_eq!(strip_bom(&with_bom), b"ab");

        let without_bom = [b'a', b'b'];
        assert_eq!(strip_bom(&without_bom), b"ab");
    }
}
