//! A byte-level JSON cursor used to stream the hospital JSON reader and, in
//! time, the TOC and in-network rate readers: read one container token (an
//! object key or an array element) at a time without ever materializing a
//! generic `serde_json::Value` tree of the whole document.
//!
//! This is not a general-purpose JSON parser. It assumes well-formed input
//! and only needs to locate value boundaries (strings, numbers, booleans,
//! null, and balanced `{}`/`[]` spans); the actual typed decoding of each
//! bounded span is still done by `serde_json::from_slice`.

use std::io::{BufRead, BufReader, Read};

use crate::error::ReaderError;

use super::READ_BUFFER_CAPACITY;

pub struct JsonCursor<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> JsonCursor<R> {
    pub fn new(reader: R) -> Self {
        JsonCursor {
            reader: BufReader::with_capacity(READ_BUFFER_CAPACITY, reader),
        }
    }

    fn eof_err() -> ReaderError {
        ReaderError::Structure {
            stage: "json",
            ordinal: 0,
            message: "unexpected end of input".to_string(),
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, ReaderError> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    fn bump(&mut self) -> Result<Option<u8>, ReaderError> {
        let b = self.peek()?;
        if b.is_some() {
            self.reader.consume(1);
        }
        Ok(b)
    }

    pub fn skip_ws(&mut self) -> Result<(), ReaderError> {
        while let Some(b) = self.peek()? {
            if b.is_ascii_whitespace() {
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    pub fn expect(&mut self, want: u8) -> Result<(), ReaderError> {
        self.skip_ws()?;
        match self.bump()? {
            Some(b) if b == want => Ok(()),
            other => Err(ReaderError::Structure {
                stage: "json",
                ordinal: 0,
                message: format!(
                    "expected '{}', found {:?}",
                    want as char,
                    other.map(|b| b as char)
                ),
            }),
        }
    }

    fn read_raw_string(&mut self, out: &mut Vec<u8>) -> Result<(), ReaderError> {
        let open = self.bump()?.ok_or_else(Self::eof_err)?;
        out.push(open);
        loop {
            let b = self.bump()?.ok_or_else(Self::eof_err)?;
            out.push(b);
            if b == b'\\' {
                let escaped = self.bump()?.ok_or_else(Self::eof_err)?;
                out.push(escaped);
                continue;
            }
            if b == b'"' {
                break;
            }
        }
        Ok(())
    }

    fn read_raw_bracketed(&mut self, out: &mut Vec<u8>) -> Result<(), ReaderError> {
        let mut depth: i32 = 0;
        loop {
            let b = self.peek()?.ok_or_else(Self::eof_err)?;
            if b == b'"' {
                self.read_raw_string(out)?;
                continue;
            }
            self.bump()?;
            out.push(b);
            match b {
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_raw_scalar(&mut self, out: &mut Vec<u8>) -> Result<(), ReaderError> {
        loop {
            match self.peek()? {
                Some(b) if b == b',' || b == b'}' || b == b']' || b.is_ascii_whitespace() => break,
                Some(b) => {
                    self.bump()?;
                    out.push(b);
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Reads one complete JSON value (string, number, bool, null, object, or
    /// array) as raw bytes, without decoding it.
    pub fn read_value_raw(&mut self) -> Result<Vec<u8>, ReaderError> {
        self.skip_ws()?;
        let mut raw = Vec::new();
        match self.peek()? {
            Some(b'"') => self.read_raw_string(&mut raw)?,
            Some(b'{') | Some(b'[') => self.read_raw_bracketed(&mut raw)?,
            Some(_) => self.read_raw_scalar(&mut raw)?,
            None => return Err(Self::eof_err()),
        }
        Ok(raw)
    }

    /// Reads an object-key string followed by its `:`, returning the key
    /// with its surrounding quotes stripped.
    pub fn read_key(&mut self) -> Result<String, ReaderError> {
        self.skip_ws()?;
        let mut raw = Vec::new();
        self.read_raw_string(&mut raw)?;
        self.expect(b':')?;
        Ok(serde_json::from_slice::<String>(&raw)?)
    }

    /// Call before iterating the entries of an object or array already
    /// positioned just past its opening brace/bracket. Returns `true` when
    /// another entry follows (consuming the `,` separator if one was
    /// needed), `false` once `close` is reached (which this also consumes).
    pub fn container_has_next(&mut self, close: u8, first: &mut bool) -> Result<bool, ReaderError> {
        self.skip_ws()?;
        if self.peek()?.map(|b| b == close).unwrap_or(true) {
            self.bump()?;
            return Ok(false);
        }
        if !*first {
            self.expect(b',')?;
        }
        *first = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_nested_object_value_as_one_raw_span() {
        let input = br#"{"a": {"b": [1, 2, "x,y"]}, "c": 3}"#;
        let mut cursor = JsonCursor::new(Cursor::new(input.to_vec()));
        cursor.expect(b'{').unwrap();
        let key = cursor.read_key().unwrap();
        assert_eq!(key, "a");
        let raw = cursor.read_value_raw().unwrap();
        assert_eq!(raw, br#"{"b": [1, 2, "x,y"]}"#);
    }

    #[test]
    fn container_has_next_walks_array_elements() {
        let input = br#"[1, 2, 3]"#;
        let mut cursor = JsonCursor::new(Cursor::new(input.to_vec()));
        cursor.expect(b'[').unwrap();
        let mut first = true;
        let mut seen = Vec::new();
        while cursor.container_has_next(b']', &mut first).unwrap() {
            seen.push(cursor.read_value_raw().unwrap());
        }
        assert_eq!(seen, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
    }
}
