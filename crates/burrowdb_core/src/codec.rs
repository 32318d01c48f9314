//! Wire codec helpers.
//!
//! Everything in the store file is big-endian. Strings are encoded as an
//! `i32` byte length followed by raw UTF-8; a zero length denotes the
//! empty string. The encoding cannot distinguish "absent" from "empty" -
//! that lossiness is part of the on-disk contract and is preserved.

use thiserror::Error;

/// Errors that can occur while decoding store bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The input ended in the middle of a value.
    #[error("unexpected end of input: needed {needed} more bytes")]
    UnexpectedEof {
        /// Bytes missing to complete the value.
        needed: usize,
    },

    /// A length field was negative.
    #[error("negative length field: {value}")]
    NegativeLength {
        /// The decoded length.
        value: i32,
    },

    /// String bytes were not valid UTF-8.
    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Appends a big-endian `i32` to `out`.
pub fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends a length-prefixed string to `out`.
pub fn put_string(out: &mut Vec<u8>, value: &str) {
    put_i32(out, value.len() as i32);
    out.extend_from_slice(value.as_bytes());
}

/// Encoded size of a string: 4 length bytes plus the UTF-8 payload.
#[must_use]
pub fn string_len(value: &str) -> usize {
    4 + value.len()
}

/// A sequential reader over encoded store bytes.
#[derive(Debug)]
pub struct ByteReader<'a> {
    input: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over `input`.
    #[must_use]
    pub fn new(input: &'a [u8]) -> ByteReader<'a> {
        ByteReader { input }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> CodecResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a length-prefixed string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(CodecError::NegativeLength { value: len });
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.input.len() < len {
            return Err(CodecError::UnexpectedEof {
                needed: len - self.input.len(),
            });
        }
        let (head, tail) = self.input.split_at(len);
        self.input = tail;
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_roundtrip() {
        let mut out = Vec::new();
        for v in [0, 1, -1, i32::MAX, i32::MIN, 0x0102_0304] {
            put_i32(&mut out, v);
        }
        let mut reader = ByteReader::new(&out);
        for v in [0, 1, -1, i32::MAX, i32::MIN, 0x0102_0304] {
            assert_eq!(reader.read_i32().unwrap(), v);
        }
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn i32_is_big_endian() {
        let mut out = Vec::new();
        put_i32(&mut out, 0x0102_0304);
        assert_eq!(out, [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn string_roundtrip() {
        let mut out = Vec::new();
        put_string(&mut out, "tavern square");
        put_string(&mut out, "");
        assert_eq!(out.len(), string_len("tavern square") + string_len(""));
        let mut reader = ByteReader::new(&out);
        assert_eq!(reader.read_string().unwrap(), "tavern square");
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn truncated_input_errors() {
        let mut out = Vec::new();
        put_string(&mut out, "abcdef");
        let mut reader = ByteReader::new(&out[..7]);
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn negative_string_length_errors() {
        let mut out = Vec::new();
        put_i32(&mut out, -5);
        let mut reader = ByteReader::new(&out);
        assert_eq!(
            reader.read_string(),
            Err(CodecError::NegativeLength { value: -5 })
        );
    }
}
