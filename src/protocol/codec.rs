//! Protocol codec
//!
//! Encoding and decoding of values for the wire protocol and the AOF.
//!
//! ## Wire Format
//!
//! Every frame starts with a one-byte tag. Length prefixes and simple
//! payloads are CRLF-terminated lines.
//!
//! ```text
//! +OK\r\n                        simple string
//! -ERR message\r\n               simple error
//! :42\r\n                        integer          (replies only)
//! $3\r\nbar\r\n                  bulk string
//! $-1\r\n                        null             (replies only)
//! *2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n   array
//! ```
//!
//! Requests and AOF records only ever contain arrays of bulk strings, so the
//! request decoder accepts exactly those two tags and fails on anything else.

use std::io::{self, BufRead, Read, Write};

use bytes::{BufMut, Bytes};
use thiserror::Error;

use crate::error::Result;
use super::Value;

pub const SIMPLE_STRING_TAG: u8 = b'+';
pub const SIMPLE_ERROR_TAG: u8 = b'-';
pub const INTEGER_TAG: u8 = b':';
pub const BULK_STRING_TAG: u8 = b'$';
pub const ARRAY_TAG: u8 = b'*';

pub const CRLF: &[u8] = b"\r\n";

/// Wire form of [`Value::Null`]
pub const NULL_BULK: &[u8] = b"$-1\r\n";

/// Longest accepted length/count line (an i64 plus sign fits comfortably)
const MAX_LENGTH_LINE: usize = 32;

/// Longest accepted simple string / error line
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Payload bytes reserved up front; larger payloads grow as they arrive
const READ_CHUNK: usize = 64 * 1024;

// =============================================================================
// Errors and Limits
// =============================================================================

/// Reasons a frame could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("unsupported frame type: {:?}", tag_char(.0))]
    UnsupportedFrame(u8),

    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    #[error("invalid length: {0}")]
    InvalidLength(i64),

    #[error("line not terminated by CRLF")]
    MalformedLine,

    #[error("bulk string not terminated by CRLF")]
    MissingTerminator,

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("frame has more than {0} elements")]
    TooManyElements(usize),

    #[error("bulk string of {len} bytes exceeds limit of {max}")]
    BulkTooLarge { len: usize, max: usize },

    #[error("IO error: {0}")]
    Io(io::Error),
}

fn tag_char(tag: &u8) -> char {
    char::from(*tag)
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEof
        } else {
            DecodeError::Io(err)
        }
    }
}

/// Ceilings applied to a single top-level frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum number of nested array levels (a flat request is 1)
    pub max_depth: usize,

    /// Maximum number of elements across all arrays of one frame
    pub max_elements: usize,

    /// Maximum declared bulk string length
    pub max_bulk_len: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_elements: 1024 * 1024,
            max_bulk_len: 512 * 1024 * 1024, // 512 MB
        }
    }
}

/// Which frame kinds a decoder accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameSet {
    /// Arrays and bulk strings (client requests, AOF records)
    Requests,

    /// Every kind a server may reply with
    Replies,
}

// =============================================================================
// Decoding
// =============================================================================

/// Reads one frame at a time from a buffered byte stream
pub struct Decoder<R> {
    reader: R,
    limits: DecodeLimits,
    frames: FrameSet,
    /// Bytes consumed so far
    position: u64,
}

impl<R: BufRead> Decoder<R> {
    /// Decoder for requests and AOF records
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, DecodeLimits::default())
    }

    /// Request decoder with explicit limits
    pub fn with_limits(reader: R, limits: DecodeLimits) -> Self {
        Self {
            reader,
            limits,
            frames: FrameSet::Requests,
            position: 0,
        }
    }

    /// Decoder for server replies (also accepts `+`, `-`, `:` and `$-1`)
    pub fn replies(reader: R) -> Self {
        Self {
            frames: FrameSet::Replies,
            ..Self::new(reader)
        }
    }

    /// Number of bytes consumed from the underlying reader
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
    /// End of stream anywhere inside a frame is `UnexpectedEof`.
    pub fn read_value(&mut self) -> std::result::Result<Option<Value>, DecodeError> {
        let tag = match self.read_tag()? {
            Some(tag) => tag,
            None => return Ok(None),
        };
        let mut budget = self.limits.max_elements;
        self.read_frame(tag, 0, &mut budget).map(Some)
    }

    fn read_frame(
        &mut self,
        tag: u8,
        depth: usize,
        budget: &mut usize,
    ) -> std::result::Result<Value, DecodeError> {
        match (tag, self.frames) {
            (ARRAY_TAG, _) => self.read_array(depth, budget),
            (BULK_STRING_TAG, _) => self.read_bulk(),
            (SIMPLE_STRING_TAG, FrameSet::Replies) => Ok(Value::SimpleString(self.read_text()?)),
            (SIMPLE_ERROR_TAG, FrameSet::Replies) => Ok(Value::SimpleError(self.read_text()?)),
            (INTEGER_TAG, FrameSet::Replies) => Ok(Value::Integer(self.read_integer()?)),
            (other, _) => Err(DecodeError::UnsupportedFrame(other)),
        }
    }

    fn read_array(
        &mut self,
        depth: usize,
        budget: &mut usize,
    ) -> std::result::Result<Value, DecodeError> {
        if depth >= self.limits.max_depth {
            return Err(DecodeError::TooDeep(self.limits.max_depth));
        }

        let len = self.read_integer()?;
        if len < 0 {
            return self.negative_length(len);
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
        if len > *budget {
            return Err(DecodeError::TooManyElements(self.limits.max_elements));
        }
        *budget -= len;

        let mut elements = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let tag = self.read_tag()?.ok_or(DecodeError::UnexpectedEof)?;
            elements.push(self.read_frame(tag, depth + 1, budget)?);
        }
        Ok(Value::Array(elements))
    }

    fn read_bulk(&mut self) -> std::result::Result<Value, DecodeError> {
        let len = self.read_integer()?;
        if len < 0 {
            return self.negative_length(len);
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
        if len > self.limits.max_bulk_len {
            return Err(DecodeError::BulkTooLarge {
                len,
                max: self.limits.max_bulk_len,
            });
        }

        let mut payload = Vec::with_capacity(len.min(READ_CHUNK));
        let read = (&mut self.reader).take(len as u64).read_to_end(&mut payload)?;
        self.position += read as u64;
        if read < len {
            return Err(DecodeError::UnexpectedEof);
        }

        let mut terminator = [0u8; 2];
        self.reader.read_exact(&mut terminator)?;
        self.position += 2;
        if terminator != CRLF {
            return Err(DecodeError::MissingTerminator);
        }

        Ok(Value::BulkString(Bytes::from(payload)))
    }

    /// `$-1` / `*-1` are null in replies; requests never carry them
    fn negative_length(&self, len: i64) -> std::result::Result<Value, DecodeError> {
        match self.frames {
            FrameSet::Replies if len == -1 => Ok(Value::Null),
            _ => Err(DecodeError::InvalidLength(len)),
        }
    }

    fn read_text(&mut self) -> std::result::Result<String, DecodeError> {
        let line = self.read_line(MAX_LINE_LEN)?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn read_integer(&mut self) -> std::result::Result<i64, DecodeError> {
        let line = self.read_line(MAX_LENGTH_LINE)?;
        std::str::from_utf8(&line)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| DecodeError::InvalidInteger(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Read up to CRLF, returning the line without its terminator
    fn read_line(&mut self, max: usize) -> std::result::Result<Vec<u8>, DecodeError> {
        let mut line = Vec::new();
        let limit = max + CRLF.len();
        let read = (&mut self.reader).take(limit as u64).read_until(b'\n', &mut line)?;
        self.position += read as u64;

        if line.last() != Some(&b'\n') {
            return Err(if read >= limit {
                DecodeError::LineTooLong(max)
            } else {
                DecodeError::UnexpectedEof
            });
        }
        line.pop();
        if line.pop() != Some(b'\r') {
            return Err(DecodeError::MalformedLine);
        }
        Ok(line)
    }

    /// Next tag byte, or `None` at end of stream
    fn read_tag(&mut self) -> std::result::Result<Option<u8>, DecodeError> {
        let tag = loop {
            match self.reader.fill_buf() {
                Ok(buf) => break buf.first().copied(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if tag.is_some() {
            self.reader.consume(1);
            self.position += 1;
        }
        Ok(tag)
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to bytes
///
/// Integers have no wire form in the current command surface and encode to
/// an empty sequence.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    encode_into(value, &mut buf);
    buf
}

/// Append the encoding of `value` to `buf`
pub fn encode_into<B: BufMut>(value: &Value, buf: &mut B) {
    match value {
        Value::SimpleString(text) => put_line(buf, SIMPLE_STRING_TAG, text.as_bytes()),
        Value::SimpleError(text) => put_line(buf, SIMPLE_ERROR_TAG, text.as_bytes()),
        Value::BulkString(payload) => {
            put_line(buf, BULK_STRING_TAG, payload.len().to_string().as_bytes());
            buf.put_slice(payload);
            buf.put_slice(CRLF);
        }
        Value::Array(elements) => {
            put_line(buf, ARRAY_TAG, elements.len().to_string().as_bytes());
            for element in elements {
                encode_into(element, buf);
            }
        }
        Value::Null => buf.put_slice(NULL_BULK),
        Value::Integer(_) => {}
    }
}

fn put_line<B: BufMut>(buf: &mut B, tag: u8, body: &[u8]) {
    buf.put_u8(tag);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one request frame from a stream with default limits
pub fn read_value<R: BufRead>(reader: &mut R) -> std::result::Result<Option<Value>, DecodeError> {
    Decoder::new(reader).read_value()
}

/// Write a value to a stream
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    writer.write_all(&encode(value))?;
    writer.flush()?;
    Ok(())
}
