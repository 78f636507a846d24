//! Value definitions
//!
//! The typed value model shared by requests, replies and AOF records.

use bytes::Bytes;

/// A single protocol value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Short status text, e.g. `OK` or `PONG`
    SimpleString(String),

    /// Error text, conventionally prefixed with an error code such as `ERR`
    SimpleError(String),

    /// Signed whole number
    Integer(i64),

    /// Opaque payload of explicit length
    BulkString(Bytes),

    /// Ordered sequence of nested values
    Array(Vec<Value>),

    /// Absent value
    Null,
}

impl Value {
    /// Create a simple string value
    pub fn simple(text: impl Into<String>) -> Self {
        Value::SimpleString(text.into())
    }

    /// Create a simple error value
    pub fn error(text: impl Into<String>) -> Self {
        Value::SimpleError(text.into())
    }

    /// Create a bulk string value
    pub fn bulk(payload: impl Into<Bytes>) -> Self {
        Value::BulkString(payload.into())
    }

    /// The `+OK` status reply
    pub fn ok() -> Self {
        Value::SimpleString("OK".to_string())
    }

    /// Build a request frame (`[COMMAND, arg1, ...]`) from raw parts
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Value::Array(
            parts
                .into_iter()
                .map(|part| Value::BulkString(Bytes::copy_from_slice(part.as_ref())))
                .collect(),
        )
    }

    /// Bulk payload, if this is a bulk string
    pub fn as_bulk(&self) -> Option<&Bytes> {
        match self {
            Value::BulkString(payload) => Some(payload),
            _ => None,
        }
    }

    /// Elements, if this is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::SimpleError(_))
    }

    /// Human-readable kind name, used in log lines and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::SimpleString(_) => "simple string",
            Value::SimpleError(_) => "simple error",
            Value::Integer(_) => "integer",
            Value::BulkString(_) => "bulk string",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }
}
