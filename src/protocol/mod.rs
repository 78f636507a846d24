//! Protocol Module
//!
//! Defines the wire protocol for client-server communication. The same frame
//! format is used for AOF records.
//!
//! ## Request Format
//! A request is one array of bulk strings: `[COMMAND, arg1, arg2, ...]`
//! ```text
//! *3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
//! ```
//!
//! ## Replies
//! - `+<text>\r\n`  simple string (`+OK`, `+PONG`)
//! - `-<text>\r\n`  simple error (`-ERR unknown command`)
//! - `$<len>\r\n<payload>\r\n`  bulk string
//! - `*<count>\r\n...`  array of replies
//! - `$-1\r\n`  null

mod value;
mod codec;

pub use value::Value;
pub use codec::{
    encode, encode_into, read_value, write_value, DecodeError, DecodeLimits, Decoder,
    ARRAY_TAG, BULK_STRING_TAG, CRLF, INTEGER_TAG, MAX_LINE_LEN, NULL_BULK, SIMPLE_ERROR_TAG,
    SIMPLE_STRING_TAG,
};
