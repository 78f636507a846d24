//! Blocking client
//!
//! Sends request frames over TCP and decodes the replies.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::error::{CinderError, Result};
use crate::protocol::{write_value, Decoder, Value};

/// A single connection to a CinderKV server
pub struct Client {
    decoder: Decoder<BufReader<TcpStream>>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            decoder: Decoder::replies(BufReader::new(read_stream)),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a raw frame and wait for its reply
    pub fn send(&mut self, request: &Value) -> Result<Value> {
        write_value(&mut self.writer, request)?;
        match self.decoder.read_value()? {
            Some(reply) => Ok(reply),
            None => Err(CinderError::Protocol(
                "connection closed before reply".to_string(),
            )),
        }
    }

    /// Send `[COMMAND, args...]` and return the reply as-is
    pub fn command<T: AsRef<[u8]>>(&mut self, parts: &[T]) -> Result<Value> {
        self.send(&Value::command(parts))
    }

    /// `PING [message]`
    pub fn ping(&mut self, message: Option<&str>) -> Result<String> {
        let reply = match message {
            Some(message) => self.command(&["PING", message])?,
            None => self.command(&["PING"])?,
        };
        expect_simple(reply)
    }

    /// `SET key value`
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        expect_simple(self.command(&[b"SET".as_slice(), key, value])?).map(|_| ())
    }

    /// `GET key`
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Bytes>> {
        expect_bulk(self.command(&[b"GET".as_slice(), key])?)
    }

    /// `HSET hash field value`
    pub fn hset(&mut self, hash: &[u8], field: &[u8], value: &[u8]) -> Result<()> {
        expect_simple(self.command(&[b"HSET".as_slice(), hash, field, value])?).map(|_| ())
    }

    /// `HGET hash field`
    pub fn hget(&mut self, hash: &[u8], field: &[u8]) -> Result<Option<Bytes>> {
        expect_bulk(self.command(&[b"HGET".as_slice(), hash, field])?)
    }

    /// `HGETALL hash`, as (field, value) pairs
    pub fn hgetall(&mut self, hash: &[u8]) -> Result<Option<Vec<(Bytes, Bytes)>>> {
        match self.command(&[b"HGETALL".as_slice(), hash])? {
            Value::Null => Ok(None),
            Value::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(CinderError::Protocol(format!(
                        "HGETALL reply has odd length {}",
                        items.len()
                    )));
                }
                let mut pairs = Vec::with_capacity(items.len() / 2);
                let mut items = items.into_iter();
                while let (Some(field), Some(value)) = (items.next(), items.next()) {
                    match (field, value) {
                        (Value::BulkString(field), Value::BulkString(value)) => {
                            pairs.push((field, value))
                        }
                        other => {
                            return Err(CinderError::Protocol(format!(
                                "unexpected HGETALL pair: {:?}",
                                other
                            )))
                        }
                    }
                }
                Ok(Some(pairs))
            }
            other => unexpected(other),
        }
    }
}

fn expect_simple(reply: Value) -> Result<String> {
    match reply {
        Value::SimpleString(text) => Ok(text),
        other => unexpected(other),
    }
}

fn expect_bulk(reply: Value) -> Result<Option<Bytes>> {
    match reply {
        Value::BulkString(payload) => Ok(Some(payload)),
        Value::Null => Ok(None),
        other => unexpected(other),
    }
}

fn unexpected<T>(reply: Value) -> Result<T> {
    match reply {
        Value::SimpleError(message) => Err(CinderError::Server(message)),
        other => Err(CinderError::Protocol(format!(
            "unexpected {} reply",
            other.kind()
        ))),
    }
}
