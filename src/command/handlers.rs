//! Built-in command handlers
//!
//! Every handler checks its arity before touching the store.

use bytes::Bytes;

use crate::protocol::Value;
use crate::store::Store;

use super::handler::{arity_error, bulk_args, Arity, CommandHandler};

/// Validate arity and unwrap bulk arguments, or return the error reply
macro_rules! args_or_reply {
    ($handler:expr, $args:expr) => {{
        if !$handler.arity().accepts($args.len()) {
            return arity_error($handler.name());
        }
        match bulk_args($args) {
            Ok(args) => args,
            Err(reply) => return reply,
        }
    }};
}

fn bulk_or_null(value: Option<Bytes>) -> Value {
    value.map_or(Value::Null, Value::BulkString)
}

/// `PING [message]`
pub struct Ping;

impl CommandHandler for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn arity(&self) -> Arity {
        Arity::Range { min: 0, max: 1 }
    }

    fn is_write(&self) -> bool {
        false
    }

    fn execute(&self, _store: &Store, args: &[Value]) -> Value {
        let args = args_or_reply!(self, args);
        match args.first() {
            // A simple string reply cannot carry a line break
            Some(message) if message.iter().any(|&b| b == b'\r' || b == b'\n') => {
                Value::error("ERR invalid argument, PING message must not contain CR or LF")
            }
            Some(message) => Value::simple(String::from_utf8_lossy(message)),
            None => Value::simple("PONG"),
        }
    }
}

/// `SET key value`
pub struct Set;

impl CommandHandler for Set {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn is_write(&self) -> bool {
        true
    }

    fn execute(&self, store: &Store, args: &[Value]) -> Value {
        let mut args = args_or_reply!(self, args).into_iter();
        match (args.next(), args.next()) {
            (Some(key), Some(value)) => {
                store.set(key, value);
                Value::ok()
            }
            _ => arity_error(self.name()),
        }
    }
}

/// `GET key`
pub struct Get;

impl CommandHandler for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn is_write(&self) -> bool {
        false
    }

    fn execute(&self, store: &Store, args: &[Value]) -> Value {
        let args = args_or_reply!(self, args);
        bulk_or_null(store.get(&args[0]))
    }
}

/// `HSET hash field value`
pub struct HSet;

impl CommandHandler for HSet {
    fn name(&self) -> &'static str {
        "HSET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn is_write(&self) -> bool {
        true
    }

    fn execute(&self, store: &Store, args: &[Value]) -> Value {
        let mut args = args_or_reply!(self, args).into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(hash), Some(field), Some(value)) => {
                store.hset(hash, field, value);
                Value::ok()
            }
            _ => arity_error(self.name()),
        }
    }
}

/// `HGET hash field`
pub struct HGet;

impl CommandHandler for HGet {
    fn name(&self) -> &'static str {
        "HGET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn is_write(&self) -> bool {
        false
    }

    fn execute(&self, store: &Store, args: &[Value]) -> Value {
        let args = args_or_reply!(self, args);
        bulk_or_null(store.hget(&args[0], &args[1]))
    }
}

/// `HGETALL hash`
///
/// Replies with a flat `[field, value, field, value, ...]` array.
pub struct HGetAll;

impl CommandHandler for HGetAll {
    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn is_write(&self) -> bool {
        false
    }

    fn execute(&self, store: &Store, args: &[Value]) -> Value {
        let args = args_or_reply!(self, args);
        match store.hgetall(&args[0]) {
            Some(pairs) => Value::Array(
                pairs
                    .into_iter()
                    .flat_map(|(field, value)| {
                        [Value::BulkString(field), Value::BulkString(value)]
                    })
                    .collect(),
            ),
            None => Value::Null,
        }
    }
}
