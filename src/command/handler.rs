//! Handler trait and argument helpers

use bytes::Bytes;

use crate::protocol::Value;
use crate::store::Store;

/// Accepted argument counts, not counting the command name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range { min: usize, max: usize },
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range { min, max } => (min..=max).contains(&count),
        }
    }
}

/// A named command implementation
pub trait CommandHandler: Send + Sync {
    /// Upper-case command name
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Whether the command mutates the store
    fn is_write(&self) -> bool;

    /// Check `args` without touching the store
    ///
    /// `Err` carries the reply the command would fail with. Anything that
    /// passes here can be logged and replayed.
    fn validate(&self, args: &[Value]) -> Result<(), Value> {
        if !self.arity().accepts(args.len()) {
            return Err(arity_error(self.name()));
        }
        match args.iter().find(|arg| arg.as_bulk().is_none()) {
            Some(_) => Err(invalid_argument()),
            None => Ok(()),
        }
    }

    /// Validate `args` and run the command
    fn execute(&self, store: &Store, args: &[Value]) -> Value;
}

/// `-ERR wrong number of arguments for '<name>' command`
pub fn arity_error(name: &str) -> Value {
    Value::error(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}

/// `-ERR invalid argument, expected bulk string`
pub(crate) fn invalid_argument() -> Value {
    Value::error("ERR invalid argument, expected bulk string")
}

/// Collect bulk payloads, or the error reply for the first non-bulk argument
pub(crate) fn bulk_args(args: &[Value]) -> Result<Vec<Bytes>, Value> {
    args.iter()
        .map(|arg| arg.as_bulk().cloned().ok_or_else(invalid_argument))
        .collect()
}
