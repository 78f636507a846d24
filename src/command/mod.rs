//! Command Module
//!
//! Maps command names to handlers that run against the [`Store`](crate::store::Store).
//!
//! ## Handler Contract
//! 1. Validate the argument count; on mismatch reply
//!    `-ERR wrong number of arguments for '<name>' command`
//! 2. Perform exactly one store operation
//! 3. Return the reply value
//!
//! Lookup failure is not a handler concern; the engine renders it as
//! `-ERR unknown command`.

mod handler;
mod handlers;
mod registry;

pub use handler::{arity_error, Arity, CommandHandler};
pub use handlers::{Get, HGet, HGetAll, HSet, Ping, Set};
pub use registry::CommandRegistry;

/// Commands whose frames are appended to the AOF before they execute.
///
/// Selected by name. A new mutating command must be listed here or its
/// writes will not survive a restart.
pub const PERSISTED_COMMANDS: &[&str] = &["SET", "HSET"];

/// Whether a command (already upper-cased) is appended to the AOF
pub fn is_persisted(name: &str) -> bool {
    PERSISTED_COMMANDS.contains(&name)
}
