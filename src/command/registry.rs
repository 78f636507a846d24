//! Command registry
//!
//! Name → handler lookup, built once at startup.

use std::collections::HashMap;
use std::fmt;

use super::handler::CommandHandler;
use super::handlers::{Get, HGet, HGetAll, HSet, Ping, Set};

/// Registry of command handlers keyed by upper-case name
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry holding PING, SET, GET, HSET, HGET and HGETALL
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Ping));
        registry.register(Box::new(Set));
        registry.register(Box::new(Get));
        registry.register(Box::new(HSet));
        registry.register(Box::new(HGet));
        registry.register(Box::new(HGetAll));
        registry
    }

    /// Add a handler, replacing any previous handler with the same name
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.handlers
            .get(name.to_ascii_uppercase().as_str())
            .map(|handler| handler.as_ref())
    }

    /// Iterate over all registered handlers
    pub fn handlers(&self) -> impl Iterator<Item = &dyn CommandHandler> {
        self.handlers.values().map(|handler| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("CommandRegistry").field("commands", &names).finish()
    }
}
