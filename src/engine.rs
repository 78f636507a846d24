//! Engine Module
//!
//! Ties the store, the command registry and the AOF together.
//!
//! ## Responsibilities
//! - Rebuild the store from the AOF on startup
//! - Validate request frames and dispatch them to handlers
//! - Log mutating commands before they run
//! - Sync and stop the AOF on shutdown

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::aof::{AppendOnlyLog, ReplayStats};
use crate::command::{is_persisted, CommandHandler, CommandRegistry};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::Value;
use crate::store::Store;

/// Outcome of startup recovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Records read from the AOF
    pub replay: ReplayStats,

    /// Records naming a command this build does not know
    pub skipped: u64,
}

/// The core request-processing engine
///
/// ## Ordering
/// - Reads run under the store's read locks only
/// - Mutating commands run inside the AOF lock (`append_then`), so they are
///   applied in exactly the order they were logged
/// - The AOF is written before the store is touched; a crash in between
///   leaves a logged command that replay will apply
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory tables
    store: Store,

    /// Command name → handler
    registry: CommandRegistry,

    /// Durable log of mutating commands
    aof: AppendOnlyLog,

    /// Number of requests executed since open (not counting replay)
    commands_processed: AtomicU64,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create the AOF (starts the background syncer)
    /// 2. Replay every record into a fresh store
    /// 3. Ready to serve requests
    ///
    /// A corrupt or truncated AOF aborts startup.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_registry(config, CommandRegistry::with_defaults())
    }

    /// Open with a custom registry
    pub fn open_with_registry(config: Config, registry: CommandRegistry) -> Result<Self> {
        config.validate()?;

        let aof = AppendOnlyLog::open_with_limits(
            &config.aof_path,
            config.fsync_policy,
            config.decode_limits,
        )?;

        let engine = Self {
            config,
            store: Store::new(),
            registry,
            aof,
            commands_processed: AtomicU64::new(0),
        };

        let recovery = engine.recover()?;
        if recovery.replay.records > 0 {
            tracing::info!(
                "AOF replay: {} records ({} bytes), {} skipped",
                recovery.replay.records,
                recovery.replay.bytes,
                recovery.skipped
            );
        }

        Ok(engine)
    }

    fn recover(&self) -> Result<RecoveryStats> {
        let mut skipped = 0;
        let replay = self.aof.replay(|record| {
            if !self.replay_record(&record) {
                skipped += 1;
            }
        })?;
        Ok(RecoveryStats { replay, skipped })
    }

    /// Apply one logged command frame to the store without re-logging it
    ///
    /// Returns `false` if the record does not name a registered command.
    pub fn replay_record(&self, record: &Value) -> bool {
        let (handler, args) = match self.resolve(record) {
            Ok(resolved) => resolved,
            Err(reply) => {
                tracing::warn!("Skipping AOF record: {:?}", reply);
                return false;
            }
        };
        let reply = handler.execute(&self.store, args);
        if reply.is_error() {
            tracing::warn!("AOF record for {} failed: {:?}", handler.name(), reply);
        }
        true
    }

    /// Execute one request frame and produce its reply
    ///
    /// Request-level problems (wrong shape, unknown command, wrong arity)
    /// become error replies; nothing here ends the connection.
    pub fn execute(&self, request: &Value) -> Value {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);

        let (handler, args) = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err(reply) => return reply,
        };

        // Rejected before logging so the AOF only holds replayable records
        if let Err(reply) = handler.validate(args) {
            return reply;
        }

        if !is_persisted(handler.name()) {
            return handler.execute(&self.store, args);
        }

        match self
            .aof
            .append_then(request, || handler.execute(&self.store, args))
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Failed to append {} to AOF: {}", handler.name(), e);
                Value::error("ERR failed to persist data")
            }
        }
    }

    /// Split a request into its handler and arguments
    fn resolve<'a>(&self, request: &'a Value) -> std::result::Result<(&dyn CommandHandler, &'a [Value]), Value> {
        let parts = match request {
            Value::Array(parts) => parts,
            _ => return Err(Value::error("ERR invalid request, expected array")),
        };
        let (name, args) = match parts.split_first() {
            Some(split) => split,
            None => {
                return Err(Value::error(
                    "ERR invalid request, expected array length > 0",
                ))
            }
        };
        let name = match name.as_bulk() {
            Some(name) => command_name(name),
            None => {
                return Err(Value::error(
                    "ERR invalid request, expected bulk string command name",
                ))
            }
        };

        tracing::trace!("Dispatching {} with {} args", name, args.len());

        match self.registry.lookup(&name) {
            Some(handler) => Ok((handler, args)),
            None => Err(Value::error("ERR unknown command")),
        }
    }

    /// Stop the background syncer and sync the AOF
    pub fn close(&self) -> Result<()> {
        self.aof.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn aof(&self) -> &AppendOnlyLog {
        &self.aof
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn commands_processed(&self) -> u64 {
        self.commands_processed.load(Ordering::Relaxed)
    }
}

/// Lossy name text; non-UTF-8 names simply never match a handler
fn command_name(name: &Bytes) -> String {
    String::from_utf8_lossy(name).to_ascii_uppercase()
}
