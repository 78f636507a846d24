//! Configuration for CinderKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CinderError, Result};
use crate::protocol::DecodeLimits;

/// Main configuration for a CinderKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only file. Replayed on startup, appended to afterwards.
    pub aof_path: PathBuf,

    /// How often the AOF is forced to stable storage
    pub fsync_policy: FsyncPolicy,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Ceilings applied while decoding frames from clients and from the AOF
    pub decode_limits: DecodeLimits,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,
}

/// AOF fsync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsyncPolicy {
    /// fsync after every append (safest, slowest)
    Always,

    /// fsync from a background thread once per interval
    Every { interval_ms: u64 },

    /// Never fsync explicitly; leave it to the OS
    Never,
}

impl FsyncPolicy {
    /// The default background policy: once per second
    pub const EVERY_SECOND: FsyncPolicy = FsyncPolicy::Every { interval_ms: 1000 };

    /// Interval of the background syncer, if this policy runs one
    pub fn interval(&self) -> Option<Duration> {
        match self {
            FsyncPolicy::Every { interval_ms } => Some(Duration::from_millis(*interval_ms)),
            FsyncPolicy::Always | FsyncPolicy::Never => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aof_path: PathBuf::from("database.aof"),
            fsync_policy: FsyncPolicy::EVERY_SECOND,
            decode_limits: DecodeLimits::default(),
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if let FsyncPolicy::Every { interval_ms: 0 } = self.fsync_policy {
            return Err(CinderError::Config(
                "fsync interval must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(CinderError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        let limits = &self.decode_limits;
        if limits.max_depth == 0 || limits.max_elements == 0 || limits.max_bulk_len == 0 {
            return Err(CinderError::Config(
                "decode limits must be greater than zero".to_string(),
            ));
        }
        if self.aof_path.as_os_str().is_empty() {
            return Err(CinderError::Config("aof_path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the append-only file path
    pub fn aof_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.aof_path = path.into();
        self
    }

    /// Set the AOF fsync policy
    pub fn fsync_policy(mut self, policy: FsyncPolicy) -> Self {
        self.config.fsync_policy = policy;
        self
    }

    /// Set the decode limits
    pub fn decode_limits(mut self, limits: DecodeLimits) -> Self {
        self.config.decode_limits = limits;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
