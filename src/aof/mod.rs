//! Append-Only File (AOF) Module
//!
//! Provides durability by logging every mutating command before it runs.
//!
//! ## Responsibilities
//! - Append command frames verbatim, in receipt order
//! - fsync on a policy (every append, once per interval, or never)
//! - Replay the whole file on startup to rebuild the store
//!
//! ## File Format
//! The file is a plain concatenation of request frames, exactly as clients
//! sent them:
//! ```text
//! *3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
//! *4\r\n$4\r\nHSET\r\n$1\r\nh\r\n$1\r\nf\r\n$1\r\nv\r\n
//! ...
//! ```
//! There is no header, checksum or compaction. A record cut short by a crash
//! makes replay fail rather than silently dropping state.

mod log;
mod replay;
mod syncer;

pub use log::AppendOnlyLog;
pub use replay::{replay_records, ReplayStats};
