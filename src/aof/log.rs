//! AOF handle
//!
//! Appends encoded command frames and replays them on startup.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::FsyncPolicy;
use crate::error::{CinderError, Result};
use crate::protocol::{encode, DecodeLimits, Value};

use super::replay::{replay_records, ReplayStats};
use super::syncer::Syncer;

/// The log file plus its lock, shared with the background syncer
pub(crate) struct SharedFile {
    file: Mutex<File>,
    syncs: AtomicU64,
}

impl SharedFile {
    pub(crate) fn sync(&self) -> Result<()> {
        self.file.lock().sync_data()?;
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Append-only command log
///
/// ## Concurrency:
/// - Appends, syncs and replay all take the same exclusive lock
/// - The file is opened in append mode, so writes always land at the end
///   even after replay has seeked back to the start
pub struct AppendOnlyLog {
    path: PathBuf,
    shared: Arc<SharedFile>,
    policy: FsyncPolicy,
    limits: DecodeLimits,
    /// Background fsync thread; `None` once closed or if the policy has none
    syncer: Mutex<Option<Syncer>>,
}

impl AppendOnlyLog {
    /// Open or create the log with default decode limits
    pub fn open(path: &Path, policy: FsyncPolicy) -> Result<Self> {
        Self::open_with_limits(path, policy, DecodeLimits::default())
    }

    /// Open or create the log
    ///
    /// Starts the background syncer when the policy asks for one.
    pub fn open_with_limits(path: &Path, policy: FsyncPolicy, limits: DecodeLimits) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let shared = Arc::new(SharedFile {
            file: Mutex::new(file),
            syncs: AtomicU64::new(0),
        });

        let syncer = match policy.interval() {
            Some(interval) => Some(Syncer::spawn(Arc::clone(&shared), interval)?),
            None => None,
        };

        tracing::debug!("Opened AOF {} with policy {:?}", path.display(), policy);

        Ok(Self {
            path: path.to_path_buf(),
            shared,
            policy,
            limits,
            syncer: Mutex::new(syncer),
        })
    }

    /// Encode and append a record
    ///
    /// Only fsyncs when the policy is `Always`.
    pub fn append(&self, value: &Value) -> Result<()> {
        let bytes = encode(value);
        let mut file = self.shared.file.lock();
        self.write_record(&mut file, &bytes)
    }

    /// Append a record, then run `apply` before releasing the log lock
    ///
    /// Mutations applied this way happen in the same order as their records
    /// appear in the file. `apply` is not run if the append fails.
    pub fn append_then<T, F>(&self, value: &Value, apply: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        let bytes = encode(value);
        let mut file = self.shared.file.lock();
        self.write_record(&mut file, &bytes)?;
        Ok(apply())
    }

    fn write_record(&self, file: &mut File, bytes: &[u8]) -> Result<()> {
        append_frame(file, bytes).map_err(CinderError::LogWrite)?;
        if self.policy == FsyncPolicy::Always {
            file.sync_data()?;
            self.shared.syncs.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Force written records to stable storage
    pub fn sync(&self) -> Result<()> {
        self.shared.sync()
    }

    /// Feed every record, from offset zero, to `apply`
    pub fn replay<F>(&self, apply: F) -> Result<ReplayStats>
    where
        F: FnMut(Value),
    {
        let mut file = self.shared.file.lock();
        file.seek(SeekFrom::Start(0))?;
        replay_records(BufReader::new(&*file), self.limits, apply)
    }

    /// Stop the background syncer and sync one last time
    ///
    /// Further appends are still accepted but only synced on request.
    pub fn close(&self) -> Result<()> {
        // Dropping the syncer stops and joins its thread
        drop(self.syncer.lock().take());
        self.sync()
    }

    /// Whether the background syncer is running
    pub fn is_syncing(&self) -> bool {
        self.syncer.lock().is_some()
    }

    /// Number of completed fsyncs (explicit, per-append and background)
    pub fn sync_count(&self) -> u64 {
        self.shared.syncs.load(Ordering::Relaxed)
    }

    /// Current size of the log file in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.shared.file.lock().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> FsyncPolicy {
        self.policy
    }
}

// =============================================================================
// Partial-write rollback
// =============================================================================

/// Storage a record is appended to
pub(crate) trait AppendTarget: Write {
    /// Current length in bytes
    fn end(&self) -> io::Result<u64>;

    /// Cut the storage back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl AppendTarget for File {
    fn end(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write one whole record or nothing
///
/// A failed write may have left a fragment at the end of the log, which would
/// make every later record unreadable on replay. The fragment is cut off
/// before the error is returned.
pub(crate) fn append_frame<T: AppendTarget>(target: &mut T, bytes: &[u8]) -> io::Result<()> {
    let end = target.end()?;
    if let Err(e) = target.write_all(bytes) {
        if let Err(undo) = target.truncate(end) {
            tracing::error!("Failed to cut partial AOF record back to {} bytes: {}", end, undo);
        }
        return Err(e);
    }
    Ok(())
}
