//! Background fsync task
//!
//! Owned by the log: spawned on open, stopped and joined on close or drop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::Result;
use super::log::SharedFile;

pub(crate) struct Syncer {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Syncer {
    pub(crate) fn spawn(file: Arc<SharedFile>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name("aof-syncer".to_string())
            .spawn(move || run(file, interval, stopped))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for Syncer {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("AOF syncer thread panicked");
            }
        }
    }
}

fn run(file: Arc<SharedFile>, interval: Duration, stopped: Receiver<()>) {
    tracing::debug!("AOF syncer started, interval {:?}", interval);
    loop {
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                // Best effort: a failed sync is retried on the next tick
                if let Err(e) = file.sync() {
                    tracing::warn!("AOF background sync failed: {}", e);
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("AOF syncer stopped");
}
