//! String table
//!
//! key → value map behind a reader-writer lock.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

/// Flat key/value table
#[derive(Default)]
pub struct StringTable {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert (write lock). Last write wins.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.data.write().insert(key, value);
    }

    /// Read lock; clones the value out so the lock is released on return
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
