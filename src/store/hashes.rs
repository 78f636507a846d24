//! Hash table
//!
//! hash → (field → value) maps behind a single reader-writer lock.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

/// Table of named hashes
///
/// A hash comes into existence on its first field write and is never removed.
#[derive(Default)]
pub struct HashTable {
    data: RwLock<HashMap<Bytes, HashMap<Bytes, Bytes>>>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a field (write lock)
    pub fn set(&self, hash: Bytes, field: Bytes, value: Bytes) {
        self.data
            .write()
            .entry(hash)
            .or_default()
            .insert(field, value);
    }

    /// Read a single field (read lock)
    pub fn get(&self, hash: &[u8], field: &[u8]) -> Option<Bytes> {
        self.data
            .read()
            .get(hash)
            .and_then(|fields| fields.get(field))
            .cloned()
    }

    /// Snapshot of every field of a hash (read lock)
    pub fn get_all(&self, hash: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.data.read().get(hash).map(|fields| {
            fields
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        })
    }

    /// Number of hashes
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
