//! Store Module
//!
//! In-memory tables for string keys and hashes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many readers / one writer per table
//! - No cross-table atomicity: each table has its own lock
//!
//! ## Data Structure Choice
//! `HashMap` wrapped in `parking_lot::RwLock`:
//! - No ordering requirement on keys or fields
//! - `Bytes` keys and values are cheap to clone out of the lock

mod strings;
mod hashes;

use bytes::Bytes;

pub use strings::StringTable;
pub use hashes::HashTable;

/// The complete volatile state of a CinderKV instance
///
/// ## Concurrency:
/// - `strings` and `hashes` are guarded independently
/// - All methods take `&self`; share a `Store` through `Arc`
#[derive(Default)]
pub struct Store {
    /// key → value
    strings: StringTable,

    /// hash → (field → value)
    hashes: HashTable,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a key
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.strings.set(key, value);
    }

    /// Look up a key
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.strings.get(key)
    }

    /// Upsert a field, creating the hash if needed
    pub fn hset(&self, hash: Bytes, field: Bytes, value: Bytes) {
        self.hashes.set(hash, field, value);
    }

    /// Look up a field; `None` if either the hash or the field is absent
    pub fn hget(&self, hash: &[u8], field: &[u8]) -> Option<Bytes> {
        self.hashes.get(hash, field)
    }

    /// All (field, value) pairs of a hash, in unspecified order
    pub fn hgetall(&self, hash: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.hashes.get_all(hash)
    }

    /// Number of string keys
    pub fn key_count(&self) -> usize {
        self.strings.len()
    }

    /// Number of hashes
    pub fn hash_count(&self) -> usize {
        self.hashes.len()
    }
}
