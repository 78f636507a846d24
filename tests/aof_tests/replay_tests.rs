//! Tests for AOF replay
//!
//! These tests verify:
//! - Replay feeds records back in file order
//! - An empty log replays cleanly
//! - Truncated or corrupt logs are reported with their offset
//! - Replaying the same log twice builds the same state

use std::fs::{self, OpenOptions};
use std::io::{Cursor, Write};
use std::path::PathBuf;

use bytes::Bytes;
use cinderkv::aof::{replay_records, AppendOnlyLog, ReplayStats};
use cinderkv::command::CommandRegistry;
use cinderkv::protocol::{encode, DecodeError, DecodeLimits};
use cinderkv::{CinderError, FsyncPolicy, Store, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_aof() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let aof_path = temp_dir.path().join("test.aof");
    (temp_dir, aof_path)
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
}

/// Apply a logged record to `store` the way startup recovery does
fn apply(registry: &CommandRegistry, store: &Store, record: &Value) {
    let parts = record.as_array().unwrap();
    let name = String::from_utf8_lossy(parts[0].as_bulk().unwrap()).to_string();
    let handler = registry.lookup(&name).unwrap();
    handler.execute(store, &parts[1..]);
}

// =============================================================================
// Basic Replay Tests
// =============================================================================

#[test]
fn test_replay_empty_log() {
    let (_temp, aof_path) = setup_temp_aof();
    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();

    let mut count = 0;
    let stats = aof.replay(|_| count += 1).unwrap();

    assert_eq!(count, 0);
    assert_eq!(stats, ReplayStats::default());
}

#[test]
fn test_replay_returns_records_in_order() {
    let (_temp, aof_path) = setup_temp_aof();
    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();

    let written = vec![
        Value::command(["SET", "a", "1"]),
        Value::command(["HSET", "h", "f", "v"]),
        Value::command(["SET", "a", "2"]),
    ];
    for record in &written {
        aof.append(record).unwrap();
    }

    let mut replayed = Vec::new();
    let stats = aof.replay(|record| replayed.push(record)).unwrap();

    assert_eq!(replayed, written);
    assert_eq!(stats.records, 3);
    assert_eq!(stats.bytes, fs::metadata(&aof_path).unwrap().len());
}

#[test]
fn test_replay_binary_payloads() {
    let (_temp, aof_path) = setup_temp_aof();
    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();

    let record = Value::Array(vec![
        Value::bulk(Bytes::from_static(b"SET")),
        Value::bulk(Bytes::from_static(b"k\r\n")),
        Value::bulk(Bytes::from_static(&[0x00, 0xFF, b'\r', b'\n'])),
    ]);
    aof.append(&record).unwrap();

    let mut replayed = Vec::new();
    aof.replay(|r| replayed.push(r)).unwrap();
    assert_eq!(replayed, vec![record]);
}

#[test]
fn test_replay_records_from_memory() {
    let mut bytes = encode(&Value::command(["SET", "k", "v"]));
    bytes.extend(encode(&Value::command(["PING"])));
    let total = bytes.len() as u64;

    let mut names = Vec::new();
    let stats = replay_records(Cursor::new(bytes), DecodeLimits::default(), |record| {
        let parts = record.as_array().unwrap();
        names.push(parts[0].as_bulk().unwrap().clone());
    })
    .unwrap();

    assert_eq!(names, vec![Bytes::from_static(b"SET"), Bytes::from_static(b"PING")]);
    assert_eq!(stats, ReplayStats { records: 2, bytes: total });
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_truncated_tail_is_corruption() {
    let (_temp, aof_path) = setup_temp_aof();
    let good = encode(&Value::command(["SET", "a", "1"]));
    append_raw(&aof_path, &good);
    append_raw(&aof_path, b"*3\r\n$3\r\nSET\r\n$1\r\nb");

    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();
    let mut count = 0;
    let result = aof.replay(|_| count += 1);

    // The complete record ahead of the damage is still delivered
    assert_eq!(count, 1);
    match result {
        Err(CinderError::LogCorrupted {
            offset,
            source: DecodeError::UnexpectedEof,
        }) => assert_eq!(offset, good.len() as u64),
        other => panic!("expected truncation error, got {:?}", other),
    }
}

#[test]
fn test_garbage_byte_is_corruption() {
    let (_temp, aof_path) = setup_temp_aof();
    append_raw(&aof_path, b"?garbage\r\n");

    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();
    let result = aof.replay(|_| panic!("nothing should be applied"));

    assert!(matches!(
        result,
        Err(CinderError::LogCorrupted {
            offset: 0,
            source: DecodeError::UnsupportedFrame(b'?'),
        })
    ));
}

#[test]
fn test_non_array_record_is_rejected() {
    let (_temp, aof_path) = setup_temp_aof();
    let good = encode(&Value::command(["SET", "a", "1"]));
    append_raw(&aof_path, &good);
    append_raw(&aof_path, b"$3\r\nbar\r\n");

    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();
    let result = aof.replay(|_| {});

    match result {
        Err(CinderError::LogRecord { offset, kind }) => {
            assert_eq!(offset, good.len() as u64);
            assert_eq!(kind, "bulk string");
        }
        other => panic!("expected record error, got {:?}", other),
    }
}

#[test]
fn test_replay_respects_decode_limits() {
    let bytes = encode(&Value::command(["SET", "k", "a-long-value"]));
    let limits = DecodeLimits {
        max_bulk_len: 4,
        ..DecodeLimits::default()
    };

    let result = replay_records(Cursor::new(bytes), limits, |_| {});
    assert!(matches!(
        result,
        Err(CinderError::LogCorrupted {
            offset: 0,
            source: DecodeError::BulkTooLarge { len: 12, max: 4 },
        })
    ));
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_replay_twice_builds_same_state() {
    let (_temp, aof_path) = setup_temp_aof();
    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();

    aof.append(&Value::command(["SET", "a", "1"])).unwrap();
    aof.append(&Value::command(["HSET", "h", "f", "x"])).unwrap();
    aof.append(&Value::command(["SET", "a", "2"])).unwrap();
    aof.append(&Value::command(["HSET", "h", "f", "y"])).unwrap();
    aof.append(&Value::command(["HSET", "h", "g", "z"])).unwrap();

    let registry = CommandRegistry::with_defaults();
    let first = Store::new();
    let second = Store::new();
    aof.replay(|record| apply(&registry, &first, &record)).unwrap();
    aof.replay(|record| apply(&registry, &second, &record)).unwrap();

    for store in [&first, &second] {
        assert_eq!(store.get(b"a"), Some(Bytes::from_static(b"2")));
        assert_eq!(store.hget(b"h", b"f"), Some(Bytes::from_static(b"y")));
        assert_eq!(store.hget(b"h", b"g"), Some(Bytes::from_static(b"z")));
        assert_eq!(store.key_count(), 1);
        assert_eq!(store.hash_count(), 1);
    }

    let mut all_first = first.hgetall(b"h").unwrap();
    let mut all_second = second.hgetall(b"h").unwrap();
    all_first.sort();
    all_second.sort();
    assert_eq!(all_first, all_second);
}

#[test]
fn test_replay_does_not_modify_log() {
    let (_temp, aof_path) = setup_temp_aof();
    let aof = AppendOnlyLog::open(&aof_path, FsyncPolicy::Never).unwrap();
    aof.append(&Value::command(["SET", "a", "1"])).unwrap();

    let before = fs::read(&aof_path).unwrap();
    aof.replay(|_| {}).unwrap();
    aof.replay(|_| {}).unwrap();

    assert_eq!(fs::read(&aof_path).unwrap(), before);
}
