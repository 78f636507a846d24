//! AOF replay
//!
//! Streams records back through the request decoder.

use std::io::BufRead;

use crate::error::{CinderError, Result};
use crate::protocol::{DecodeError, DecodeLimits, Decoder, Value};

/// Result of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of records handed to the apply function
    pub records: u64,

    /// Bytes consumed (the full length of a cleanly replayed log)
    pub bytes: u64,
}

/// Decode every record in `reader` and hand it to `apply`
///
/// Stops at a clean end of stream. Anything else that is not a complete
/// array frame aborts the replay with the offset of the bad record.
pub fn replay_records<R, F>(reader: R, limits: DecodeLimits, mut apply: F) -> Result<ReplayStats>
where
    R: BufRead,
    F: FnMut(Value),
{
    let mut decoder = Decoder::with_limits(reader, limits);
    let mut stats = ReplayStats::default();

    loop {
        let offset = decoder.position();
        match decoder.read_value() {
            Ok(None) => break,
            Ok(Some(record @ Value::Array(_))) => {
                apply(record);
                stats.records += 1;
            }
            Ok(Some(other)) => {
                return Err(CinderError::LogRecord {
                    offset,
                    kind: other.kind(),
                })
            }
            Err(DecodeError::Io(e)) => return Err(CinderError::Io(e)),
            Err(source) => return Err(CinderError::LogCorrupted { offset, source }),
        }
    }

    stats.bytes = decoder.position();
    Ok(stats)
}
