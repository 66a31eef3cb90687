//! Snowflake ID - 64-bit time-ordered identifier
//!
//! Layout: bits 63-22 hold milliseconds since the custom epoch, bits 21-12
//! the worker id, bits 11-0 a per-millisecond sequence.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 64-bit time-ordered identifier, wire-compatible with the platform's ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(i64);

impl Snowflake {
    /// Custom epoch: 2024-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: i64 = 1704067200000;

    /// Create a new Snowflake from a raw i64 value
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

/// Error when parsing a Snowflake from string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("invalid snowflake format")]
    InvalidFormat,
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Snowflake {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for i64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::str::FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat)
    }
}

// Serialize as string for JSON (JavaScript BigInt safety)
impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

// The platform sends ids as strings, older stored rows carry them as numbers
impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(id) => Ok(Snowflake(id)),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Lock-free Snowflake generator
///
/// A single atomic word packs the last-used millisecond and sequence, so the
/// successful CAS winner always holds a value strictly above every id handed
/// out before it. Sequence exhaustion within one millisecond rolls into the
/// next millisecond instead of spinning.
pub struct SnowflakeGenerator {
    worker_id: u16,
    /// Packed `(millis since epoch) << 12 | sequence`
    state: AtomicI64,
}

impl SnowflakeGenerator {
    const SEQUENCE_BITS: u32 = 12;

    /// Create a new generator with the given worker ID
    ///
    /// # Panics
    /// Panics if worker_id >= 1024
    pub fn new(worker_id: u16) -> Self {
        assert!(worker_id < 1024, "Worker ID must be < 1024");
        Self {
            worker_id,
            state: AtomicI64::new(0),
        }
    }

    /// Generate a new unique Snowflake ID
    pub fn generate(&self) -> Snowflake {
        let now = Self::current_millis() - Snowflake::EPOCH;
        let mut prev = self.state.load(Ordering::Acquire);
        loop {
            let next = if now > (prev >> Self::SEQUENCE_BITS) {
                now << Self::SEQUENCE_BITS
            } else {
                // Same millisecond, or a clock that stepped backwards: bump
                // the sequence; overflow carries into the millisecond field
                prev + 1
            };
            match self.state.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let millis = next >> Self::SEQUENCE_BITS;
                    let sequence = next & 0xFFF;
                    return Snowflake::new(
                        (millis << 22) | (i64::from(self.worker_id) << Self::SEQUENCE_BITS) | sequence,
                    );
                }
                Err(actual) => prev = actual,
            }
        }
    }

    #[inline]
    fn current_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
