use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of shards a deployment may use. Labels are two decimal digits,
/// so shard ids live in `00..=98`.
pub const MAX_SHARD_COUNT: u8 = 99;

const LABEL_WIDTH: usize = 2;

/// One of the independent counter partitions.
///
/// Renders as a fixed-width, zero-padded label (`"07"`). The label is part
/// of the persisted key format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ShardId(u8);

impl ShardId {
    /// Creates a shard id, rejecting values outside `0..MAX_SHARD_COUNT`.
    pub fn new(shard: u8) -> Result<Self> {
        if shard >= MAX_SHARD_COUNT {
            return Err(CoreError::ShardOutOfRange {
                shard: u32::from(shard),
                max: MAX_SHARD_COUNT,
            });
        }
        Ok(Self(shard))
    }

    /// Returns the raw shard number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the zero-based index into per-shard tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterates the first `count` shards in label order.
    pub fn all(count: u8) -> impl Iterator<Item = ShardId> {
        (0..count.min(MAX_SHARD_COUNT)).map(ShardId)
    }

    /// Parses a two-digit label such as `"07"`.
    pub fn from_label(label: &str) -> Result<Self> {
        if label.len() != LABEL_WIDTH || !label.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidKey(format!(
                "shard label must be {LABEL_WIDTH} digits, got '{label}'"
            )));
        }
        let shard: u8 = label
            .parse()
            .map_err(|e| CoreError::InvalidKey(format!("invalid shard label '{label}': {e}")))?;
        Self::new(shard)
    }
}

impl TryFrom<u8> for ShardId {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ShardId> for u8 {
    fn from(shard: ShardId) -> Self {
        shard.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = LABEL_WIDTH)
    }
}

/// The `(shard, sequence)` pair that identifies a stored record.
///
/// Its textual form is the shard label followed by the decimal sequence,
/// e.g. `(07, 43)` is `"0743"`. That text is what the codec encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    pub shard: ShardId,
    pub sequence: u64,
}

impl CompositeKey {
    pub fn new(shard: ShardId, sequence: u64) -> Self {
        Self { shard, sequence }
    }

    /// Parses the canonical textual form of a key.
    ///
    /// Only the form produced by [`Display`](fmt::Display) is accepted: a
    /// sequence with leading zeros or a zero sequence would not round-trip
    /// and is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() <= LABEL_WIDTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidKey(format!(
                "key must be at least {} digits, got '{text}'",
                LABEL_WIDTH + 1
            )));
        }

        let (label, sequence) = text.split_at(LABEL_WIDTH);
        if sequence.starts_with('0') {
            return Err(CoreError::InvalidKey(format!(
                "sequence must not have leading zeros: '{text}'"
            )));
        }

        let shard = ShardId::from_label(label)?;
        let sequence = sequence
            .parse()
            .map_err(|e| CoreError::InvalidKey(format!("invalid sequence in '{text}': {e}")))?;

        Ok(Self { shard, sequence })
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.shard, self.sequence)
    }
}
