use chrono::{NaiveDateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::compact;
use crate::encoding::hash_canonical;
use crate::error::{CompactError, RetargetError};
use crate::transaction::Tx;

/// `previous_hash` of the first block of a proof-of-work chain.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Block timestamps: UTC with microseconds.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current time as a block timestamp string.
pub fn now_block_time() -> String {
    Utc::now().naive_utc().format(TIME_FORMAT).to_string()
}

/// Parse a block timestamp; the fractional part is optional.
pub fn parse_block_time(time: &str) -> Result<NaiveDateTime, RetargetError> {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|_| RetargetError::InvalidTime(time.to_string()))
}

/// A proof-of-work block. `hash` is only present once the block is sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub previous_hash: String,
    pub index: u64,
    pub transactions: Vec<Tx>,
    pub bits: u32,
    pub nonce: u64, // Proof-of-Work nonce
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Block {
    /// Create a new block (not mined yet), stamped with the current time.
    pub fn new(index: u64, previous_hash: String, bits: u32) -> Self {
        Self {
            previous_hash,
            index,
            transactions: Vec::new(),
            bits,
            nonce: 0,
            time: now_block_time(),
            hash: None,
        }
    }

    /// SHA-256 over the canonical JSON of every field except `hash`.
    pub fn compute_hash(&self) -> String {
        let mut preimage = serde_json::to_value(self).expect("serialize block");
        if let Some(fields) = preimage.as_object_mut() {
            fields.remove("hash");
        }
        hash_canonical(&preimage)
    }

    pub fn target(&self) -> Result<BigUint, CompactError> {
        compact::decode(self.bits)
    }

    pub fn timestamp(&self) -> Result<NaiveDateTime, RetargetError> {
        parse_block_time(&self.time)
    }

    /// Validate that the stored hash matches the content and lies strictly
    /// below the target. (Does NOT validate chain linkage.)
    pub fn is_valid(&self) -> bool {
        let Some(hash) = &self.hash else {
            return false;
        };
        if *hash != self.compute_hash() {
            return false;
        }
        match (self.target(), compact::hash_value(hash)) {
            (Ok(target), Some(value)) => value < target,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_the_hash_field() {
        let mut b = Block::new(3, "prev".into(), 0x1EFF_FFFF);
        let before = b.compute_hash();
        b.hash = Some("whatever".into());
        assert_eq!(before, b.compute_hash());
    }

    #[test]
    fn hash_covers_nonce_and_bits() {
        let mut b = Block::new(1, "prev".into(), 0x1EFF_FFFF);
        let h0 = b.compute_hash();
        b.nonce += 1;
        let h1 = b.compute_hash();
        assert_ne!(h0, h1);
        b.bits = 0x1DFF_FFFF;
        assert_ne!(h1, b.compute_hash());
    }

    #[test]
    fn unsealed_block_is_not_valid() {
        let b = Block::new(0, GENESIS_PREVIOUS_HASH.into(), 0x20FF_FFFF);
        assert!(!b.is_valid());
    }

    #[test]
    fn block_time_round_trips() {
        let b = Block::new(0, GENESIS_PREVIOUS_HASH.into(), 0x1EFF_FFFF);
        let parsed = b.timestamp().unwrap();
        assert_eq!(parsed.format(TIME_FORMAT).to_string(), b.time);
        assert!(parse_block_time("2020-01-01 10:00:00").is_ok());
        assert!(parse_block_time("yesterday").is_err());
    }

    #[test]
    fn serialized_block_omits_missing_hash() {
        let b = Block::new(0, GENESIS_PREVIOUS_HASH.into(), 0x1EFF_FFFF);
        let json = serde_json::to_value(&b).unwrap();
        assert!(json.get("hash").is_none());
        assert_eq!(json["bits"], 0x1EFF_FFFF);
    }
}
