use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::codec;

/// A single immutable record in the chain, linked to its parent by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Creation time, free-form text. Never parsed.
    pub timestamp: String,
    #[serde(rename = "BPM")]
    pub measurement: i64,
    /// Required leading `'0'` hex digits in `hash` (0 = no proof-of-work).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub difficulty: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nonce: String,
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    pub hash: String,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis() -> Self {
        Self::genesis_at(Utc::now().to_string())
    }

    pub fn genesis_at(timestamp: String) -> Self {
        let mut block = Self {
            index: 0,
            timestamp,
            measurement: 0,
            difficulty: 0,
            nonce: String::new(),
            prev_hash: String::new(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Hash of this block's canonical fields (excluding `hash` itself).
    pub fn compute_hash(&self) -> String {
        codec::hash_block(self)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash.is_empty()
    }
}
