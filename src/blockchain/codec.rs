use sha2::{Digest, Sha256};

use super::Block;

/// Canonical preimage of a block: index, timestamp, measurement, previous
/// hash and nonce concatenated without separators. Changing the order or the
/// textual encoding invalidates every hash already in a chain.
pub fn canonicalize(block: &Block) -> Vec<u8> {
    format!(
        "{}{}{}{}{}",
        block.index, block.timestamp, block.measurement, block.prev_hash, block.nonce
    )
    .into_bytes()
}

/// SHA-256 of `bytes`, lowercase hex (64 chars).
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn hash_block(block: &Block) -> String {
    digest(&canonicalize(block))
}

/// True when the first `difficulty` characters of `hash` are all `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let n = difficulty as usize;
    hash.len() >= n && hash.bytes().take(n).all(|c| c == b'0')
}

/// Nonce text for the `attempt`-th try: unpadded lowercase hex.
pub fn nonce_for(attempt: u64) -> String {
    format!("{attempt:x}")
}
