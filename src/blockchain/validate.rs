use thiserror::Error;

use super::{Block, codec};

/// First invariant a candidate block violates against its parent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Invalid {
    #[error("index {got} does not follow parent index {parent}")]
    Index { parent: u64, got: u64 },

    #[error("prevHash {got} does not match parent hash {expected}")]
    PrevHash { expected: String, got: String },

    #[error("hash {got} does not match block contents (expected {expected})")]
    Hash { expected: String, got: String },

    #[error("declared difficulty {declared} is below the required {required}")]
    DifficultyTooLow { declared: u32, required: u32 },

    #[error("hash {hash} lacks {difficulty} leading zeros")]
    Difficulty { hash: String, difficulty: u32 },
}

/// Whole-chain consistency failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainInvalid {
    #[error("chain is empty")]
    Empty,

    #[error("block 0 is not a well-formed genesis block")]
    Genesis,

    #[error("block at position {position}: {reason}")]
    Block { position: usize, reason: Invalid },
}

/// Check `candidate` against `parent`, in order: index, linkage, hash,
/// proof-of-work. `required` is the node's difficulty; a block may declare
/// more but never less. Stops at the first failure.
pub fn validate(candidate: &Block, parent: &Block, required: u32) -> Result<(), Invalid> {
    if parent.index.checked_add(1) != Some(candidate.index) {
        return Err(Invalid::Index {
            parent: parent.index,
            got: candidate.index,
        });
    }
    if candidate.prev_hash != parent.hash {
        return Err(Invalid::PrevHash {
            expected: parent.hash.clone(),
            got: candidate.prev_hash.clone(),
        });
    }
    let expected = codec::hash_block(candidate);
    if candidate.hash != expected {
        return Err(Invalid::Hash {
            expected,
            got: candidate.hash.clone(),
        });
    }
    if candidate.difficulty < required {
        return Err(Invalid::DifficultyTooLow {
            declared: candidate.difficulty,
            required,
        });
    }
    if !codec::meets_difficulty(&candidate.hash, candidate.difficulty) {
        return Err(Invalid::Difficulty {
            hash: candidate.hash.clone(),
            difficulty: candidate.difficulty,
        });
    }
    Ok(())
}

#[cfg(test)]
pub fn is_valid(candidate: &Block, parent: &Block, required: u32) -> bool {
    validate(candidate, parent, required).is_ok()
}

/// Validate the entire chain: genesis shape, then every link at the
/// `required` difficulty.
pub fn validate_chain(blocks: &[Block], required: u32) -> Result<(), ChainInvalid> {
    let genesis = blocks.first().ok_or(ChainInvalid::Empty)?;
    if !genesis.is_genesis() || genesis.hash != genesis.compute_hash() {
        return Err(ChainInvalid::Genesis);
    }
    for (position, pair) in blocks.windows(2).enumerate() {
        validate(&pair[1], &pair[0], required).map_err(|reason| ChainInvalid::Block {
            position: position + 1,
            reason,
        })?;
    }
    Ok(())
}
