pub mod block;
pub mod codec;
pub mod miner;
pub mod store;
pub mod validate;

pub use block::Block;
pub use miner::{BlockFactory, CancelFlag};
pub use store::{Appended, ChainStore};
pub use validate::{Invalid, validate_chain};

/// Highest meaningful difficulty: a SHA-256 hex digest has 64 characters.
pub const MAX_DIFFICULTY: u32 = 64;
