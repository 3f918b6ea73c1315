use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, trace};

use super::{Block, codec};
use crate::error::ChainError;

/// Shared stop signal for a running nonce search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Guard that raises the flag when dropped.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

/// Raises its flag on drop, so a search running on the blocking pool stops
/// once the async task that started it goes away.
#[derive(Debug)]
pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Builds candidate blocks on top of a parent. Never touches chain state.
#[derive(Debug, Clone)]
pub struct BlockFactory {
    difficulty: u32,
    /// Pause after each failed attempt.
    throttle: Duration,
}

impl BlockFactory {
    pub fn new(difficulty: u32, throttle: Duration) -> Self {
        Self {
            difficulty,
            throttle,
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Build a block extending `parent`, stamped with the current time.
    pub fn build(
        &self,
        parent: &Block,
        measurement: i64,
        cancel: &CancelFlag,
    ) -> Result<Block, ChainError> {
        self.build_at(parent, measurement, Utc::now().to_string(), cancel)
    }

    /// Build with an explicit timestamp. With difficulty 0 the hash is
    /// computed once; otherwise nonces 0, 1, 2, ... (hex) are tried in order
    /// until the hash has `difficulty` leading zeros or `cancel` is raised.
    pub fn build_at(
        &self,
        parent: &Block,
        measurement: i64,
        timestamp: String,
        cancel: &CancelFlag,
    ) -> Result<Block, ChainError> {
        let mut block = Block {
            index: parent.index.saturating_add(1),
            timestamp,
            measurement,
            difficulty: self.difficulty,
            nonce: String::new(),
            prev_hash: parent.hash.clone(),
            hash: String::new(),
        };

        if self.difficulty == 0 {
            block.hash = block.compute_hash();
            return Ok(block);
        }

        let mut attempt: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                debug!("search for block #{} cancelled after {attempt} attempts", block.index);
                return Err(ChainError::Cancelled);
            }
            block.nonce = codec::nonce_for(attempt);
            let hash = block.compute_hash();
            if codec::meets_difficulty(&hash, self.difficulty) {
                debug!(
                    "MINER - block #{} sealed: hash={hash} nonce={}",
                    block.index, block.nonce
                );
                block.hash = hash;
                return Ok(block);
            }
            trace!("{hash} do more work!");
            attempt = attempt.wrapping_add(1);
            if !self.throttle.is_zero() {
                thread::sleep(self.throttle);
            }
        }
    }
}
