use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::blockchain::{Appended, Block, BlockFactory, CancelFlag, ChainStore, Invalid};
use crate::error::{ChainError, SubmitError};
use crate::events::ChainUpdates;

/// Handles shared by every HTTP request and peer session.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<ChainStore>,
    pub factory: BlockFactory,
    pub updates: ChainUpdates,
}

/// Outcome of submitting a measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Accepted(Block),
    /// The tip moved while the candidate was being built.
    Rejected { candidate: Block, reason: Invalid },
}

impl AppState {
    /// The factory mines at the store's difficulty, so every block it
    /// builds passes the store's validation.
    pub fn new(store: ChainStore, throttle: Duration) -> Self {
        let factory = BlockFactory::new(store.difficulty(), throttle);
        Self {
            store: Arc::new(store),
            factory,
            updates: ChainUpdates::new(),
        }
    }

    /// Build a block for `measurement` on the current tip and try to append
    /// it. The search runs on the blocking pool and is cancelled if this
    /// future is dropped.
    pub async fn submit(&self, measurement: i64) -> Result<Submission, SubmitError> {
        let parent = self.store.tip()?;
        let cancel = CancelFlag::new();
        let _guard = cancel.guard();
        let factory = self.factory.clone();
        let candidate =
            tokio::task::spawn_blocking(move || factory.build(&parent, measurement, &cancel))
                .await??;

        match self.store.try_append(candidate.clone()) {
            Ok(Appended { block, chain }) => {
                info!("accepted block #{} (BPM={}, hash={})", block.index, block.measurement, block.hash);
                self.updates.publish(chain);
                Ok(Submission::Accepted(block))
            }
            Err(ChainError::Rejected(reason)) => {
                warn!("rejected block #{}: {reason}", candidate.index);
                Ok(Submission::Rejected { candidate, reason })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the chain with `candidate` if it is longer, publishing on success.
    pub fn replace(&self, candidate: Vec<Block>) -> bool {
        let chain = candidate.clone();
        let replaced = self.store.try_replace(candidate);
        if replaced {
            info!("chain replaced, new length {}", chain.len());
            self.updates.publish(chain);
        }
        replaced
    }
}
