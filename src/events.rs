//! Fan-out of full-chain snapshots after every accepted change.

use log::{debug, warn};
use tokio::sync::broadcast;

use crate::blockchain::Block;

const UPDATES_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct ChainUpdates {
    tx: broadcast::Sender<Vec<Block>>,
}

impl ChainUpdates {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(UPDATES_CAPACITY);
        Self { tx }
    }

    /// Publish a snapshot. Having no subscriber is not an error.
    pub fn publish(&self, chain: Vec<Block>) {
        let _ = self.tx.send(chain);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Block>> {
        self.tx.subscribe()
    }
}

impl Default for ChainUpdates {
    fn default() -> Self {
        Self::new()
    }
}

/// Dump every published chain to the log until all senders are gone.
pub async fn run_dump(mut rx: broadcast::Receiver<Vec<Block>>) {
    loop {
        match rx.recv().await {
            Ok(chain) => debug!("chain updated ({} blocks): {chain:#?}", chain.len()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("chain dump lagging, skipped {skipped} snapshots");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_published_chains() {
        let updates = ChainUpdates::new();
        let mut rx = updates.subscribe();
        let chain = vec![Block::genesis_at("t0".into())];
        updates.publish(chain.clone());
        assert_eq!(rx.recv().await.unwrap(), chain);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        ChainUpdates::new().publish(Vec::new());
    }

    #[tokio::test]
    async fn dump_ends_when_sender_dropped() {
        let updates = ChainUpdates::new();
        let rx = updates.subscribe();
        updates.publish(vec![Block::genesis_at("t0".into())]);
        drop(updates);
        run_dump(rx).await;
    }
}
