use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Block, validate};
use crate::error::ChainError;

/// Result of an accepted append: the block and the chain right after it,
/// read in the same critical section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub block: Block,
    pub chain: Vec<Block>,
}

/// In-memory owner of the authoritative chain. Every mutation goes through
/// the single lock.
#[derive(Debug)]
pub struct ChainStore {
    chain: Mutex<Vec<Block>>,
    /// Minimum difficulty every appended block must declare and meet.
    difficulty: u32,
}

impl ChainStore {
    /// Initialize a store holding only `genesis`.
    pub fn new(genesis: Block, difficulty: u32) -> Self {
        Self {
            chain: Mutex::new(vec![genesis]),
            difficulty,
        }
    }

    /// A store with no genesis, to exercise `EmptyChain`.
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            chain: Mutex::new(Vec::new()),
            difficulty: 0,
        }
    }

    // The vec is only ever changed by a single push or a whole assignment,
    // so a poisoned guard still holds a consistent chain.
    fn lock(&self) -> MutexGuard<'_, Vec<Block>> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Return a copy of the last block in the chain.
    pub fn tip(&self) -> Result<Block, ChainError> {
        self.lock().last().cloned().ok_or(ChainError::EmptyChain)
    }

    /// Validate `candidate` against the tip and append it, both under the
    /// same lock acquisition. A candidate built on a tip that has since moved
    /// is rejected.
    pub fn try_append(&self, candidate: Block) -> Result<Appended, ChainError> {
        let mut chain = self.lock();
        let tip = chain.last().ok_or(ChainError::EmptyChain)?;
        validate::validate(&candidate, tip, self.difficulty)?;
        chain.push(candidate.clone());
        Ok(Appended {
            block: candidate,
            chain: chain.clone(),
        })
    }

    /// Replace the chain iff `candidate` is strictly longer. The candidate's
    /// internal consistency is NOT checked here; see `validate_chain`.
    pub fn try_replace(&self, candidate: Vec<Block>) -> bool {
        let mut chain = self.lock();
        if candidate.len() > chain.len() {
            *chain = candidate;
            true
        } else {
            false
        }
    }

    /// Owned, read-consistent copy of the chain.
    pub fn snapshot(&self) -> Vec<Block> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::blockchain::{BlockFactory, CancelFlag, Invalid};

    fn factory() -> BlockFactory {
        BlockFactory::new(0, Duration::ZERO)
    }

    fn store() -> ChainStore {
        ChainStore::new(Block::genesis_at("t0".into()), 0)
    }

    #[test]
    fn tip_of_empty_store_is_an_error() {
        assert_eq!(ChainStore::empty().tip(), Err(ChainError::EmptyChain));
        let b = Block::genesis_at("t0".into());
        assert_eq!(ChainStore::empty().try_append(b), Err(ChainError::EmptyChain));
    }

    #[test]
    fn append_extends_tip() {
        let s = store();
        let genesis = s.tip().unwrap();
        let b = factory().build(&genesis, 60, &CancelFlag::new()).unwrap();
        let appended = s.try_append(b.clone()).unwrap();
        assert_eq!(appended.block, b);
        assert_eq!(appended.chain, vec![genesis.clone(), b.clone()]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.tip().unwrap(), b);
        assert_eq!(s.snapshot(), vec![genesis, b]);
    }

    #[test]
    fn stale_candidate_is_rejected_without_mutation() {
        let s = store();
        let genesis = s.tip().unwrap();
        let first = factory().build(&genesis, 60, &CancelFlag::new()).unwrap();
        let second = factory().build(&genesis, 61, &CancelFlag::new()).unwrap();
        s.try_append(first).unwrap();
        let before = s.snapshot();

        let err = s.try_append(second).unwrap_err();
        assert!(matches!(err, ChainError::Rejected(Invalid::Index { .. })));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn concurrent_appends_on_same_tip_admit_one() {
        const N: usize = 16;
        let s = Arc::new(store());
        let genesis = s.tip().unwrap();
        let barrier = Arc::new(Barrier::new(N));

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let s = Arc::clone(&s);
                let barrier = Arc::clone(&barrier);
                let candidate = factory()
                    .build(&genesis, i as i64, &CancelFlag::new())
                    .unwrap();
                thread::spawn(move || {
                    barrier.wait();
                    s.try_append(candidate).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn concurrent_build_and_append_cycles_keep_chain_valid() {
        let s = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for j in 0..10 {
                        let tip = s.tip().unwrap();
                        let b = factory().build(&tip, i * 100 + j, &CancelFlag::new()).unwrap();
                        let _ = s.try_append(b);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(validate::validate_chain(&s.snapshot(), 0).is_ok());
    }

    #[test]
    fn append_enforces_store_difficulty() {
        let s = ChainStore::new(Block::genesis_at("t0".into()), 2);
        let genesis = s.tip().unwrap();
        let weak = factory().build(&genesis, 60, &CancelFlag::new()).unwrap();
        assert!(matches!(
            s.try_append(weak),
            Err(ChainError::Rejected(Invalid::DifficultyTooLow { required: 2, .. }))
        ));
        assert_eq!(s.len(), 1);

        let mined = BlockFactory::new(2, Duration::ZERO)
            .build(&genesis, 60, &CancelFlag::new())
            .unwrap();
        assert!(s.try_append(mined).is_ok());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn appended_chain_is_the_one_this_append_produced() {
        let s = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    for j in 0..10 {
                        let tip = s.tip().unwrap();
                        let b = factory().build(&tip, i * 100 + j, &CancelFlag::new()).unwrap();
                        if let Ok(appended) = s.try_append(b) {
                            seen.push(appended);
                        }
                    }
                    seen
                })
            })
            .collect();
        for h in handles {
            for appended in h.join().unwrap() {
                assert_eq!(appended.chain.last(), Some(&appended.block));
                assert_eq!(appended.chain.len() as u64, appended.block.index + 1);
            }
        }
    }

    #[test]
    fn replace_requires_strictly_longer_chain() {
        let s = store();
        let genesis = s.tip().unwrap();
        let b1 = factory().build(&genesis, 1, &CancelFlag::new()).unwrap();
        s.try_append(b1).unwrap();
        let before = s.snapshot();

        // equal length
        let other = Block::genesis_at("other".into());
        let o1 = factory().build(&other, 2, &CancelFlag::new()).unwrap();
        assert!(!s.try_replace(vec![other.clone(), o1.clone()]));
        assert_eq!(s.snapshot(), before);

        // shorter
        assert!(!s.try_replace(vec![other.clone()]));
        assert_eq!(s.snapshot(), before);

        // longer
        let o2 = factory().build(&o1, 3, &CancelFlag::new()).unwrap();
        let longer = vec![other, o1, o2];
        assert!(s.try_replace(longer.clone()));
        assert_eq!(s.snapshot(), longer);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let s = store();
        let mut snap = s.snapshot();
        snap.clear();
        assert_eq!(s.len(), 1);
    }
}
