use log::{debug, warn};

use crate::{
    disk_format::block::BlockNumber,
    error::{Error, Result},
    storage::BlockStore,
};

/// Blocks allocated by an operation that has not finished yet.
///
/// Dropping the guard releases every block it holds, so an early return leaves no block
/// allocated but unreferenced. [`PendingBlocks::commit`] hands the blocks over for good.
pub(super) struct PendingBlocks<'a, S: BlockStore> {
    store: &'a mut S,
    blocks: Vec<BlockNumber>,
}

impl<'a, S: BlockStore> PendingBlocks<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        PendingBlocks {
            store,
            blocks: vec![],
        }
    }

    pub fn allocate(&mut self) -> Result<BlockNumber> {
        let block_number = self.store.allocate_block().ok_or(Error::DiskFull)?;
        self.blocks.push(block_number);

        Ok(block_number)
    }

    pub fn store(&mut self) -> &mut S {
        &mut *self.store
    }

    /// The blocks allocated so far, in allocation order.
    pub fn blocks(&self) -> &[BlockNumber] {
        &self.blocks
    }

    pub fn commit(mut self) -> Vec<BlockNumber> {
        std::mem::take(&mut self.blocks)
    }
}

impl<S: BlockStore> Drop for PendingBlocks<'_, S> {
    fn drop(&mut self) {
        for block_number in self.blocks.drain(..) {
            match self.store.release_block(block_number) {
                Ok(()) => debug!("[block #{block_number}] released after failed operation"),
                Err(err) => warn!("[block #{block_number}] unable to release: {err:#}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_drop_releases_blocks() {
        let mut store = MemoryStore::new(8, 6).unwrap();

        {
            let mut pending = PendingBlocks::new(&mut store);
            pending.allocate().unwrap();
            pending.allocate().unwrap();
            assert_eq!(pending.store().num_free_blocks(), 2);
        }

        assert_eq!(store.num_free_blocks(), 4);
    }

    #[test]
    fn test_commit_keeps_blocks() {
        let mut store = MemoryStore::new(8, 6).unwrap();

        let mut pending = PendingBlocks::new(&mut store);
        let first = pending.allocate().unwrap();
        let second = pending.allocate().unwrap();
        assert_eq!(pending.commit(), [first, second]);

        assert_eq!(store.num_free_blocks(), 2);
        assert!(store.is_allocated(first));
        assert!(store.is_allocated(second));
    }

    #[test]
    fn test_exhaustion_is_disk_full() {
        let mut store = MemoryStore::new(8, 3).unwrap();
        let mut pending = PendingBlocks::new(&mut store);

        pending.allocate().unwrap();
        assert!(matches!(pending.allocate(), Err(Error::DiskFull)));
        drop(pending);

        assert_eq!(store.num_free_blocks(), 1);
    }
}
