use anyhow::Result;

use crate::disk_format::block::BlockNumber;

/// Raw block storage underneath the filesystem.
///
/// Blocks are `block_len` bytes long and addressed by number. Block 0 is never handed out and
/// block 1 is reserved for the root directory.
pub trait BlockStore {
    /// The length of every block in bytes.
    fn block_len(&self) -> usize;

    /// The total number of blocks, including reserved ones.
    fn num_blocks(&self) -> usize;

    fn num_free_blocks(&self) -> usize;

    fn is_allocated(&self, block_number: BlockNumber) -> bool;

    fn read_block(&self, block_number: BlockNumber) -> Result<Vec<u8>>;

    /// Overwrites a whole block. `block` must be exactly `block_len` bytes long.
    fn write_block(&mut self, block_number: BlockNumber, block: &[u8]) -> Result<()>;

    /// Marks a free block as occupied. Returns `None` when the store is exhausted.
    fn allocate_block(&mut self) -> Option<BlockNumber>;

    /// Marks an occupied block as free. Releasing a free or reserved block is an error.
    fn release_block(&mut self, block_number: BlockNumber) -> Result<()>;

    /// Releases the underlying storage.
    fn unmount(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
