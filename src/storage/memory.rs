use anyhow::{bail, ensure, Result};

use crate::disk_format::block::{BlockNumber, NO_BLOCK};

use super::{bitmap::BlockBitmap, block_store::BlockStore};

/// A block store held entirely in memory.
///
/// Blocks start out zeroed, so block 1 is an empty root directory from the start.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    block_len: usize,
    /// The blocks, back to back.
    data: Vec<u8>,
    bitmap: BlockBitmap,
}

impl MemoryStore {
    /// Constructs a new [`MemoryStore`] with `num_blocks` blocks of `block_len` bytes.
    pub fn new(block_len: usize, num_blocks: usize) -> Result<Self> {
        ensure!(block_len > 0, "blocks must be at least one byte long");

        Ok(MemoryStore {
            block_len,
            data: vec![0; block_len * num_blocks],
            bitmap: BlockBitmap::new(num_blocks)?,
        })
    }

    fn block_range(&self, block_number: BlockNumber) -> Result<std::ops::Range<usize>> {
        if block_number == NO_BLOCK {
            bail!("block {NO_BLOCK} is reserved");
        }

        if block_number as usize >= self.bitmap.len() {
            bail!("block number out of bounds: {block_number}");
        }

        let start = block_number as usize * self.block_len;
        Ok(start..start + self.block_len)
    }
}

impl BlockStore for MemoryStore {
    fn block_len(&self) -> usize {
        self.block_len
    }

    fn num_blocks(&self) -> usize {
        self.bitmap.len()
    }

    fn num_free_blocks(&self) -> usize {
        self.bitmap.num_free()
    }

    fn is_allocated(&self, block_number: BlockNumber) -> bool {
        self.bitmap.is_allocated(block_number)
    }

    fn read_block(&self, block_number: BlockNumber) -> Result<Vec<u8>> {
        let range = self.block_range(block_number)?;
        Ok(self.data[range].to_vec())
    }

    fn write_block(&mut self, block_number: BlockNumber, block: &[u8]) -> Result<()> {
        ensure!(
            block.len() == self.block_len,
            "block is {} bytes long, expected {}",
            block.len(),
            self.block_len
        );

        let range = self.block_range(block_number)?;
        self.data[range].copy_from_slice(block);

        Ok(())
    }

    fn allocate_block(&mut self) -> Option<BlockNumber> {
        self.bitmap.allocate()
    }

    fn release_block(&mut self, block_number: BlockNumber) -> Result<()> {
        self.bitmap.release(block_number)
    }
}

#[cfg(test)]
mod tests {
    use crate::disk_format::block::ROOT_BLOCK;

    use super::*;

    #[test]
    fn test_blocks_start_zeroed() {
        let store = MemoryStore::new(16, 4).unwrap();

        assert_eq!(store.read_block(ROOT_BLOCK).unwrap(), [0; 16]);
        assert_eq!(store.read_block(3).unwrap(), [0; 16]);
    }

    #[test]
    fn test_write_then_read() {
        let mut store = MemoryStore::new(4, 4).unwrap();
        store.write_block(2, &[1, 2, 3, 4]).unwrap();

        assert_eq!(store.read_block(2).unwrap(), [1, 2, 3, 4]);
        assert_eq!(store.read_block(3).unwrap(), [0; 4]);
    }

    #[test]
    fn test_write_wrong_length() {
        let mut store = MemoryStore::new(4, 4).unwrap();

        assert!(store.write_block(2, &[1, 2, 3]).is_err());
        assert!(store.write_block(2, &[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_out_of_bounds_block() {
        let mut store = MemoryStore::new(4, 4).unwrap();

        assert!(store.read_block(3).is_ok());
        assert!(store.read_block(4).is_err());
        assert!(store.write_block(4, &[0; 4]).is_err());
    }

    #[test]
    fn test_block_zero_is_reserved() {
        let mut store = MemoryStore::new(4, 4).unwrap();

        assert!(store.read_block(NO_BLOCK).is_err());
        assert!(store.write_block(NO_BLOCK, &[0; 4]).is_err());
        assert!(store.release_block(NO_BLOCK).is_err());
    }

    #[test]
    fn test_allocation_accounting() {
        let mut store = MemoryStore::new(4, 5).unwrap();
        assert_eq!(store.num_free_blocks(), 3);

        let block = store.allocate_block().unwrap();
        assert!(store.is_allocated(block));
        assert_eq!(store.num_free_blocks(), 2);

        store.release_block(block).unwrap();
        assert!(!store.is_allocated(block));
        assert_eq!(store.num_free_blocks(), 3);
    }
}
