use anyhow::{bail, ensure, Result};
use bitvec::prelude::{BitVec, Lsb0};

use crate::disk_format::block::{BlockNumber, NO_BLOCK, ROOT_BLOCK};

/// Tracks the allocation status of blocks.
/// A value of `true` represents "occupied".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockBitmap(BitVec<u8, Lsb0>);

impl BlockBitmap {
    /// A bitmap for `num_blocks` blocks with [`NO_BLOCK`] and [`ROOT_BLOCK`] reserved.
    pub fn new(num_blocks: usize) -> Result<Self> {
        ensure!(
            num_blocks > ROOT_BLOCK as usize,
            "a disk needs at least {} blocks",
            ROOT_BLOCK + 1
        );

        let mut bits = BitVec::repeat(false, num_blocks);
        bits.set(NO_BLOCK as usize, true);
        bits.set(ROOT_BLOCK as usize, true);

        Ok(BlockBitmap(bits))
    }

    /// Rebuilds a bitmap from the raw bytes produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: Vec<u8>, num_blocks: usize) -> Result<Self> {
        ensure!(
            num_blocks > ROOT_BLOCK as usize,
            "a disk needs at least {} blocks, found {num_blocks}",
            ROOT_BLOCK + 1
        );

        let mut bits = BitVec::from_vec(bytes);
        ensure!(
            bits.len() >= num_blocks,
            "bitmap holds {} bits, expected {num_blocks}",
            bits.len()
        );
        bits.truncate(num_blocks);

        ensure!(
            bits[NO_BLOCK as usize] && bits[ROOT_BLOCK as usize],
            "reserved blocks are marked as free"
        );

        Ok(BlockBitmap(bits))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_raw_slice().to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_allocated(&self, block_number: BlockNumber) -> bool {
        self.0
            .get(block_number as usize)
            .is_some_and(|occupied| *occupied)
    }

    pub fn num_free(&self) -> usize {
        self.0.count_zeros()
    }

    pub fn allocate(&mut self) -> Option<BlockNumber> {
        let assigned = self.0.first_zero();

        if let Some(block) = assigned {
            self.0.set(block, true);
        }

        assigned.map(|block| block as BlockNumber)
    }

    pub fn release(&mut self, block_number: BlockNumber) -> Result<()> {
        let index = block_number as usize;

        if index >= self.0.len() {
            bail!("block number out of bounds: {block_number}");
        }

        if block_number == NO_BLOCK || block_number == ROOT_BLOCK {
            bail!("block {block_number} is reserved");
        }

        if !self.0[index] {
            bail!("block {block_number} is already free");
        }

        self.0.set(index, false);
        Ok(())
    }
}
