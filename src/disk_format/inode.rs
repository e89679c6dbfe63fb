use serde::{Deserialize, Serialize};

use super::block::{BlockNumber, NO_BLOCK};

/// The metadata block of a regular file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    /// file size in bytes
    pub file_size: u32,
    /// block #s holding the file contents, in order
    pub data_blocks: Vec<BlockNumber>,
}

impl Inode {
    /// The number of data blocks needed to hold `file_size` bytes.
    pub fn num_data_blocks(&self, block_size: usize) -> usize {
        (self.file_size as usize).div_ceil(block_size)
    }

    /// The data blocks in use, stopping early at the first [`NO_BLOCK`] slot.
    pub fn populated_blocks(&self, block_size: usize) -> impl Iterator<Item = BlockNumber> + '_ {
        self.data_blocks
            .iter()
            .copied()
            .take(self.num_data_blocks(block_size))
            .take_while(|block| *block != NO_BLOCK)
    }
}
