use crate::error::{Error, Result};

use super::{
    block::{Block, NO_BLOCK},
    directory_entry::{DirectoryEntry, DirectoryNode, EntryName},
    inode::Inode,
};

/// The number of content bytes held by a data block.
pub const BLOCK_SIZE: usize = 4096;

/// The maximum supported size of a file or directory name, in bytes.
pub const MAX_NAME_LENGTH: usize = 64;

/// The maximum number of entries in a single directory.
pub const MAX_DIR_ENTRIES: usize = 48;

/// The maximum number of data blocks referenced by an inode.
pub const MAX_DATA_BLOCKS: usize = 512;

/// The maximum size of a file in bytes.
pub const MAX_FILE_SIZE: usize = MAX_DATA_BLOCKS * BLOCK_SIZE;
const_assert!(MAX_FILE_SIZE <= MAX_DATA_BLOCKS * BLOCK_SIZE);
const_assert!(MAX_FILE_SIZE <= u32::MAX as usize);

/// The number of blocks in a newly formatted disk image.
pub const DEFAULT_NUM_BLOCKS: u32 = 4096;

/// The size limits a filesystem is mounted with.
///
/// A geometry is chosen when a session is mounted and stays fixed for the lifetime of that
/// session. [`Geometry::default`] uses the crate-wide constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// See [`BLOCK_SIZE`].
    pub block_size: usize,
    /// See [`MAX_NAME_LENGTH`].
    pub max_name_length: usize,
    /// See [`MAX_DIR_ENTRIES`].
    pub max_dir_entries: usize,
    /// See [`MAX_DATA_BLOCKS`].
    pub max_data_blocks: usize,
    /// See [`MAX_FILE_SIZE`].
    pub max_file_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            max_name_length: MAX_NAME_LENGTH,
            max_dir_entries: MAX_DIR_ENTRIES,
            max_data_blocks: MAX_DATA_BLOCKS,
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl Geometry {
    /// Checks that the limits are usable together.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidGeometry("block size must be non-zero"));
        }

        if self.max_dir_entries == 0 {
            return Err(Error::InvalidGeometry(
                "directories must hold at least one entry",
            ));
        }

        if self.max_data_blocks == 0 {
            return Err(Error::InvalidGeometry(
                "inodes must reference at least one data block",
            ));
        }

        let capacity = self.max_data_blocks.checked_mul(self.block_size);
        if capacity.map_or(true, |capacity| self.max_file_size > capacity) {
            return Err(Error::InvalidGeometry(
                "maximum file size exceeds the data block capacity of an inode",
            ));
        }

        if self.max_file_size > u32::MAX as usize {
            return Err(Error::InvalidGeometry(
                "maximum file size does not fit in an inode",
            ));
        }

        Ok(())
    }

    /// The number of bytes a block store must provide per block.
    ///
    /// This is the largest of the data block size, the size of a full directory node and the
    /// size of a full inode.
    pub fn block_len(&self) -> Result<usize> {
        Ok(self
            .block_size
            .max(self.max_directory_len()?)
            .max(self.max_inode_len()?))
    }

    /// The number of data blocks needed to hold `size` bytes.
    pub fn blocks_for(&self, size: usize) -> usize {
        size.div_ceil(self.block_size)
    }

    fn max_directory_len(&self) -> Result<usize> {
        let entry = DirectoryEntry {
            name: EntryName::from("x".repeat(self.max_name_length)),
            target: NO_BLOCK,
        };
        let node = DirectoryNode::from(vec![entry; self.max_dir_entries]);

        Ok(Block::Directory(node).encoded_len()?)
    }

    fn max_inode_len(&self) -> Result<usize> {
        let inode = Inode {
            file_size: self.max_file_size as u32,
            data_blocks: vec![NO_BLOCK; self.max_data_blocks],
        };

        Ok(Block::File(inode).encoded_len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_is_valid() {
        assert!(Geometry::default().validate().is_ok());
    }

    #[test]
    fn test_default_block_len_is_block_size() {
        assert_eq!(Geometry::default().block_len().unwrap(), BLOCK_SIZE);
    }

    #[test]
    fn test_small_block_size_grows_block_len() {
        let geometry = Geometry {
            block_size: 4,
            max_name_length: 8,
            max_dir_entries: 4,
            max_data_blocks: 8,
            max_file_size: 32,
        };

        assert!(geometry.validate().is_ok());
        assert!(geometry.block_len().unwrap() > 4);
    }

    #[test]
    fn test_oversized_max_file_size() {
        let geometry = Geometry {
            max_file_size: MAX_DATA_BLOCKS * BLOCK_SIZE + 1,
            ..Geometry::default()
        };

        assert!(matches!(
            geometry.validate(),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_zero_block_size() {
        let geometry = Geometry {
            block_size: 0,
            ..Geometry::default()
        };

        assert!(matches!(
            geometry.validate(),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_blocks_for() {
        let geometry = Geometry {
            block_size: 4,
            ..Geometry::default()
        };

        assert_eq!(geometry.blocks_for(0), 0);
        assert_eq!(geometry.blocks_for(1), 1);
        assert_eq!(geometry.blocks_for(4), 1);
        assert_eq!(geometry.blocks_for(6), 2);
    }
}
