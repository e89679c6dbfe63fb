use std::collections::HashSet;

use anyhow::{bail, Result};
use bitvec::vec::BitVec;
use log::{info, warn};

use crate::{
    disk_format::block::{Block, BlockNumber, NO_BLOCK, ROOT_BLOCK},
    storage::BlockStore,
};

use super::Jfs;

/// The outcome of a successful [`Jfs::check_filesystem`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Directories reachable from the root, including the root.
    pub directories: usize,
    pub files: usize,
    pub data_blocks: usize,
    /// Blocks marked as allocated that nothing references.
    pub leaked: Vec<BlockNumber>,
}

impl<S: BlockStore> Jfs<S> {
    /// Checks the filesystem for consistency. Performs a depth-first traversal of the directory
    /// tree starting at the root, regardless of the current directory.
    ///
    /// Structural problems are errors. Allocated blocks that are not part of the tree are only
    /// reported.
    pub fn check_filesystem(&self) -> Result<CheckReport> {
        let mut report = CheckReport::default();
        let mut reached: BitVec = BitVec::repeat(false, self.store.num_blocks());

        self.claim_block(&mut reached, ROOT_BLOCK)?;
        let mut queue = vec![ROOT_BLOCK];

        while let Some(block_number) = queue.pop() {
            match self.read_block(block_number)? {
                Block::Directory(node) => {
                    report.directories += 1;

                    if node.len() > self.geometry.max_dir_entries {
                        bail!(
                            "directory in block {block_number} has {} entries",
                            node.len()
                        );
                    }

                    let mut names = HashSet::new();

                    for entry in node.entries() {
                        if entry.name.len() > self.geometry.max_name_length {
                            bail!("entry name is too long: {}", entry.name);
                        }

                        if !names.insert(entry.name.as_str()) {
                            bail!("directory contains duplicate entry: {}", entry.name);
                        }

                        self.claim_block(&mut reached, entry.target)?;
                        queue.push(entry.target);
                    }
                }
                Block::File(inode) => {
                    report.files += 1;

                    let size = inode.file_size as usize;
                    if size > self.geometry.max_file_size {
                        bail!("size in inode is greater than the maximum valid file size");
                    }

                    if inode.data_blocks.len() > self.geometry.max_data_blocks {
                        bail!(
                            "inode in block {block_number} lists {} data blocks",
                            inode.data_blocks.len()
                        );
                    }

                    let data_blocks = self.file_blocks(block_number, &inode)?;
                    for data_block in data_blocks {
                        self.claim_block(&mut reached, data_block)?;
                        report.data_blocks += 1;
                    }
                }
            }
        }

        for block_number in ROOT_BLOCK + 1..self.store.num_blocks() as BlockNumber {
            if self.store.is_allocated(block_number) && !reached[block_number as usize] {
                warn!("[block #{block_number}] allocated but unreferenced");
                report.leaked.push(block_number);
            }
        }

        info!(
            "checked {} directories, {} files, {} data blocks",
            report.directories, report.files, report.data_blocks
        );

        Ok(report)
    }

    /// Records that `block_number` is referenced, which may happen only once per block.
    fn claim_block(&self, reached: &mut BitVec, block_number: BlockNumber) -> Result<()> {
        if block_number == NO_BLOCK {
            bail!("reference to block {NO_BLOCK}");
        }

        if block_number as usize >= reached.len() {
            bail!("invalid block number: {block_number}");
        }

        if !self.store.is_allocated(block_number) {
            bail!("block {block_number} is referenced but free");
        }

        if reached[block_number as usize] {
            bail!("block {block_number} is referenced more than once");
        }

        reached.set(block_number as usize, true);
        Ok(())
    }
}
