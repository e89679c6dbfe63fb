use anyhow::anyhow;
use log::{debug, info};

use crate::{
    disk_format::{
        block::{Block, BlockNumber},
        inode::Inode,
    },
    error::{Error, Result},
    storage::BlockStore,
};

use super::{lookup, pending::PendingBlocks, write_metadata, Jfs};

impl<S: BlockStore> Jfs<S> {
    /// Creates an empty file in the current directory.
    pub fn creat(&mut self, name: &str) -> Result<()> {
        let block_number = self.create_entry(name, Block::File(Inode::default()))?;
        info!("[block #{block_number}] created file {name:?}");

        Ok(())
    }

    /// Deletes the file `name` along with all of its data blocks.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let mut dir = self.read_current_dir()?;
        let (index, entry) = lookup(&dir, name)?;
        let inode_block = entry.target;

        let inode = self.read_inode(inode_block)?;
        let data_blocks = inode
            .populated_blocks(self.geometry.block_size)
            .collect::<Vec<_>>();

        // the entry goes first so that it never names a released block
        dir.remove(index);
        self.write_block(self.current_dir, &Block::Directory(dir))?;

        for &block_number in &data_blocks {
            self.store.release_block(block_number)?;
        }
        self.store.release_block(inode_block)?;

        info!(
            "[block #{inode_block}] removed file {name:?} ({} data blocks)",
            data_blocks.len()
        );
        Ok(())
    }

    /// Appends `data` to the file `name`.
    ///
    /// Either all of `data` is appended or, on error, the file is left exactly as it was.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let dir = self.read_current_dir()?;
        let (_, entry) = lookup(&dir, name)?;
        let inode_block = entry.target;
        let inode = self.read_inode(inode_block)?;

        let old_size = inode.file_size as usize;
        let new_size = old_size
            .checked_add(data.len())
            .filter(|size| *size <= self.geometry.max_file_size)
            .ok_or(Error::FileTooLarge)?;

        if data.is_empty() {
            return Ok(());
        }

        let mut data_blocks = self.file_blocks(inode_block, &inode)?;

        info!(
            "[block #{inode_block}] appending {} bytes to {name:?} (size = {old_size})",
            data.len()
        );

        let block_size = self.geometry.block_size;
        let tail_len = old_size % block_size;
        // index of the first data block this write produces
        let first_slot = old_size / block_size;

        // a partially filled last block is rewritten together with the new data
        let mut buffer = Vec::with_capacity(tail_len + data.len());
        let replaced_block = if tail_len > 0 {
            let last_block = data_blocks[first_slot];
            let contents = self.store.read_block(last_block)?;
            buffer.extend_from_slice(&contents[..tail_len]);

            Some(last_block)
        } else {
            None
        };
        buffer.extend_from_slice(data);

        let block_len = self.store.block_len();
        let mut pending = PendingBlocks::new(&mut self.store);

        for chunk in buffer.chunks(block_size) {
            let block_number = pending.allocate()?;

            let mut block = chunk.to_vec();
            block.resize(block_len, 0);
            pending.store().write_block(block_number, &block)?;
        }

        data_blocks.truncate(first_slot);
        data_blocks.extend_from_slice(pending.blocks());

        let updated = Inode {
            file_size: new_size as u32,
            data_blocks,
        };
        write_metadata(pending.store(), inode_block, &Block::File(updated))?;
        let new_blocks = pending.commit();

        if let Some(block_number) = replaced_block {
            self.store.release_block(block_number)?;
        }

        info!(
            "[block #{inode_block}] wrote {} bytes into {} new data blocks (size = {new_size})",
            buffer.len(),
            new_blocks.len()
        );
        Ok(())
    }

    /// Reads up to `max_bytes` bytes from the start of the file `name`.
    pub fn read(&self, name: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let dir = self.read_current_dir()?;
        let (_, entry) = lookup(&dir, name)?;
        let inode_block = entry.target;
        let inode = self.read_inode(inode_block)?;

        let len = (inode.file_size as usize).min(max_bytes);
        let block_size = self.geometry.block_size;

        let mut data = Vec::with_capacity(len);
        for block_number in self
            .file_blocks(inode_block, &inode)?
            .into_iter()
            .take(self.geometry.blocks_for(len))
        {
            let block = self.store.read_block(block_number)?;
            let chunk_len = (len - data.len()).min(block_size);

            data.extend_from_slice(&block[..chunk_len]);
        }

        debug!("[block #{inode_block}] read {len} bytes from {name:?}");
        Ok(data)
    }

    /// The data blocks of a file, checked against the file size.
    pub(super) fn file_blocks(
        &self,
        inode_block: BlockNumber,
        inode: &Inode,
    ) -> Result<Vec<BlockNumber>> {
        let block_size = self.geometry.block_size;
        let blocks = inode.populated_blocks(block_size).collect::<Vec<_>>();
        let expected = inode.num_data_blocks(block_size);

        if blocks.len() != expected {
            return Err(anyhow!(
                "inode in block {inode_block} holds {} data blocks for {} bytes",
                blocks.len(),
                inode.file_size
            )
            .into());
        }

        Ok(blocks)
    }
}
