use log::info;

use crate::{
    disk_format::{
        block::{Block, BlockTag},
        directory_entry::DirectoryNode,
    },
    error::{Error, Result},
    storage::BlockStore,
};

use super::{lookup, Jfs};

/// The names in a directory, split by kind, in entry order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

impl<S: BlockStore> Jfs<S> {
    /// Creates an empty subdirectory in the current directory.
    pub fn mkdir(&mut self, name: &str) -> Result<()> {
        let block_number = self.create_entry(name, Block::Directory(DirectoryNode::default()))?;
        info!("[block #{block_number}] created directory {name:?}");

        Ok(())
    }

    pub fn ls(&self) -> Result<Listing> {
        let dir = self.read_current_dir()?;
        let mut listing = Listing::default();

        for entry in dir.entries() {
            let names = match self.read_block(entry.target)?.tag() {
                BlockTag::Directory => &mut listing.directories,
                BlockTag::File => &mut listing.files,
            };

            names.push(entry.name.to_string());
        }

        Ok(listing)
    }

    /// Removes the empty subdirectory `name` from the current directory.
    pub fn rmdir(&mut self, name: &str) -> Result<()> {
        let mut dir = self.read_current_dir()?;
        let (index, entry) = lookup(&dir, name)?;
        let target = entry.target;

        if !self.read_directory(target)?.is_empty() {
            return Err(Error::NotEmpty);
        }

        // the entry goes first so that it never names a released block
        dir.remove(index);
        self.write_block(self.current_dir, &Block::Directory(dir))?;
        self.store.release_block(target)?;

        info!("[block #{target}] removed directory {name:?}");
        Ok(())
    }
}
