use anyhow::{ensure, Context, Result};
use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::{directory_entry::DirectoryNode, inode::Inode};

// block numbers are stored as `u32`s on the disk
pub type BlockNumber = u32;

/// The block number that means "no block".
pub const NO_BLOCK: BlockNumber = 0;

/// The block number of the root directory.
pub const ROOT_BLOCK: BlockNumber = 1;

/// The tag stored in the first byte of every metadata block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum BlockTag {
    /// The block holds a [`DirectoryNode`].
    Directory = 0,
    /// The block holds the [`Inode`] of a regular file.
    File = 1,
}

/// A metadata block: either a directory node or a file's inode.
///
/// The tag is the only way to tell the two apart. An all-zero block decodes as an empty
/// directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Directory(DirectoryNode),
    File(Inode),
}

impl Block {
    pub fn tag(&self) -> BlockTag {
        match self {
            Block::Directory(_) => BlockTag::Directory,
            Block::File(_) => BlockTag::File,
        }
    }

    /// Serializes the block and pads it with zeros to `block_len` bytes.
    pub fn encode(&self, block_len: usize) -> Result<Vec<u8>> {
        let mut bytes = bincode::serialize(&self.tag()).context("serializing block tag")?;

        match self {
            Block::Directory(node) => append_serialized(&mut bytes, node)?,
            Block::File(inode) => append_serialized(&mut bytes, inode)?,
        }

        ensure!(
            bytes.len() <= block_len,
            "{:?} block needs {} bytes but blocks are {block_len} bytes long",
            self.tag(),
            bytes.len()
        );

        bytes.resize(block_len, 0);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Block> {
        let tag: BlockTag = bincode::deserialize(bytes).context("parsing block tag")?;
        let payload = &bytes[bincode::serialized_size(&tag)? as usize..];

        let block = match tag {
            BlockTag::Directory => Block::Directory(
                bincode::deserialize(payload).context("parsing directory node")?,
            ),
            BlockTag::File => Block::File(bincode::deserialize(payload).context("parsing inode")?),
        };

        Ok(block)
    }

    /// The number of bytes the block occupies before padding.
    pub fn encoded_len(&self) -> Result<usize> {
        let payload_len = match self {
            Block::Directory(node) => bincode::serialized_size(node),
            Block::File(inode) => bincode::serialized_size(inode),
        }
        .context("sizing block payload")?;
        let tag_len = bincode::serialized_size(&self.tag()).context("sizing block tag")?;

        Ok((tag_len + payload_len) as usize)
    }
}

fn append_serialized<T: Serialize>(bytes: &mut Vec<u8>, value: &T) -> Result<()> {
    bincode::serialize_into(bytes, value).context("serializing block payload")
}
