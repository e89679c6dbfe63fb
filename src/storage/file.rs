use std::fs::File;
use std::os::unix::prelude::FileExt;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::disk_format::block::{BlockNumber, NO_BLOCK, ROOT_BLOCK};

use super::{bitmap::BlockBitmap, block_store::BlockStore};

/// Identifies a jfs disk image.
const STORE_MAGIC: u32 = 0x4a46_5331; // "JFS1"

/// The number of bytes before the variable-length part of the header.
const HEADER_PREFIX_LEN: usize = 12;

/// The contents of block 0 of a disk image.
#[derive(Serialize, Deserialize)]
struct StoreHeader {
    magic: u32,
    block_len: u32,
    num_blocks: u32,
    /// The allocation bitmap, as written by [`BlockBitmap::to_bytes`].
    bitmap: Vec<u8>,
}

/// A block store backed by a disk image file.
///
/// Block 0 of the image holds the header and the allocation bitmap. The bitmap is kept in memory
/// while mounted and written back by [`FileBackedStore::sync`] and [`BlockStore::unmount`].
pub struct FileBackedStore {
    file: File,
    block_len: usize,
    bitmap: BlockBitmap,
}

impl FileBackedStore {
    /// Creates (or truncates) a disk image at `path` and formats it.
    ///
    /// Every block starts out zeroed, so block 1 holds an empty root directory.
    pub fn create(path: impl AsRef<Path>, block_len: usize, num_blocks: u32) -> Result<Self> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("unable to create disk file {}", path.display()))?;

        file.set_len(block_len as u64 * num_blocks as u64)
            .context("sizing disk file")?;

        let store = FileBackedStore {
            file,
            block_len,
            bitmap: BlockBitmap::new(num_blocks as usize)?,
        };
        store.sync()?;

        info!(
            "formatted {} ({num_blocks} blocks of {block_len} bytes)",
            path.display()
        );

        Ok(store)
    }

    /// Opens an existing disk image in read-write mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("unable to open disk file {}", path.display()))?;

        let mut prefix = [0; HEADER_PREFIX_LEN];
        file.read_exact_at(&mut prefix, 0)
            .context("reading disk header")?;

        let (magic, block_len, num_blocks): (u32, u32, u32) =
            bincode::deserialize(&prefix).context("parsing disk header")?;

        if magic != STORE_MAGIC {
            bail!("{} is not a jfs disk image", path.display());
        }

        let block_len = block_len as usize;
        ensure!(block_len > HEADER_PREFIX_LEN, "invalid block length: {block_len}");

        ensure!(num_blocks > ROOT_BLOCK, "disk header lists {num_blocks} blocks");

        let expected_len = block_len as u64 * num_blocks as u64;
        let actual_len = file.metadata()?.len();
        ensure!(
            actual_len >= expected_len,
            "disk file is {actual_len} bytes long, expected {expected_len}"
        );

        let mut header_block = vec![0; block_len];
        file.read_exact_at(&mut header_block, 0)
            .context("reading disk header")?;

        let header: StoreHeader =
            bincode::deserialize(&header_block).context("parsing disk header")?;
        let bitmap = BlockBitmap::from_bytes(header.bitmap, num_blocks as usize)?;

        info!("{num_blocks} total blocks");
        info!("{} free blocks", bitmap.num_free());

        Ok(FileBackedStore {
            file,
            block_len,
            bitmap,
        })
    }

    /// Writes the header and allocation bitmap to block 0 and flushes the file.
    pub fn sync(&self) -> Result<()> {
        let header = StoreHeader {
            magic: STORE_MAGIC,
            block_len: self.block_len as u32,
            num_blocks: self.bitmap.len() as u32,
            bitmap: self.bitmap.to_bytes(),
        };

        let mut block = bincode::serialize(&header).context("serializing disk header")?;
        ensure!(
            block.len() <= self.block_len,
            "allocation bitmap for {} blocks does not fit in one block",
            self.bitmap.len()
        );
        block.resize(self.block_len, 0);

        self.file
            .write_all_at(&block, 0)
            .context("writing disk header")?;
        self.file.sync_all().context("flushing disk file")?;

        Ok(())
    }

    fn position(&self, block_number: BlockNumber) -> Result<u64> {
        if block_number == NO_BLOCK {
            bail!("block {NO_BLOCK} holds the disk header");
        }

        if block_number as usize >= self.bitmap.len() {
            bail!("block number out of bounds: {block_number}");
        }

        Ok(block_number as u64 * self.block_len as u64)
    }
}

impl BlockStore for FileBackedStore {
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
        let position = self.position(block_number)?;
        let mut buf = vec![0; self.block_len];

        self.file
            .read_exact_at(&mut buf, position)
            .with_context(|| format!("reading block {block_number}"))?;

        Ok(buf)
    }

    fn write_block(&mut self, block_number: BlockNumber, block: &[u8]) -> Result<()> {
        ensure!(
            block.len() == self.block_len,
            "block is {} bytes long, expected {}",
            block.len(),
            self.block_len
        );

        let position = self.position(block_number)?;

        self.file
            .write_all_at(block, position)
            .with_context(|| format!("writing block {block_number}"))?;

        Ok(())
    }

    fn allocate_block(&mut self) -> Option<BlockNumber> {
        self.bitmap.allocate()
    }

    fn release_block(&mut self, block_number: BlockNumber) -> Result<()> {
        self.bitmap.release(block_number)
    }

    fn unmount(self) -> Result<()> {
        self.sync()
    }
}
