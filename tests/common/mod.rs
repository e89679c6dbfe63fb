#![allow(dead_code)]

use std::cell::Cell;
use std::path::PathBuf;

use anyhow::{bail, Result};
use jfs::{
    disk_format::{block::BlockNumber, geometry::Geometry},
    jfs::Jfs,
    storage::{BlockStore, MemoryStore},
};

pub fn tiny_geometry() -> Geometry {
    Geometry {
        block_size: 4,
        max_name_length: 8,
        max_dir_entries: 4,
        max_data_blocks: 4,
        max_file_size: 16,
    }
}

pub fn memory_jfs(geometry: Geometry, num_blocks: usize) -> Jfs<MemoryStore> {
    let store = MemoryStore::new(geometry.block_len().unwrap(), num_blocks).unwrap();
    Jfs::format(store, geometry).unwrap()
}

/// A [`MemoryStore`] whose writes start failing once a budget runs out.
pub struct FaultyStore {
    inner: MemoryStore,
    writes_left: Cell<Option<usize>>,
}

impl FaultyStore {
    pub fn new(block_len: usize, num_blocks: usize) -> Self {
        FaultyStore {
            inner: MemoryStore::new(block_len, num_blocks).unwrap(),
            writes_left: Cell::new(None),
        }
    }

    /// Lets `writes` more block writes succeed, then fails every write after them.
    pub fn fail_after(&self, writes: usize) {
        self.writes_left.set(Some(writes));
    }

    pub fn heal(&self) {
        self.writes_left.set(None);
    }
}

impl BlockStore for FaultyStore {
    fn block_len(&self) -> usize {
        self.inner.block_len()
    }

    fn num_blocks(&self) -> usize {
        self.inner.num_blocks()
    }

    fn num_free_blocks(&self) -> usize {
        self.inner.num_free_blocks()
    }

    fn is_allocated(&self, block_number: BlockNumber) -> bool {
        self.inner.is_allocated(block_number)
    }

    fn read_block(&self, block_number: BlockNumber) -> Result<Vec<u8>> {
        self.inner.read_block(block_number)
    }

    fn write_block(&mut self, block_number: BlockNumber, block: &[u8]) -> Result<()> {
        match self.writes_left.get() {
            Some(0) => bail!("injected write failure for block {block_number}"),
            Some(n) => self.writes_left.set(Some(n - 1)),
            None => {}
        }

        self.inner.write_block(block_number, block)
    }

    fn allocate_block(&mut self) -> Option<BlockNumber> {
        self.inner.allocate_block()
    }

    fn release_block(&mut self, block_number: BlockNumber) -> Result<()> {
        self.inner.release_block(block_number)
    }
}

pub fn faulty_jfs(geometry: Geometry, num_blocks: usize) -> Jfs<FaultyStore> {
    let store = FaultyStore::new(geometry.block_len().unwrap(), num_blocks);
    Jfs::format(store, geometry).unwrap()
}

/// A disk image path under the system temp directory, removed on drop.
pub struct TempDisk(pub PathBuf);

impl TempDisk {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("jfs-it-{}-{name}.img", std::process::id()));
        TempDisk(path)
    }
}

impl Drop for TempDisk {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
