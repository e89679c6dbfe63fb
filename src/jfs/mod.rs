use anyhow::{anyhow, Context};
use log::{debug, info};

use crate::{
    disk_format::{
        block::{Block, BlockNumber, ROOT_BLOCK},
        directory_entry::{DirectoryEntry, DirectoryNode, EntryName},
        geometry::Geometry,
        inode::Inode,
    },
    error::{Error, Result},
    storage::BlockStore,
};

use self::pending::PendingBlocks;

/// Filesystem consistency checks.
mod check;
/// Directory operations.
mod directory;
/// Regular file operations.
mod file;
/// Rollback of blocks allocated by a failed operation.
mod pending;

pub use check::CheckReport;
pub use directory::Listing;

/// A mounted filesystem.
///
/// Names passed to operations are single path components resolved against the current
/// directory. Nothing is cached between calls except the current directory's block number.
pub struct Jfs<S: BlockStore> {
    store: S,
    geometry: Geometry,
    /// The directory names are resolved against.
    current_dir: BlockNumber,
}

/// What [`Jfs::stat`] reports about an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub name: String,
    /// The block handle of the entry: its directory node or inode.
    pub block_number: BlockNumber,
    pub is_directory: bool,
    /// Always 0 for directories.
    pub file_size: usize,
    /// The data block count of a file. Always 0 for directories.
    pub num_data_blocks: usize,
}

/// Block usage of the underlying store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreStats {
    pub block_len: usize,
    pub num_blocks: usize,
    pub num_free_blocks: usize,
}

impl<S: BlockStore> Jfs<S> {
    /// Writes an empty root directory to `store` and mounts it.
    pub fn format(mut store: S, geometry: Geometry) -> Result<Self> {
        check_geometry(&store, &geometry)?;

        write_metadata(
            &mut store,
            ROOT_BLOCK,
            &Block::Directory(DirectoryNode::default()),
        )?;
        info!("[block #{ROOT_BLOCK}] wrote empty root directory");

        Self::mount(store, geometry)
    }

    /// Mounts a store whose root block already holds a directory.
    pub fn mount(store: S, geometry: Geometry) -> Result<Self> {
        check_geometry(&store, &geometry)?;

        let jfs = Jfs {
            store,
            geometry,
            current_dir: ROOT_BLOCK,
        };

        match jfs.read_directory(ROOT_BLOCK) {
            Err(Error::NotADirectory) => {
                return Err(anyhow!("root block does not hold a directory").into())
            }
            Err(err) => return Err(err),
            Ok(root) => info!("mounted filesystem ({} root entries)", root.len()),
        }

        Ok(jfs)
    }

    pub fn unmount(self) -> Result<()> {
        self.store.unmount()?;
        info!("unmounted filesystem");

        Ok(())
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_dir(&self) -> BlockNumber {
        self.current_dir
    }

    /// Makes the subdirectory `name` the current directory, or the root if `name` is `None`.
    pub fn chdir(&mut self, name: Option<&str>) -> Result<()> {
        let Some(name) = name else {
            self.current_dir = ROOT_BLOCK;
            return Ok(());
        };

        let dir = self.read_current_dir()?;
        let (_, entry) = lookup(&dir, name)?;
        let target = entry.target;

        self.read_directory(target)?;

        debug!("[block #{target}] changed directory to {name:?}");
        self.current_dir = target;

        Ok(())
    }

    pub fn stat(&self, name: &str) -> Result<Stats> {
        let dir = self.read_current_dir()?;
        let (_, entry) = lookup(&dir, name)?;

        let stats = match self.read_block(entry.target)? {
            Block::Directory(_) => Stats {
                name: name.to_owned(),
                block_number: entry.target,
                is_directory: true,
                file_size: 0,
                num_data_blocks: 0,
            },
            Block::File(inode) => Stats {
                name: name.to_owned(),
                block_number: entry.target,
                is_directory: false,
                file_size: inode.file_size as usize,
                num_data_blocks: inode.num_data_blocks(self.geometry.block_size),
            },
        };

        Ok(stats)
    }

    pub fn statfs(&self) -> StoreStats {
        StoreStats {
            block_len: self.store.block_len(),
            num_blocks: self.store.num_blocks(),
            num_free_blocks: self.store.num_free_blocks(),
        }
    }

    fn read_block(&self, block_number: BlockNumber) -> Result<Block> {
        let bytes = self.store.read_block(block_number)?;
        let block =
            Block::decode(&bytes).with_context(|| format!("decoding block {block_number}"))?;

        Ok(block)
    }

    fn write_block(&mut self, block_number: BlockNumber, block: &Block) -> Result<()> {
        write_metadata(&mut self.store, block_number, block)?;
        Ok(())
    }

    fn read_directory(&self, block_number: BlockNumber) -> Result<DirectoryNode> {
        match self.read_block(block_number)? {
            Block::Directory(node) => Ok(node),
            Block::File(_) => Err(Error::NotADirectory),
        }
    }

    fn read_current_dir(&self) -> Result<DirectoryNode> {
        self.read_directory(self.current_dir)
    }

    fn read_inode(&self, block_number: BlockNumber) -> Result<Inode> {
        match self.read_block(block_number)? {
            Block::Directory(_) => Err(Error::IsADirectory),
            Block::File(inode) => Ok(inode),
        }
    }

    /// Adds an entry called `name` to the current directory, pointing at a newly allocated
    /// block that holds `block`.
    fn create_entry(&mut self, name: &str, block: Block) -> Result<BlockNumber> {
        if name.len() > self.geometry.max_name_length {
            return Err(Error::NameTooLong);
        }

        let mut dir = self.read_current_dir()?;

        if dir.contains(name) {
            return Err(Error::AlreadyExists);
        }

        if dir.len() >= self.geometry.max_dir_entries {
            return Err(Error::DirectoryFull);
        }

        let current_dir = self.current_dir;
        let mut pending = PendingBlocks::new(&mut self.store);

        let block_number = pending.allocate()?;
        write_metadata(pending.store(), block_number, &block)?;

        dir.push(DirectoryEntry::new(EntryName::from(name), block_number));
        write_metadata(pending.store(), current_dir, &Block::Directory(dir))?;

        pending.commit();
        Ok(block_number)
    }
}

fn check_geometry<S: BlockStore>(store: &S, geometry: &Geometry) -> Result<()> {
    geometry.validate()?;

    if store.block_len() < geometry.block_len()? {
        return Err(Error::InvalidGeometry(
            "store blocks are too small for this geometry",
        ));
    }

    Ok(())
}

fn write_metadata<S: BlockStore>(
    store: &mut S,
    block_number: BlockNumber,
    block: &Block,
) -> anyhow::Result<()> {
    let bytes = block.encode(store.block_len())?;
    store.write_block(block_number, &bytes)
}

fn lookup<'a>(dir: &'a DirectoryNode, name: &str) -> Result<(usize, &'a DirectoryEntry)> {
    dir.find(name).ok_or(Error::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    pub(super) fn small_geometry() -> Geometry {
        Geometry {
            block_size: 4,
            max_name_length: 8,
            max_dir_entries: 3,
            max_data_blocks: 4,
            max_file_size: 16,
        }
    }

    pub(super) fn new_jfs(geometry: Geometry, num_blocks: usize) -> Jfs<MemoryStore> {
        let store = MemoryStore::new(geometry.block_len().unwrap(), num_blocks).unwrap();
        Jfs::format(store, geometry).unwrap()
    }

    mod mount {
        use super::*;

        #[test]
        fn test_zeroed_store_mounts() {
            let geometry = small_geometry();
            let store = MemoryStore::new(geometry.block_len().unwrap(), 8).unwrap();

            let jfs = Jfs::mount(store, geometry).unwrap();
            assert_eq!(jfs.current_dir(), ROOT_BLOCK);
        }

        #[test]
        fn test_store_blocks_too_small() {
            let geometry = small_geometry();
            let store = MemoryStore::new(geometry.block_len().unwrap() - 1, 8).unwrap();

            assert!(matches!(
                Jfs::mount(store, geometry),
                Err(Error::InvalidGeometry(_))
            ));
        }

        #[test]
        fn test_root_holding_inode() {
            let geometry = small_geometry();
            let mut store = MemoryStore::new(geometry.block_len().unwrap(), 8).unwrap();
            write_metadata(&mut store, ROOT_BLOCK, &Block::File(Inode::default())).unwrap();

            assert!(matches!(Jfs::mount(store, geometry), Err(Error::Io(_))));
        }

        #[test]
        fn test_format_clears_root() {
            let geometry = small_geometry();
            let mut jfs = new_jfs(geometry, 8);
            jfs.mkdir("a").unwrap();

            let store = jfs.store.clone();
            let jfs = Jfs::format(store, geometry).unwrap();
            assert!(jfs.ls().unwrap().directories.is_empty());
        }
    }

    mod chdir {
        use super::*;

        #[test]
        fn test_into_subdirectory() {
            let mut jfs = new_jfs(small_geometry(), 8);
            jfs.mkdir("sub").unwrap();
            let sub_block = jfs.stat("sub").unwrap().block_number;

            jfs.chdir(Some("sub")).unwrap();
            assert_eq!(jfs.current_dir(), sub_block);
        }

        #[test]
        fn test_none_returns_to_root() {
            let mut jfs = new_jfs(small_geometry(), 8);
            jfs.mkdir("sub").unwrap();
            jfs.chdir(Some("sub")).unwrap();

            jfs.chdir(None).unwrap();
            assert_eq!(jfs.current_dir(), ROOT_BLOCK);

            jfs.chdir(None).unwrap();
            assert_eq!(jfs.current_dir(), ROOT_BLOCK);
        }

        #[test]
        fn test_missing_entry() {
            let mut jfs = new_jfs(small_geometry(), 8);

            assert!(matches!(jfs.chdir(Some("nope")), Err(Error::NotFound)));
            assert_eq!(jfs.current_dir(), ROOT_BLOCK);
        }

        #[test]
        fn test_into_file() {
            let mut jfs = new_jfs(small_geometry(), 8);
            jfs.creat("f").unwrap();

            assert!(matches!(jfs.chdir(Some("f")), Err(Error::NotADirectory)));
            assert_eq!(jfs.current_dir(), ROOT_BLOCK);
        }

        #[test]
        fn test_names_are_not_paths() {
            let mut jfs = new_jfs(small_geometry(), 8);
            jfs.mkdir("a").unwrap();
            jfs.chdir(Some("a")).unwrap();
            jfs.mkdir("b").unwrap();
            jfs.chdir(None).unwrap();

            assert!(matches!(jfs.chdir(Some("a/b")), Err(Error::NotFound)));
            assert!(matches!(jfs.chdir(Some("..")), Err(Error::NotFound)));
        }
    }

    mod stat {
        use super::*;

        #[test]
        fn test_directory() {
            let mut jfs = new_jfs(small_geometry(), 8);
            jfs.mkdir("d").unwrap();

            let stats = jfs.stat("d").unwrap();
            assert_eq!(stats.name, "d");
            assert!(stats.is_directory);
            assert_eq!(stats.file_size, 0);
            assert_eq!(stats.num_data_blocks, 0);
        }

        #[test]
        fn test_file_block_count() {
            let mut jfs = new_jfs(small_geometry(), 8);
            jfs.creat("f").unwrap();
            jfs.write("f", b"12345").unwrap();

            let stats = jfs.stat("f").unwrap();
            assert!(!stats.is_directory);
            assert_eq!(stats.file_size, 5);
            assert_eq!(stats.num_data_blocks, 2);
        }

        #[test]
        fn test_missing() {
            let jfs = new_jfs(small_geometry(), 8);
            assert!(matches!(jfs.stat("nope"), Err(Error::NotFound)));
        }
    }

    #[test]
    fn test_statfs() {
        let mut jfs = new_jfs(small_geometry(), 8);
        assert_eq!(jfs.statfs().num_free_blocks, 6);

        jfs.creat("f").unwrap();
        jfs.write("f", b"abcde").unwrap();

        let stats = jfs.statfs();
        assert_eq!(stats.num_blocks, 8);
        assert_eq!(stats.num_free_blocks, 3);
        assert_eq!(stats.block_len, small_geometry().block_len().unwrap());
    }
}
