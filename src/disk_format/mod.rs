/// Perform a const assertion.
macro_rules! const_assert {
    ($($tt:tt)*) => {
        const _: () = assert!($($tt)*);
    }
}

/// Block numbers and the tagged block representation.
pub mod block;
/// Directory nodes, entries and entry names.
pub mod directory_entry;
/// Size limits of the filesystem.
pub mod geometry;
/// Inodes.
pub mod inode;
