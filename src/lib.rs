//! A hierarchical filesystem on top of a fixed-size block store.
//!
//! Every block is either a directory node (named entries pointing at other blocks) or the
//! inode of a regular file (its size and the blocks holding its contents). Block 1 is the root
//! directory. Operations resolve a single name against a current directory held by the
//! [`jfs::Jfs`] session.

pub mod disk_format;
pub mod error;
pub mod jfs;
pub mod shell;
pub mod storage;

pub use error::{Error, Result};
