/// Block allocation bitmaps.
mod bitmap;
/// The block store abstraction.
mod block_store;
/// File-backed block storage.
mod file;
/// Memory-backed block storage.
mod memory;

pub use bitmap::*;
pub use block_store::*;
pub use file::*;
pub use memory::*;
