use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use super::block::BlockNumber;

/// A directory entry.
///
/// The kind of the target (directory or file) is not stored here; it is read from the tag of
/// the target block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// The name of the entry.
    pub name: EntryName,
    /// The block the entry points to.
    pub target: BlockNumber,
}

impl DirectoryEntry {
    /// Constructs a new [`DirectoryEntry`] instance.
    pub fn new(name: EntryName, target: BlockNumber) -> DirectoryEntry {
        DirectoryEntry { name, target }
    }
}

/// A name, as used in [`DirectoryEntry`].
///
/// Names are compared byte for byte and never interpreted, so `/`, `.` and `..` carry no
/// special meaning. The length bound is enforced by the filesystem when entries are created.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryName(String);

impl EntryName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The length of the name in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for EntryName {
    fn from(value: &str) -> Self {
        EntryName(value.to_owned())
    }
}

impl From<String> for EntryName {
    fn from(value: String) -> Self {
        EntryName(value)
    }
}

impl Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryName").field(&self.0).finish()
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The contents of a directory block: its entries in insertion order.
///
/// The number of entries is the length of the sequence. Removing an entry shifts the later
/// entries down, so there are never any free slots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    entries: Vec<DirectoryEntry>,
}

impl DirectoryNode {
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry called `name` along with its position.
    pub fn find(&self, name: &str) -> Option<(usize, &DirectoryEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.name.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Appends an entry. Capacity and uniqueness are checked by the caller.
    pub fn push(&mut self, entry: DirectoryEntry) {
        self.entries.push(entry);
    }

    /// Removes the entry at `index`, compacting the entries after it.
    pub fn remove(&mut self, index: usize) -> DirectoryEntry {
        self.entries.remove(index)
    }
}

impl From<Vec<DirectoryEntry>> for DirectoryNode {
    fn from(entries: Vec<DirectoryEntry>) -> Self {
        DirectoryNode { entries }
    }
}
