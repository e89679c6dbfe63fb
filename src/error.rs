use thiserror::Error;

/// The ways a filesystem operation can fail.
///
/// Every operation returns exactly one of these. Failures of the underlying block store, and
/// blocks that cannot be decoded, are reported as [`Error::Io`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("an entry with that name already exists")]
    AlreadyExists,
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory is not empty")]
    NotEmpty,
    #[error("name is too long")]
    NameTooLong,
    #[error("directory has no room for more entries")]
    DirectoryFull,
    #[error("file would exceed the maximum file size")]
    FileTooLarge,
    #[error("no free blocks left on the disk")]
    DiskFull,
    #[error("block store failure: {0:#}")]
    Io(#[from] anyhow::Error),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
