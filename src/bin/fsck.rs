use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use jfs::{disk_format::geometry::Geometry, jfs::Jfs, storage::FileBackedStore};

#[derive(Parser)]
struct Args {
    /// jfs disk file
    disk_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let storage = FileBackedStore::open(args.disk_file)?;
    let jfs = Jfs::mount(storage, Geometry::default())?;

    let report = jfs.check_filesystem()?;
    println!(
        "{} directories, {} files, {} data blocks",
        report.directories, report.files, report.data_blocks
    );

    if !report.leaked.is_empty() {
        bail!("{} leaked blocks: {:?}", report.leaked.len(), report.leaked);
    }

    Ok(())
}
