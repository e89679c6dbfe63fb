use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use jfs::disk_format::geometry::{Geometry, DEFAULT_NUM_BLOCKS};
use jfs::jfs::Jfs;
use jfs::shell;
use jfs::storage::FileBackedStore;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Create a new, empty disk image
    Format {
        /// jfs disk file
        disk_file: PathBuf,
        /// Number of blocks in the disk image
        #[arg(long, default_value_t = DEFAULT_NUM_BLOCKS)]
        num_blocks: u32,
    },
    /// Run commands against a disk image, read from stdin
    Shell {
        /// jfs disk file
        disk_file: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let geometry = Geometry::default();

    match args.command {
        Mode::Format {
            disk_file,
            num_blocks,
        } => {
            let block_len = geometry.block_len()?;
            let store = FileBackedStore::create(&disk_file, block_len, num_blocks)?;
            let jfs = Jfs::format(store, geometry).context("unable to format disk file")?;
            jfs.unmount()?;
        }
        Mode::Shell { disk_file } => {
            let store = FileBackedStore::open(&disk_file)?;
            let jfs = Jfs::mount(store, geometry).context("unable to mount disk file")?;

            let stdin = io::stdin();
            let prompt = stdin.is_terminal().then_some("jfs> ");
            shell::run_and_unmount(jfs, stdin.lock(), &mut io::stdout(), prompt)?;
        }
    }

    Ok(())
}
