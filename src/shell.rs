//! A line-oriented command interpreter over a mounted filesystem.

use std::io::{BufRead, Write};

use anyhow::Result;
use clap::Parser;
use log::debug;

use crate::{jfs::Jfs, storage::BlockStore};

/// A shell command. Each line of input holds one.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub enum Command {
    /// List the current directory
    Ls,
    /// Enter a subdirectory, or the root directory if no name is given
    Cd { name: Option<String> },
    /// Create a subdirectory
    Mkdir { name: String },
    /// Remove an empty subdirectory
    Rmdir { name: String },
    /// Create an empty file
    Touch { name: String },
    /// Remove a file
    Rm { name: String },
    /// Show information about a file or directory
    Stat { name: String },
    /// Append text to a file
    Write {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Print the contents of a file
    Cat {
        name: String,
        /// Print at most this many bytes
        max_bytes: Option<usize>,
    },
    /// Show block usage
    Df,
    /// Check the filesystem for consistency
    Fsck,
    /// Leave the shell
    Exit,
}

impl Command {
    /// Parses a line of input. Blank lines and lines starting with `#` yield `None`.
    pub fn parse_line(line: &str) -> Option<Result<Command, clap::Error>> {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        Some(Command::try_parse_from(line.split_whitespace()))
    }
}

/// Whether the shell should keep reading commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Runs `command`, printing its results to `out`.
///
/// Filesystem errors are printed rather than returned; only failures to write to `out` are
/// errors.
pub fn execute<S: BlockStore>(
    jfs: &mut Jfs<S>,
    command: Command,
    out: &mut impl Write,
) -> Result<Flow> {
    debug!("executing {command:?}");

    let result = match command {
        Command::Ls => jfs.ls().map(|listing| {
            let directories = listing.directories.iter().map(|name| format!("{name}/"));
            directories.chain(listing.files).collect::<Vec<_>>()
        }),
        Command::Cd { name } => jfs.chdir(name.as_deref()).map(|()| vec![]),
        Command::Mkdir { name } => jfs.mkdir(&name).map(|()| vec![]),
        Command::Rmdir { name } => jfs.rmdir(&name).map(|()| vec![]),
        Command::Touch { name } => jfs.creat(&name).map(|()| vec![]),
        Command::Rm { name } => jfs.remove(&name).map(|()| vec![]),
        Command::Stat { name } => jfs.stat(&name).map(|stats| {
            vec![
                format!("name: {}", stats.name),
                format!("block: {}", stats.block_number),
                format!(
                    "type: {}",
                    if stats.is_directory { "directory" } else { "file" }
                ),
                format!("size: {}", stats.file_size),
                format!("data blocks: {}", stats.num_data_blocks),
            ]
        }),
        Command::Write { name, text } => jfs
            .write(&name, text.join(" ").as_bytes())
            .map(|()| vec![]),
        Command::Cat { name, max_bytes } => jfs
            .read(&name, max_bytes.unwrap_or(usize::MAX))
            .map(|data| vec![String::from_utf8_lossy(&data).into_owned()]),
        Command::Df => {
            let stats = jfs.statfs();
            Ok(vec![format!(
                "{} of {} blocks free ({} bytes per block)",
                stats.num_free_blocks, stats.num_blocks, stats.block_len
            )])
        }
        Command::Fsck => {
            return match jfs.check_filesystem() {
                Ok(report) => {
                    writeln!(
                        out,
                        "{} directories, {} files, {} data blocks",
                        report.directories, report.files, report.data_blocks
                    )?;
                    for block_number in report.leaked {
                        writeln!(out, "leaked block: {block_number}")?;
                    }
                    Ok(Flow::Continue)
                }
                Err(err) => {
                    writeln!(out, "error: {err:#}")?;
                    Ok(Flow::Continue)
                }
            };
        }
        Command::Exit => return Ok(Flow::Exit),
    };

    match result {
        Ok(lines) => {
            for line in lines {
                writeln!(out, "{line}")?;
            }
        }
        Err(err) => writeln!(out, "error: {err}")?,
    }

    Ok(Flow::Continue)
}

/// Reads commands from `input` until it is exhausted or an `exit` command is seen.
///
/// `prompt` is written before every line when set. Lines that are not valid UTF-8 are reported
/// like any other bad command.
pub fn run<S: BlockStore>(
    jfs: &mut Jfs<S>,
    mut input: impl BufRead,
    out: &mut impl Write,
    prompt: Option<&str>,
) -> Result<()> {
    let mut line = vec![];

    loop {
        if let Some(prompt) = prompt {
            write!(out, "{prompt}")?;
            out.flush()?;
        }

        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }

        let text = match std::str::from_utf8(&line) {
            Ok(text) => text,
            Err(err) => {
                writeln!(out, "error: invalid input: {err}")?;
                continue;
            }
        };

        let command = match Command::parse_line(text) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(err)) => {
                write!(out, "{}", err.render())?;
                continue;
            }
        };

        if execute(jfs, command, out)? == Flow::Exit {
            return Ok(());
        }
    }
}

/// Runs a whole session: [`run`], then unmounts `jfs` whether or not reading commands failed.
pub fn run_and_unmount<S: BlockStore>(
    mut jfs: Jfs<S>,
    input: impl BufRead,
    out: &mut impl Write,
    prompt: Option<&str>,
) -> Result<()> {
    let result = run(&mut jfs, input, out, prompt);
    let unmounted = jfs.unmount();

    result?;
    unmounted?;
    Ok(())
}
