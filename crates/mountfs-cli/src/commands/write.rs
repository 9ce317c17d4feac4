//! `write` command: stores a file in the write location.

use anyhow::{Context, Result};
use mountfs_core::FileSystem;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// Where the written bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// Copy a physical file
    File(PathBuf),
    /// Read stdin to the end
    Stdin,
    /// Create or truncate to an empty file
    Empty,
}

impl Contents {
    /// Picks the source from the `--from` and `--empty` flags.
    #[must_use]
    pub fn from_flags(from: Option<PathBuf>, empty: bool) -> Self {
        match (from, empty) {
            (Some(path), _) => Self::File(path),
            (None, true) => Self::Empty,
            (None, false) => Self::Stdin,
        }
    }

    fn load(&self) -> Result<Vec<u8>> {
        match self {
            Self::File(path) => {
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))
            }
            Self::Stdin => {
                let mut data = Vec::new();
                io::stdin()
                    .read_to_end(&mut data)
                    .context("failed to read stdin")?;
                Ok(data)
            }
            Self::Empty => Ok(Vec::new()),
        }
    }
}

/// Result of a write.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Written {
    /// Full virtual path
    pub path: String,
    /// Physical file inside the write location
    pub physical_path: String,
    /// Bytes written
    pub size: u64,
}

/// Writes `data` to the virtual file at `path`.
pub fn write(vfs: &mut FileSystem, path: &str, data: &[u8]) -> Result<Written> {
    let file = vfs.write_file(path, Some(data))?;
    Ok(Written {
        path: file.full_path(),
        physical_path: file.physical_path().display().to_string(),
        size: file.size(),
    })
}

/// Runs the write command.
pub fn run(
    vfs: &mut FileSystem,
    path: String,
    contents: Contents,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let data = contents.load()?;
    let written = write(vfs, &path, &data)
        .with_context(|| format!("failed to write '{path}'"))?;
    info!("Wrote {} bytes to {}", written.size, written.physical_path);

    let formatted = format_output(&written, output_format).context("failed to format result")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
