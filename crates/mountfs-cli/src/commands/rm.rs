//! `rm` command: deletes a file or a directory.

use anyhow::{Context, Result};
use mountfs_core::FileSystem;
use serde::Serialize;
use tracing::info;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// Result of a deletion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Removed {
    /// Virtual path that was deleted
    pub path: String,
    /// `file` or `directory`
    pub kind: &'static str,
}

/// Deletes the file (or, with `directory`, the directory) at `path`.
///
/// Copies in the write location are deleted too; files served by other
/// mounts only leave the tree until the next refresh.
pub fn remove(vfs: &mut FileSystem, path: &str, directory: bool) -> Result<Removed> {
    let kind = if directory {
        vfs.delete_directory(path)?;
        "directory"
    } else {
        vfs.delete_file(path)?;
        "file"
    };

    Ok(Removed {
        path: path.to_string(),
        kind,
    })
}

/// Runs the rm command.
pub fn run(
    vfs: &mut FileSystem,
    path: String,
    directory: bool,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let removed =
        remove(vfs, &path, directory).with_context(|| format!("failed to delete '{path}'"))?;
    info!("Deleted {} {}", removed.kind, removed.path);

    let formatted = format_output(&removed, output_format).context("failed to format result")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
