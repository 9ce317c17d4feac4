//! `mkdir` command: creates a virtual directory.

use anyhow::{Context, Result};
use mountfs_core::FileSystem;
use serde::Serialize;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// Result of a directory creation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Created {
    /// Full virtual path
    pub path: String,
    /// Physical mirror in the write location, if one is set
    pub physical_path: Option<String>,
}

/// Creates the directory at `path` and any missing parents.
pub fn make_directory(vfs: &mut FileSystem, path: &str) -> Result<Created> {
    let directory = vfs.create_directory(path)?;
    let full_path = directory.full_path();
    let physical_path = match vfs.write_location() {
        Some(_) => Some(vfs.get_write_path(&full_path)?.display().to_string()),
        None => None,
    };

    Ok(Created {
        path: full_path,
        physical_path,
    })
}

/// Runs the mkdir command.
pub fn run(vfs: &mut FileSystem, path: String, output_format: OutputFormat) -> Result<ExitCode> {
    let created =
        make_directory(vfs, &path).with_context(|| format!("failed to create '{path}'"))?;
    let formatted = format_output(&created, output_format).context("failed to format result")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
