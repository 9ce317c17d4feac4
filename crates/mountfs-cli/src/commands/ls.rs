//! `ls` command: lists one virtual directory.

use anyhow::{Context, Result};
use mountfs_core::{FileEntry, FileSystem, VfsError};
use serde::Serialize;
use tracing::info;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// Contents of a virtual directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Listing {
    /// Full virtual path of the directory
    pub path: String,
    /// Sub-directory names
    pub directories: Vec<String>,
    /// Files, in name order
    pub files: Vec<FileSummary>,
}

/// One file of a listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileSummary {
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Physical file that backs the entry
    pub source: String,
}

impl From<&FileEntry> for FileSummary {
    fn from(file: &FileEntry) -> Self {
        Self {
            name: file.name().to_string(),
            size: file.size(),
            source: file.physical_path().display().to_string(),
        }
    }
}

/// Lists the directory at `path`.
pub fn list(vfs: &FileSystem, path: &str) -> Result<Listing> {
    let directory = vfs
        .get_directory(path)?
        .ok_or_else(|| VfsError::DirectoryNotFound {
            path: path.to_string(),
        })?;

    Ok(Listing {
        path: directory.full_path(),
        directories: directory
            .directories()
            .iter()
            .map(|d| d.name().to_string())
            .collect(),
        files: directory
            .files()
            .iter()
            .map(|f| FileSummary::from(f.as_ref()))
            .collect(),
    })
}

/// Runs the ls command.
pub fn run(vfs: &FileSystem, path: String, output_format: OutputFormat) -> Result<ExitCode> {
    info!("Listing {}", path);

    let listing = list(vfs, &path).with_context(|| format!("failed to list '{path}'"))?;
    let formatted = format_output(&listing, output_format).context("failed to format listing")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
