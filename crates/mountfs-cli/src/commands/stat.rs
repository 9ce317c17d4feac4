//! `stat` command: shows where a virtual file's content comes from.

use anyhow::{Context, Result};
use mountfs_core::{FileEntry, FileSystem, VfsError};
use serde::Serialize;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// Origin and metadata of one virtual file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileInfo {
    /// Full virtual path
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Byte offset inside the physical file
    pub offset: u64,
    /// Creation time (RFC 3339)
    pub created: String,
    /// Provider serving the content
    pub provider: String,
    /// Physical file backing the entry
    pub physical_path: String,
    /// Mount point that contributed the file
    pub mount: String,
}

impl From<&FileEntry> for FileInfo {
    fn from(file: &FileEntry) -> Self {
        Self {
            path: file.full_path(),
            size: file.size(),
            offset: file.offset(),
            created: file.created().to_rfc3339(),
            provider: file.provider().type_name().to_string(),
            physical_path: file.physical_path().display().to_string(),
            mount: file.mount_point().to_string(),
        }
    }
}

/// Looks up the file at `path`.
pub fn stat(vfs: &FileSystem, path: &str) -> Result<FileInfo> {
    let file = vfs.get_file(path)?.ok_or_else(|| VfsError::FileNotFound {
        path: path.to_string(),
    })?;
    Ok(FileInfo::from(file.as_ref()))
}

/// Runs the stat command.
pub fn run(vfs: &FileSystem, path: String, output_format: OutputFormat) -> Result<ExitCode> {
    let info = stat(vfs, &path).with_context(|| format!("failed to stat '{path}'"))?;
    let formatted = format_output(&info, output_format).context("failed to format file info")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
