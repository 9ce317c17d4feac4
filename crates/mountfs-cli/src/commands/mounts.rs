//! `mounts` command: summarizes how the file system is assembled.

use anyhow::{Context, Result};
use mountfs_core::{FileSystem, MountPoint, Provider};
use serde::Serialize;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// One mount point, in precedence order (later entries win).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MountSummary {
    /// Mounted directory or packed file
    pub physical_path: String,
    /// Virtual directory it is mounted under
    pub mount_location: String,
}

impl From<&MountPoint> for MountSummary {
    fn from(mount: &MountPoint) -> Self {
        Self {
            physical_path: mount.physical_path().display().to_string(),
            mount_location: mount.mount_location().to_string(),
        }
    }
}

/// A loaded provider.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderSummary {
    /// Provider type name
    pub type_name: String,
    /// Human-readable description
    pub description: String,
    /// `true` when the provider cannot write
    pub read_only: bool,
}

impl From<&dyn Provider> for ProviderSummary {
    fn from(provider: &dyn Provider) -> Self {
        Self {
            type_name: provider.type_name().to_string(),
            description: provider.description().to_string(),
            read_only: provider.is_read_only(),
        }
    }
}

/// Overview of a file system.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MountReport {
    /// Mount points in precedence order
    pub mounts: Vec<MountSummary>,
    /// Write location, if any
    pub write_location: Option<String>,
    /// Loaded providers
    pub providers: Vec<ProviderSummary>,
    /// Files visible in the tree
    pub files: usize,
}

/// Builds the overview of `vfs`.
#[must_use]
pub fn report(vfs: &FileSystem) -> MountReport {
    MountReport {
        mounts: vfs.mount_points().iter().map(MountSummary::from).collect(),
        write_location: vfs.write_location().map(|p| p.display().to_string()),
        providers: vfs
            .providers()
            .iter()
            .map(|p| ProviderSummary::from(p.as_ref()))
            .collect(),
        files: vfs.root().file_count(true),
    }
}

/// Runs the mounts command.
pub fn run(vfs: &FileSystem, output_format: OutputFormat) -> Result<ExitCode> {
    let report = report(vfs);
    let formatted = format_output(&report, output_format).context("failed to format mounts")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
