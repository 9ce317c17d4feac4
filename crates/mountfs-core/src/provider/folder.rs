//! Provider for plain directories on the local file system.

use super::{EnumerationContext, FileStream, Provider};
use crate::entry::{FileEntry, PhysicalFileInfo};
use crate::error::{Result, VfsError};
use crate::path::{VirtualPath, case_key, sanitize_name};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Serves directories of the host file system.
///
/// Every file system carries exactly one instance of this provider. It is
/// the only provider that can write, which makes it the provider behind the
/// write location.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderProvider;

impl FolderProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Provider for FolderProvider {
    fn description(&self) -> &str {
        "Plain directories on the local file system"
    }

    fn is_read_only(&self) -> bool {
        false
    }

    /// Always `false`: directories are mounted directly, never probed.
    fn can_read_file(&self, physical_path: &Path) -> Result<bool> {
        if physical_path.as_os_str().is_empty() {
            return Err(VfsError::empty_argument("physical_path"));
        }
        Ok(false)
    }

    /// Walks the directory, following symbolic links.
    ///
    /// Entries whose name has no legal characters are skipped, as are
    /// entries whose cleaned name collides with a sibling: the entry named
    /// exactly like the cleaned name wins, otherwise the first in name
    /// order. Link loops and dangling links are skipped as well.
    fn enumerate(&self, physical_path: &Path, context: &mut EnumerationContext<'_>) -> Result<()> {
        let mut claimed = HashSet::new();
        let mut walker = WalkDir::new(physical_path)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_skippable_link(&e) => {
                    tracing::warn!("Skipping unreadable link: {}", e);
                    continue;
                }
                Err(e) => {
                    let path = e.path().unwrap_or(physical_path).to_path_buf();
                    return Err(VfsError::io(path, e.into()));
                }
            };
            let is_dir = entry.file_type().is_dir();

            if !is_unique_name(&entry, context, &mut claimed) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            let Some(virtual_path) = context.virtual_path(entry.path()) else {
                continue;
            };

            if is_dir {
                context.add_directory(&virtual_path)?;
            } else if entry.file_type().is_file() {
                let metadata = entry
                    .metadata()
                    .map_err(|e| VfsError::io(entry.path(), e.into()))?;
                let created = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);

                context.add_file(
                    &virtual_path,
                    PhysicalFileInfo::new(entry.path(), metadata.len(), created),
                )?;
            }
        }

        let (directories, files) = context.counts();
        tracing::debug!(
            "Enumerated {}: {} directories, {} files",
            physical_path.display(),
            directories,
            files
        );
        Ok(())
    }

    fn read_file(&self, file: &FileEntry) -> Result<Vec<u8>> {
        let path = file.physical_path();
        fs::read(&path).map_err(|e| VfsError::io(path, e))
    }

    fn open_stream(&self, file: &FileEntry, writeable: bool) -> Result<FileStream> {
        let path = file.physical_path();
        let handle = if writeable {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| VfsError::io(parent, e))?;
            }
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
        } else {
            File::open(&path)
        };

        handle
            .map(FileStream::new)
            .map_err(|e| VfsError::io(path, e))
    }

    fn write_file(&self, file: &FileEntry, data: &[u8]) -> Result<()> {
        let path = file.physical_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| VfsError::io(parent, e))?;
        }
        fs::write(&path, data).map_err(|e| VfsError::io(path, e))
    }
}

/// Loops and links pointing nowhere are left out instead of failing the mount.
fn is_skippable_link(error: &walkdir::Error) -> bool {
    error.loop_ancestor().is_some()
        || (error.depth() > 0
            && error
                .io_error()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound))
}

/// Decides whether an entry gets a virtual name of its own.
///
/// `claimed` holds the case keys of the virtual paths taken so far.
fn is_unique_name(
    entry: &DirEntry,
    context: &EnumerationContext<'_>,
    claimed: &mut HashSet<String>,
) -> bool {
    let raw = entry.file_name().to_string_lossy();
    let clean = sanitize_name(&raw);
    if clean.is_empty() {
        tracing::warn!(
            "Skipping {}: the name has no legal characters",
            entry.path().display()
        );
        return false;
    }

    if clean != raw && entry.path().with_file_name(&clean).exists() {
        tracing::warn!(
            "Skipping {}: its name collides with {}",
            entry.path().display(),
            clean
        );
        return false;
    }

    let Some(key) = context
        .virtual_path(entry.path())
        .and_then(|path| VirtualPath::parse(&path).ok())
        .map(|path| case_key(&path.to_file_string()))
    else {
        return true;
    };
    if !claimed.insert(key) {
        tracing::warn!(
            "Skipping {}: another entry already maps to {}",
            entry.path().display(),
            clean
        );
        return false;
    }
    true
}
