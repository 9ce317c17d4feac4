//! Directory and file entries of the virtual tree.
//!
//! Entries are shared nodes: a [`Directory`] owns its children through
//! `Arc`s and points back to its parent with a `Weak`, and a [`FileEntry`]
//! keeps a `Weak` link to the directory that holds it. File metadata lives
//! behind a lock so that remounting updates an entry in place, which keeps
//! any `Arc<FileEntry>` a caller holds pointing at live data.
//!
//! Names are unique per directory, compared case-insensitively, and a
//! directory never holds a child directory and a file with the same name.

use crate::error::{Result, VfsError};
use crate::mount_point::MountPoint;
use crate::path::{SEPARATOR, case_key};
use crate::provider::Provider;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// What to do when a new entry collides with an entry of the other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConflictPolicy {
    /// Drop the existing entry; used when a later mount shadows an earlier one.
    Replace,
    /// Refuse with [`VfsError::EntryConflict`].
    Fail,
}

/// Physical facts about a file, as reported by the provider that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalFileInfo {
    /// Location of the file (or of the packed file that contains it).
    pub physical_path: PathBuf,
    /// Size of the file content in bytes.
    pub size: u64,
    /// Offset of the content inside a packed file, `0` for plain files.
    pub offset: u64,
    /// Creation time of the file.
    pub created: DateTime<Utc>,
}

impl PhysicalFileInfo {
    /// Creates info for a plain (non-packed) file.
    #[must_use]
    pub fn new(physical_path: impl Into<PathBuf>, size: u64, created: DateTime<Utc>) -> Self {
        Self {
            physical_path: physical_path.into(),
            size,
            offset: 0,
            created,
        }
    }

    /// Sets the offset of the content inside its container.
    #[must_use]
    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone)]
struct FileState {
    provider: Arc<dyn Provider>,
    mount_point: MountPoint,
    physical: PhysicalFileInfo,
}

/// A file in the virtual tree.
///
/// Its identity is its full virtual path. All metadata getters return
/// snapshots; the values change when the file is rewritten or remounted.
pub struct FileEntry {
    name: String,
    directory: Weak<Directory>,
    state: RwLock<FileState>,
}

impl FileEntry {
    fn new(
        name: String,
        directory: &Arc<Directory>,
        provider: Arc<dyn Provider>,
        mount_point: MountPoint,
        physical: PhysicalFileInfo,
    ) -> Self {
        Self {
            name,
            directory: Arc::downgrade(directory),
            state: RwLock::new(FileState {
                provider,
                mount_point,
                physical,
            }),
        }
    }

    /// Returns the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the file name without its extension: `notes.backup` for
    /// `notes.backup.txt`.
    #[must_use]
    pub fn base_name(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    /// Returns the extension of the file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|s| s.to_str())
    }

    /// Returns the directory that holds this file, if it is still alive.
    #[must_use]
    pub fn directory(&self) -> Option<Arc<Directory>> {
        self.directory.upgrade()
    }

    /// Returns the full virtual path of the file.
    #[must_use]
    pub fn full_path(&self) -> String {
        let mut path = self
            .directory()
            .map_or_else(|| SEPARATOR.to_string(), |d| d.full_path());
        path.push_str(&self.name);
        path
    }

    /// Returns the provider that serves this file's content.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.state.read().provider)
    }

    /// Returns the mount point the file came from.
    #[must_use]
    pub fn mount_point(&self) -> MountPoint {
        self.state.read().mount_point.clone()
    }

    /// Returns the physical location of the file.
    #[must_use]
    pub fn physical_path(&self) -> PathBuf {
        self.state.read().physical.physical_path.clone()
    }

    /// Returns the size of the file in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.state.read().physical.size
    }

    /// Returns the offset of the content inside a packed file.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.state.read().physical.offset
    }

    /// Returns the creation time of the file.
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.state.read().physical.created
    }

    /// Returns a snapshot of the physical file information.
    #[must_use]
    pub fn physical_info(&self) -> PhysicalFileInfo {
        self.state.read().physical.clone()
    }

    /// Replaces every piece of metadata, keeping the entry's identity.
    pub(crate) fn update(
        &self,
        provider: Arc<dyn Provider>,
        mount_point: MountPoint,
        physical: PhysicalFileInfo,
    ) {
        let mut state = self.state.write();
        state.provider = provider;
        state.mount_point = mount_point;
        state.physical = physical;
    }

    /// Updates only size and timestamp, after the content was rewritten.
    pub(crate) fn update_file_info(&self, size: u64, created: DateTime<Utc>) {
        let mut state = self.state.write();
        state.physical.size = size;
        state.physical.created = created;
    }

    fn copy_state_from(&self, other: &Self) {
        let source = other.state.read().clone();
        *self.state.write() = source;
    }

    pub(crate) fn is_owned_by(&self, provider: &Arc<dyn Provider>) -> bool {
        Arc::ptr_eq(&self.state.read().provider, provider)
    }
}

impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("FileEntry")
            .field("name", &self.name)
            .field("provider", &state.provider.type_name())
            .field("mount_point", &state.mount_point)
            .field("physical", &state.physical)
            .finish()
    }
}

/// A directory in the virtual tree.
pub struct Directory {
    name: String,
    parent: Weak<Directory>,
    children: RwLock<BTreeMap<String, Arc<Directory>>>,
    files: RwLock<BTreeMap<String, Arc<FileEntry>>>,
}

impl Directory {
    /// Creates a detached root directory named `/`.
    #[must_use]
    pub fn new_root() -> Arc<Self> {
        Arc::new(Self {
            name: SEPARATOR.to_string(),
            parent: Weak::new(),
            children: RwLock::new(BTreeMap::new()),
            files: RwLock::new(BTreeMap::new()),
        })
    }

    fn new_child(parent: &Arc<Self>, name: String) -> Arc<Self> {
        Arc::new(Self {
            name,
            parent: Arc::downgrade(parent),
            children: RwLock::new(BTreeMap::new()),
            files: RwLock::new(BTreeMap::new()),
        })
    }

    /// Returns the directory name (`/` for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the directory has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Returns the parent directory, `None` for the root or a detached node.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    /// Returns the full virtual path, always ending with `/`.
    #[must_use]
    pub fn full_path(&self) -> String {
        match self.parent() {
            Some(parent) => {
                let mut path = parent.full_path();
                path.push_str(&self.name);
                path.push(SEPARATOR);
                path
            }
            None => SEPARATOR.to_string(),
        }
    }

    /// Returns the child directories, ordered by name.
    #[must_use]
    pub fn directories(&self) -> Vec<Arc<Self>> {
        self.children.read().values().cloned().collect()
    }

    /// Returns the files held directly by this directory, ordered by name.
    #[must_use]
    pub fn files(&self) -> Vec<Arc<FileEntry>> {
        self.files.read().values().cloned().collect()
    }

    /// Looks up a child directory by name, ignoring case.
    #[must_use]
    pub fn directory(&self, name: &str) -> Option<Arc<Self>> {
        self.children.read().get(&case_key(name)).cloned()
    }

    /// Looks up a file held by this directory, ignoring case.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<Arc<FileEntry>> {
        self.files.read().get(&case_key(name)).cloned()
    }

    /// Counts every descendant directory, not including this one.
    #[must_use]
    pub fn directory_count(&self) -> usize {
        let children = self.children.read();
        children.len() + children.values().map(|c| c.directory_count()).sum::<usize>()
    }

    /// Counts the files in this directory, optionally including descendants.
    #[must_use]
    pub fn file_count(&self, include_children: bool) -> usize {
        let own = self.files.read().len();
        if !include_children {
            return own;
        }
        own + self
            .children
            .read()
            .values()
            .map(|c| c.file_count(true))
            .sum::<usize>()
    }

    /// Returns `true` if the directory holds no files and no directories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty() && self.files.read().is_empty()
    }

    /// Tests whether `file` lives in this directory, or in one of its
    /// descendants when `search_children` is set.
    ///
    /// Membership is by identity, not by name.
    #[must_use]
    pub fn contains(&self, file: &FileEntry, search_children: bool) -> bool {
        if self
            .files
            .read()
            .values()
            .any(|f| std::ptr::eq(Arc::as_ptr(f), file))
        {
            return true;
        }
        search_children && self.children.read().values().any(|c| c.contains(file, true))
    }

    /// Walks child directories by name, returning `None` at the first miss.
    pub(crate) fn find_directory(self: &Arc<Self>, segments: &[String]) -> Option<Arc<Self>> {
        let mut current = Arc::clone(self);
        for segment in segments {
            let next = current.directory(segment)?;
            current = next;
        }
        Some(current)
    }

    /// Walks child directories by name, creating the missing ones.
    pub(crate) fn ensure_directory(
        self: &Arc<Self>,
        segments: &[String],
        policy: ConflictPolicy,
    ) -> Result<Arc<Self>> {
        let mut current = Arc::clone(self);
        for segment in segments {
            let next = current.child_or_insert(segment, policy)?;
            current = next;
        }
        Ok(current)
    }

    fn child_or_insert(self: &Arc<Self>, name: &str, policy: ConflictPolicy) -> Result<Arc<Self>> {
        let key = case_key(name);
        let mut children = self.children.write();
        if let Some(existing) = children.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let mut files = self.files.write();
        if files.contains_key(&key) {
            match policy {
                ConflictPolicy::Fail => {
                    return Err(VfsError::EntryConflict {
                        path: format!("{}{name}", self.full_path()),
                    });
                }
                ConflictPolicy::Replace => {
                    tracing::warn!(
                        "Directory {}{} replaces a file of the same name",
                        self.full_path(),
                        name
                    );
                    files.remove(&key);
                }
            }
        }

        let child = Self::new_child(self, name.to_string());
        children.insert(key, Arc::clone(&child));
        Ok(child)
    }

    /// Adds a file, or updates the existing entry of that name in place.
    pub(crate) fn upsert_file(
        self: &Arc<Self>,
        name: &str,
        provider: Arc<dyn Provider>,
        mount_point: MountPoint,
        physical: PhysicalFileInfo,
        policy: ConflictPolicy,
    ) -> Result<Arc<FileEntry>> {
        let key = case_key(name);
        let mut children = self.children.write();
        let mut files = self.files.write();

        if let Some(existing) = files.get(&key) {
            existing.update(provider, mount_point, physical);
            return Ok(Arc::clone(existing));
        }

        if children.contains_key(&key) {
            match policy {
                ConflictPolicy::Fail => {
                    return Err(VfsError::EntryConflict {
                        path: format!("{}{name}", self.full_path()),
                    });
                }
                ConflictPolicy::Replace => {
                    tracing::warn!(
                        "File {}{} replaces a directory of the same name",
                        self.full_path(),
                        name
                    );
                    children.remove(&key);
                }
            }
        }

        let entry = Arc::new(FileEntry::new(
            name.to_string(),
            self,
            provider,
            mount_point,
            physical,
        ));
        files.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    pub(crate) fn remove_file(&self, name: &str) -> Option<Arc<FileEntry>> {
        self.files.write().remove(&case_key(name))
    }

    pub(crate) fn remove_directory(&self, name: &str) -> Option<Arc<Self>> {
        self.children.write().remove(&case_key(name))
    }

    pub(crate) fn clear(&self) {
        self.children.write().clear();
        self.files.write().clear();
    }

    /// Removes every file served by `provider`, here and in all descendants.
    pub(crate) fn remove_files_of(&self, provider: &Arc<dyn Provider>) -> usize {
        let removed = {
            let mut files = self.files.write();
            let before = files.len();
            files.retain(|_, f| !f.is_owned_by(provider));
            before - files.len()
        };
        removed
            + self
                .children
                .read()
                .values()
                .map(|c| c.remove_files_of(provider))
                .sum::<usize>()
    }

    /// Makes this directory mirror `source`.
    ///
    /// Files present in both keep their identity and take over the source's
    /// metadata; missing ones are added, extra ones removed. With
    /// `include_children` the same is done recursively for subdirectories;
    /// otherwise child directories are only added, never removed.
    pub(crate) fn reconcile(self: &Arc<Self>, source: &Self, include_children: bool) {
        let source_children = source.children.read().clone();
        let source_files = source.files.read().clone();

        {
            let mut children = self.children.write();
            let mut files = self.files.write();

            files.retain(|key, _| source_files.contains_key(key));
            for (key, source_file) in &source_files {
                children.remove(key);
                match files.get(key) {
                    Some(existing) => existing.copy_state_from(source_file),
                    None => {
                        let state = source_file.state.read().clone();
                        let entry = Arc::new(FileEntry::new(
                            source_file.name.clone(),
                            self,
                            state.provider,
                            state.mount_point,
                            state.physical,
                        ));
                        files.insert(key.clone(), entry);
                    }
                }
            }

            if include_children {
                children.retain(|key, _| source_children.contains_key(key));
            }
            for (key, source_child) in &source_children {
                if !children.contains_key(key) {
                    files.remove(key);
                    children.insert(
                        key.clone(),
                        Self::new_child(self, source_child.name.clone()),
                    );
                }
            }
        }

        if include_children {
            for (key, source_child) in &source_children {
                let child = self.children.read().get(key).cloned();
                if let Some(child) = child {
                    child.reconcile(source_child, true);
                }
            }
        }
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("path", &self.full_path())
            .field("directories", &self.children.read().len())
            .field("files", &self.files.read().len())
            .finish()
    }
}
