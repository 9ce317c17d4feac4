//! The file system aggregate.
//!
//! A [`FileSystem`] owns the virtual tree, the provider registry, the
//! ordered list of mount points and the write location. Mounting merges a
//! physical location into the tree; the tree itself is always derivable
//! from the mount list by replaying every mount oldest first and applying
//! the write location last. Later mounts therefore shadow earlier ones,
//! and content written through the file system shadows everything.
//!
//! # Examples
//!
//! ```no_run
//! use mountfs_core::FileSystem;
//!
//! let mut fs = FileSystem::new();
//! fs.mount("/srv/base", "/")?;
//! fs.mount("/srv/mods", "/")?;
//! fs.set_write_location("/srv/saves")?;
//!
//! fs.write_file("/config/settings.toml", Some(b"volume = 3"))?;
//! let bytes = fs.read_file("/config/settings.toml")?;
//! assert_eq!(bytes, b"volume = 3");
//! # Ok::<(), mountfs_core::VfsError>(())
//! ```

use crate::config::FileSystemConfig;
use crate::entry::{ConflictPolicy, Directory, FileEntry, PhysicalFileInfo};
use crate::error::{Result, VfsError};
use crate::mask::NameMask;
use crate::mount_point::MountPoint;
use crate::path::{VirtualPath, absolute_physical, physical_eq};
use crate::provider::{
    EnumerationContext, FileStream, PluginCatalog, Provider, ProviderRegistry, ProviderResolver,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A virtual file system composed of mounted physical locations.
///
/// Mutating operations take `&mut self`; callers sharing a file system
/// between threads serialize them behind their own lock. Entries handed
/// out by lookups are shared nodes and stay valid (and up to date) across
/// refreshes for as long as their path exists.
#[derive(Debug)]
pub struct FileSystem {
    root: Arc<Directory>,
    registry: ProviderRegistry,
    mounts: Vec<MountPoint>,
    // `None` marks the snapshot as stale.
    snapshot: Mutex<Option<Arc<[MountPoint]>>>,
    write_location: Option<PathBuf>,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    /// Creates an empty, read-only file system with no plug-ins installed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(PluginCatalog::new()))
    }

    /// Creates an empty file system that loads plug-ins from `resolver`.
    #[must_use]
    pub fn with_resolver(resolver: Arc<dyn ProviderResolver>) -> Self {
        Self {
            root: Directory::new_root(),
            registry: ProviderRegistry::new(resolver),
            mounts: Vec::new(),
            snapshot: Mutex::new(None),
            write_location: None,
        }
    }

    /// Builds a file system from a configuration.
    ///
    /// Providers are loaded first, then the write location is applied, then
    /// every mount in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by validation, provider loading,
    /// write location setup or mounting.
    pub fn from_config(
        config: &FileSystemConfig,
        resolver: Arc<dyn ProviderResolver>,
    ) -> Result<Self> {
        config.validate()?;

        let mut fs = Self::with_resolver(resolver);
        for type_name in &config.providers {
            fs.add_provider(type_name)?;
        }

        if let Some(location) = &config.write_location {
            if !config.create_write_location && !location.is_dir() {
                return Err(VfsError::PhysicalPathNotFound {
                    path: location.clone(),
                });
            }
            fs.set_write_location(location)?;
        }

        for mount in &config.mounts {
            fs.mount(&mount.physical_path, &mount.mount_location)?;
        }

        Ok(fs)
    }

    /// Returns the root directory.
    #[must_use]
    pub const fn root(&self) -> &Arc<Directory> {
        &self.root
    }

    /// Returns the loaded providers.
    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Returns the recorded mount points, oldest first.
    ///
    /// The write location is not part of the list.
    #[must_use]
    pub fn mount_points(&self) -> Arc<[MountPoint]> {
        let mut snapshot = self.snapshot.lock();
        Arc::clone(snapshot.get_or_insert_with(|| self.mounts.iter().cloned().collect()))
    }

    fn invalidate_mount_points(&self) {
        *self.snapshot.lock() = None;
    }

    /// Returns the physical directory that receives writes, if any.
    #[must_use]
    pub fn write_location(&self) -> Option<&Path> {
        self.write_location.as_deref()
    }

    /// Sets the write location, creating the directory if it is missing,
    /// and rebuilds the tree so the new location takes top precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the rebuild
    /// fails.
    pub fn set_write_location(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let location = absolute_physical(path.as_ref())?;
        if !location.is_dir() {
            fs::create_dir_all(&location).map_err(|e| VfsError::io(&location, e))?;
        }

        tracing::info!("Write location set to {}", location.display());
        self.write_location = Some(location);
        self.refresh()
    }

    /// Makes the file system read-only and removes the written content from
    /// the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuild fails.
    pub fn clear_write_location(&mut self) -> Result<()> {
        if self.write_location.take().is_some() {
            tracing::info!("Write location cleared");
            return self.refresh();
        }
        Ok(())
    }

    fn write_mount(&self) -> Result<Option<MountPoint>> {
        self.write_location
            .as_ref()
            .map(|location| MountPoint::new(location.clone(), "/"))
            .transpose()
    }

    /// Merges the write location into `root` at `/`.
    fn apply_write_location(&self, root: &Arc<Directory>) -> Result<()> {
        let Some(mount) = self.write_mount()? else {
            return Ok(());
        };
        if !mount.physical_path().is_dir() {
            fs::create_dir_all(mount.physical_path())
                .map_err(|e| VfsError::io(mount.physical_path(), e))?;
        }
        let folder = Arc::clone(self.registry.folder_provider());
        Self::enumerate_into(root, &mount, &folder)
    }

    fn enumerate_into(
        root: &Arc<Directory>,
        mount: &MountPoint,
        provider: &Arc<dyn Provider>,
    ) -> Result<()> {
        let mut context = EnumerationContext::new(root, Arc::clone(provider), mount)?;
        provider.enumerate(mount.physical_path(), &mut context)
    }

    /// Picks the provider for a physical location: the folder provider for
    /// directories, otherwise the first provider that claims the file.
    fn provider_for(&self, physical_path: &Path) -> Result<Arc<dyn Provider>> {
        if physical_path.is_dir() {
            return Ok(Arc::clone(self.registry.folder_provider()));
        }
        if !physical_path.is_file() {
            return Err(VfsError::PhysicalPathNotFound {
                path: physical_path.to_path_buf(),
            });
        }

        for provider in self.registry.iter() {
            match provider.can_read_file(physical_path) {
                Ok(true) => return Ok(Arc::clone(provider)),
                Ok(false) => {}
                Err(e) => tracing::debug!(
                    "Provider {} failed to inspect {}: {}",
                    provider.type_name(),
                    physical_path.display(),
                    e
                ),
            }
        }

        Err(VfsError::UnreadableFile {
            path: physical_path.to_path_buf(),
        })
    }

    /// Mounts a directory or packed file under `mount_path`.
    ///
    /// Mounting the write location itself only re-applies it and returns
    /// its synthetic mount point at `/`. Mounting an already recorded pair
    /// merges it again without recording it twice.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::PhysicalPathNotFound`] if the target does not
    /// exist, [`VfsError::UnreadableFile`] if no provider claims a file, or
    /// any error raised while enumerating.
    pub fn mount(&mut self, physical_path: impl AsRef<Path>, mount_path: &str) -> Result<MountPoint> {
        let physical = absolute_physical(physical_path.as_ref())?;

        if let Some(location) = &self.write_location
            && physical_eq(&physical, location)
        {
            let mount = MountPoint::new(location.clone(), "/")?;
            self.apply_write_location(&self.root)?;
            return Ok(mount);
        }

        let mount = MountPoint::new(physical.clone(), mount_path)?;
        let provider = self.provider_for(&physical)?;
        Self::enumerate_into(&self.root, &mount, &provider)?;

        if self.mounts.contains(&mount) {
            tracing::debug!("Mount point {} already recorded", mount);
        } else {
            self.mounts.push(mount.clone());
            self.invalidate_mount_points();
        }
        tracing::info!("Mounted {} using {}", mount, provider.type_name());

        self.apply_write_location(&self.root)?;
        Ok(mount)
    }

    /// Mounts a directory or packed file at `/`.
    ///
    /// # Errors
    ///
    /// See [`FileSystem::mount`].
    pub fn mount_root(&mut self, physical_path: impl AsRef<Path>) -> Result<MountPoint> {
        self.mount(physical_path, "/")
    }

    /// Mounts the location described by an existing mount point.
    ///
    /// # Errors
    ///
    /// See [`FileSystem::mount`].
    pub fn mount_point(&mut self, mount: &MountPoint) -> Result<MountPoint> {
        self.mount(mount.physical_path(), mount.mount_location())
    }

    /// Removes a mount point and rebuilds the tree.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::MountPointNotFound`] if the mount point is not
    /// recorded, or any error raised by the rebuild.
    pub fn unmount(&mut self, mount: &MountPoint) -> Result<()> {
        let normalized = MountPoint::new(
            absolute_physical(mount.physical_path())?,
            mount.mount_location(),
        )?;
        let index = self
            .mounts
            .iter()
            .position(|m| *m == normalized)
            .ok_or_else(|| VfsError::MountPointNotFound {
                physical_path: mount.physical_path().to_path_buf(),
                mount_location: mount.mount_location().to_string(),
            })?;

        let removed = self.mounts.remove(index);
        self.invalidate_mount_points();
        tracing::info!("Unmounted {}", removed);
        self.refresh()
    }

    /// Removes every mount point of a physical location and rebuilds the
    /// tree.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::MountPointNotFound`] if the location is not
    /// mounted anywhere, or any error raised by the rebuild.
    pub fn unmount_physical(&mut self, physical_path: impl AsRef<Path>) -> Result<()> {
        let physical = absolute_physical(physical_path.as_ref())?;
        let before = self.mounts.len();
        self.mounts
            .retain(|m| !physical_eq(m.physical_path(), &physical));

        if self.mounts.len() == before {
            return Err(VfsError::MountPointNotFound {
                physical_path: physical,
                mount_location: "*".to_string(),
            });
        }

        self.invalidate_mount_points();
        tracing::info!(
            "Unmounted {} mount point(s) of {}",
            before - self.mounts.len(),
            physical.display()
        );
        self.refresh()
    }

    /// Replays matching mounts oldest first, then the write location, into
    /// `root`. Stops at the first failing mount but still applies the write
    /// location.
    fn replay(&self, root: &Arc<Directory>, relevant: impl Fn(&MountPoint) -> bool) -> Result<()> {
        let mut failure = None;
        for mount in self.mounts.iter().filter(|&mount| relevant(mount)) {
            let outcome = self
                .provider_for(mount.physical_path())
                .and_then(|provider| Self::enumerate_into(root, mount, &provider));
            if let Err(e) = outcome {
                tracing::warn!("Failed to replay mount {}: {}", mount, e);
                failure = Some(e);
                break;
            }
        }

        self.apply_write_location(root)?;
        failure.map_or(Ok(()), Err)
    }

    /// Rebuilds the tree from the mount list.
    ///
    /// Entries that survive the rebuild keep their identity and take the
    /// metadata of the mount that now provides them.
    ///
    /// # Errors
    ///
    /// Returns the first replay error. The tree still reflects every mount
    /// replayed before the failure, plus the write location.
    pub fn refresh(&mut self) -> Result<()> {
        let scratch = Directory::new_root();
        let result = self.replay(&scratch, |_| true);
        self.root.reconcile(&scratch, true);

        tracing::info!(
            "Refreshed {} mount point(s): {} directories, {} files",
            self.mounts.len(),
            self.root.directory_count(),
            self.root.file_count(true)
        );
        result
    }

    /// Re-reads the content of one directory from the mounts that reach it.
    ///
    /// Files are updated in place, added or removed so that the directory
    /// matches what a full [`FileSystem::refresh`] would produce. With
    /// `include_children` the same happens for every subdirectory;
    /// otherwise subdirectories are only added.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::DirectoryNotFound`] if the directory is not part
    /// of this file system, or the first replay error.
    pub fn refresh_directory(&mut self, directory: &Arc<Directory>, include_children: bool) -> Result<()> {
        let path = directory.full_path();
        let target = VirtualPath::parse(&path)?;
        let live = self
            .root
            .find_directory(target.segments())
            .filter(|found| Arc::ptr_eq(found, directory))
            .ok_or_else(|| VfsError::DirectoryNotFound { path: path.clone() })?;

        let scratch = Directory::new_root();
        let result = self.replay(&scratch, |mount| {
            VirtualPath::parse(mount.mount_location()).is_ok_and(|location| {
                location.is_ancestor_of(&target) || target.is_ancestor_of(&location)
            })
        });

        let source = scratch
            .find_directory(target.segments())
            .unwrap_or_else(Directory::new_root);
        live.reconcile(&source, include_children);

        tracing::debug!("Refreshed directory {}", path);
        result
    }

    /// Drops every mount point and empties the tree.
    pub fn clear(&mut self) {
        self.root.clear();
        self.mounts.clear();
        self.invalidate_mount_points();
        tracing::info!("Cleared all mount points");
    }

    /// Loads a provider plug-in by type name.
    ///
    /// # Errors
    ///
    /// See [`ProviderRegistry::add`].
    pub fn add_provider(&mut self, type_name: &str) -> Result<Arc<dyn Provider>> {
        self.registry.add(type_name)
    }

    /// Adds an already created provider.
    pub fn add_provider_instance(&mut self, provider: Arc<dyn Provider>) -> Arc<dyn Provider> {
        self.registry.add_instance(provider)
    }

    /// Loads every plug-in the resolver knows about.
    ///
    /// # Errors
    ///
    /// Returns the first plug-in that fails to load.
    pub fn add_all_providers(&mut self) -> Result<Vec<Arc<dyn Provider>>> {
        let names = self.registry.resolver().provider_names();
        names.iter().map(|name| self.registry.add(name)).collect()
    }

    /// Unloads a provider by type name, removing every file it served.
    ///
    /// Returns `false` if nothing was removed; the folder provider is never
    /// removed.
    pub fn remove_provider(&mut self, type_name: &str) -> bool {
        let removed = self.registry.remove(type_name);
        self.forget_provider(removed)
    }

    /// Unloads the provider at `index`, removing every file it served.
    pub fn remove_provider_at(&mut self, index: usize) -> bool {
        let removed = self.registry.remove_at(index);
        self.forget_provider(removed)
    }

    /// Unloads this exact provider instance, removing every file it served.
    pub fn remove_provider_instance(&mut self, provider: &Arc<dyn Provider>) -> bool {
        let removed = self.registry.remove_instance(provider);
        self.forget_provider(removed)
    }

    fn forget_provider(&mut self, removed: Option<Arc<dyn Provider>>) -> bool {
        let Some(provider) = removed else {
            return false;
        };

        let files = self.root.remove_files_of(&provider);
        self.drop_unreadable_mounts();
        tracing::info!(
            "Removed provider {} and {} of its files",
            provider.type_name(),
            files
        );
        true
    }

    /// Forgets packed-file mounts that no loaded provider can read anymore,
    /// so later refreshes do not trip over them.
    fn drop_unreadable_mounts(&mut self) {
        let before = self.mounts.len();
        let mounts = std::mem::take(&mut self.mounts);
        self.mounts = mounts
            .into_iter()
            .filter(|mount| {
                let unreadable = matches!(
                    self.provider_for(mount.physical_path()),
                    Err(VfsError::UnreadableFile { .. })
                );
                if unreadable {
                    tracing::warn!("Dropping mount point {}: no provider can read it", mount);
                }
                !unreadable
            })
            .collect();
        if self.mounts.len() != before {
            self.invalidate_mount_points();
        }
    }

    /// Unloads every provider but the folder provider and clears the tree
    /// and mount list. The write location stays in effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the write location cannot be re-applied.
    pub fn clear_providers(&mut self) -> Result<()> {
        let removed = self.registry.clear();
        tracing::info!("Unloaded {} provider(s)", removed.len());
        self.clear();
        self.apply_write_location(&self.root)
    }

    /// Looks up a directory. Missing directories are `Ok(None)`.
    ///
    /// `"foo/bar"`, `"/foo/bar"` and `"/foo/bar/"` name the same directory,
    /// and lookups ignore case.
    ///
    /// # Errors
    ///
    /// Returns an argument error if the path cannot be parsed.
    pub fn get_directory(&self, path: &str) -> Result<Option<Arc<Directory>>> {
        let path = VirtualPath::parse(path)?;
        Ok(self.root.find_directory(path.segments()))
    }

    /// Looks up a file. Missing files are `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an argument error if the path cannot be parsed or has no
    /// file name.
    pub fn get_file(&self, path: &str) -> Result<Option<Arc<FileEntry>>> {
        let virtual_path = VirtualPath::parse(path)?;
        let name = require_file_name(&virtual_path, path)?;
        Ok(self
            .root
            .find_directory(virtual_path.parent_segments())
            .and_then(|dir| dir.file(name)))
    }

    fn existing_file(&self, path: &str) -> Result<Arc<FileEntry>> {
        self.get_file(path)?.ok_or_else(|| VfsError::FileNotFound {
            path: path.to_string(),
        })
    }

    /// Reads the complete content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::FileNotFound`] if the file does not exist, or the
    /// provider's read error.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.existing_file(path)?;
        file.provider().read_file(&file)
    }

    /// Writes a file into the write location and registers it in the tree.
    ///
    /// With `None` only the entry is registered and nothing is written. An
    /// existing entry keeps its identity and is switched over to the
    /// written copy.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::NoWriteLocation`] if the file system is
    /// read-only, [`VfsError::EntryConflict`] if a directory has that path,
    /// or the I/O error raised while writing.
    pub fn write_file(&mut self, path: &str, data: Option<&[u8]>) -> Result<Arc<FileEntry>> {
        let virtual_path = VirtualPath::parse(path)?;
        let name = require_file_name(&virtual_path, path)?;
        let physical = self.get_write_path(path)?;

        let size = match data {
            Some(bytes) => u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            None => fs::metadata(&physical).map_or(0, |m| m.len()),
        };
        let pending = self.register_write(&virtual_path, name, physical, size)?;

        if let Some(bytes) = data
            && let Err(e) = self
                .registry
                .folder_provider()
                .write_file(&pending.entry, bytes)
        {
            pending.rollback();
            return Err(e);
        }

        tracing::debug!("Wrote {} ({} bytes)", pending.entry.full_path(), size);
        Ok(pending.entry)
    }

    /// Opens a stream over a file.
    ///
    /// Read streams require an existing file and come from its provider.
    /// Write streams go to the write location: the entry is created if
    /// needed, the physical file is truncated, and the entry's size is
    /// updated when the stream is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::FileNotFound`] for a missing file in read mode,
    /// [`VfsError::NoWriteLocation`] in write mode on a read-only file
    /// system, or the provider's error.
    pub fn open_stream(&mut self, path: &str, writeable: bool) -> Result<FileStream> {
        if !writeable {
            let file = self.existing_file(path)?;
            return file.provider().open_stream(&file, false);
        }

        let virtual_path = VirtualPath::parse(path)?;
        let name = require_file_name(&virtual_path, path)?;
        let physical = self.get_write_path(path)?;
        let pending = self.register_write(&virtual_path, name, physical, 0)?;

        match self
            .registry
            .folder_provider()
            .open_stream(&pending.entry, true)
        {
            Ok(stream) => {
                tracing::debug!("Opened write stream for {}", pending.entry.full_path());
                Ok(stream.track(Arc::clone(&pending.entry)))
            }
            Err(e) => {
                pending.rollback();
                Err(e)
            }
        }
    }

    fn register_write(
        &self,
        virtual_path: &VirtualPath,
        name: &str,
        physical: PathBuf,
        size: u64,
    ) -> Result<PendingWrite> {
        let mount = self.write_mount()?.ok_or_else(|| VfsError::NoWriteLocation {
            operation: format!("write '{virtual_path}'"),
        })?;
        let directory = self
            .root
            .ensure_directory(virtual_path.parent_segments(), ConflictPolicy::Fail)?;
        let previous = directory
            .file(name)
            .map(|file| (file.provider(), file.mount_point(), file.physical_info()));

        let entry = directory.upsert_file(
            name,
            Arc::clone(self.registry.folder_provider()),
            mount,
            PhysicalFileInfo::new(physical, size, Utc::now()),
            ConflictPolicy::Fail,
        )?;

        Ok(PendingWrite { entry, previous })
    }

    /// Creates a directory and any missing parents, mirroring it into the
    /// write location when one is set.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an invalid path or when a file already
    /// has one of the names, or the I/O error raised while creating the
    /// physical mirror.
    pub fn create_directory(&mut self, path: &str) -> Result<Arc<Directory>> {
        let virtual_path = VirtualPath::parse(path)?;
        let directory = self
            .root
            .ensure_directory(virtual_path.segments(), ConflictPolicy::Fail)?;

        if let Some(mirror) = self.physical_mirror(virtual_path.segments()) {
            fs::create_dir_all(&mirror).map_err(|e| VfsError::io(&mirror, e))?;
        }

        tracing::debug!("Created directory {}", directory.full_path());
        Ok(directory)
    }

    /// Removes a file from the tree, deleting its copy in the write
    /// location if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::FileNotFound`] if the file does not exist, or the
    /// I/O error raised while deleting the physical copy.
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        let file = self.existing_file(path)?;
        let virtual_path = VirtualPath::parse(path)?;

        if let Some(mirror) = self.physical_mirror(virtual_path.segments()) {
            remove_if_present(&mirror, |p| fs::remove_file(p))?;
        }

        if let Some(directory) = file.directory() {
            directory.remove_file(file.name());
        }
        tracing::debug!("Deleted file {}", file.full_path());
        Ok(())
    }

    /// Removes a directory and everything below it, deleting its mirror in
    /// the write location if there is one.
    ///
    /// Deleting `/` empties the tree (and the write location) but keeps the
    /// root itself.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::DirectoryNotFound`] if the directory does not
    /// exist, or the I/O error raised while deleting the physical mirror.
    pub fn delete_directory(&mut self, path: &str) -> Result<()> {
        let virtual_path = VirtualPath::parse(path)?;
        let directory = self
            .root
            .find_directory(virtual_path.segments())
            .ok_or_else(|| VfsError::DirectoryNotFound {
                path: path.to_string(),
            })?;

        if virtual_path.is_root() {
            if let Some(location) = &self.write_location {
                clear_physical_directory(location)?;
            }
            self.root.clear();
            tracing::debug!("Deleted the content of /");
            return Ok(());
        }

        if let Some(mirror) = self.physical_mirror(virtual_path.segments()) {
            remove_if_present(&mirror, |p| fs::remove_dir_all(p))?;
        }
        if let Some(parent) = directory.parent() {
            parent.remove_directory(directory.name());
        }

        tracing::debug!("Deleted directory {}", directory.full_path());
        Ok(())
    }

    /// Searches the whole tree for files whose name matches `mask`.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an empty mask.
    pub fn find_files(&self, mask: &str, recursive: bool) -> Result<Vec<Arc<FileEntry>>> {
        self.find_files_in("/", mask, recursive)
    }

    /// Searches a directory for files whose name matches `mask`.
    ///
    /// With `recursive`, matches in subdirectories come before the matches
    /// of the directory itself.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::DirectoryNotFound`] if the start directory does
    /// not exist, or an argument error for an invalid path or mask.
    pub fn find_files_in(
        &self,
        path: &str,
        mask: &str,
        recursive: bool,
    ) -> Result<Vec<Arc<FileEntry>>> {
        let start = self.search_start(path)?;
        let mask = NameMask::new(mask)?;
        let mut found = Vec::new();
        collect_files(&start, &mask, recursive, &mut found);
        Ok(found)
    }

    /// Searches the whole tree for directories whose name matches `mask`.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an empty mask.
    pub fn find_directories(&self, mask: &str, recursive: bool) -> Result<Vec<Arc<Directory>>> {
        self.find_directories_in("/", mask, recursive)
    }

    /// Searches below a directory for directories whose name matches `mask`.
    ///
    /// Each match comes before the matches found beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::DirectoryNotFound`] if the start directory does
    /// not exist, or an argument error for an invalid path or mask.
    pub fn find_directories_in(
        &self,
        path: &str,
        mask: &str,
        recursive: bool,
    ) -> Result<Vec<Arc<Directory>>> {
        let start = self.search_start(path)?;
        let mask = NameMask::new(mask)?;
        let mut found = Vec::new();
        collect_directories(&start, &mask, recursive, &mut found);
        Ok(found)
    }

    fn search_start(&self, path: &str) -> Result<Arc<Directory>> {
        self.get_directory(path)?
            .ok_or_else(|| VfsError::DirectoryNotFound {
                path: path.to_string(),
            })
    }

    /// Maps a virtual path onto the write location.
    ///
    /// The physical directory is created if it does not exist. A path with
    /// a file name maps to that file inside it.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::NoWriteLocation`] if the file system is
    /// read-only, or the I/O error raised while creating the directory.
    pub fn get_write_path(&self, path: &str) -> Result<PathBuf> {
        let virtual_path = VirtualPath::parse(path)?;
        let directory = self
            .physical_mirror(virtual_path.parent_segments())
            .ok_or_else(|| VfsError::NoWriteLocation {
                operation: format!("resolve a write path for '{path}'"),
            })?;

        if !directory.is_dir() {
            fs::create_dir_all(&directory).map_err(|e| VfsError::io(&directory, e))?;
        }

        Ok(match virtual_path.file_name() {
            Some(name) => directory.join(name),
            None => directory,
        })
    }

    fn physical_mirror(&self, segments: &[String]) -> Option<PathBuf> {
        let mut path = self.write_location.clone()?;
        path.extend(segments);
        Some(path)
    }
}

/// A freshly registered write target, undone if the physical write fails.
struct PendingWrite {
    entry: Arc<FileEntry>,
    previous: Option<(Arc<dyn Provider>, MountPoint, PhysicalFileInfo)>,
}

impl PendingWrite {
    fn rollback(self) {
        match self.previous {
            Some((provider, mount, physical)) => self.entry.update(provider, mount, physical),
            None => {
                if let Some(directory) = self.entry.directory() {
                    directory.remove_file(self.entry.name());
                }
            }
        }
    }
}

fn require_file_name<'a>(virtual_path: &'a VirtualPath, raw: &str) -> Result<&'a str> {
    virtual_path
        .file_name()
        .ok_or_else(|| VfsError::InvalidPath {
            path: raw.to_string(),
            reason: "a file path needs a file name".to_string(),
        })
}

fn remove_if_present(path: &Path, remove: fn(&Path) -> io::Result<()>) -> Result<()> {
    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VfsError::io(path, e)),
    }
}

fn clear_physical_directory(path: &Path) -> Result<()> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(VfsError::io(path, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| VfsError::io(path, e))?;
        let child = entry.path();
        let is_dir = entry
            .file_type()
            .map_err(|e| VfsError::io(&child, e))?
            .is_dir();
        if is_dir {
            remove_if_present(&child, |p| fs::remove_dir_all(p))?;
        } else {
            remove_if_present(&child, |p| fs::remove_file(p))?;
        }
    }
    Ok(())
}

fn collect_files(
    directory: &Arc<Directory>,
    mask: &NameMask,
    recursive: bool,
    found: &mut Vec<Arc<FileEntry>>,
) {
    if recursive {
        for child in directory.directories() {
            collect_files(&child, mask, true, found);
        }
    }
    found.extend(directory.files().into_iter().filter(|f| mask.matches(f.name())));
}

fn collect_directories(
    directory: &Arc<Directory>,
    mask: &NameMask,
    recursive: bool,
    found: &mut Vec<Arc<Directory>>,
) {
    for child in directory.directories() {
        if mask.matches(child.name()) {
            found.push(Arc::clone(&child));
        }
        if recursive {
            collect_directories(&child, mask, true, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_file_system_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileSystem>();
        assert_send_sync::<Directory>();
        assert_send_sync::<FileEntry>();
    }

    #[test]
    fn test_new_is_empty() {
        let fs = FileSystem::new();
        assert!(fs.root().is_empty());
        assert!(fs.mount_points().is_empty());
        assert!(fs.write_location().is_none());
        assert_eq!(fs.providers().len(), 1);
    }

    #[test]
    fn test_mount_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "a");
        write(temp.path(), "sub/b.txt", "b");

        let mut fs = FileSystem::new();
        let mount = fs.mount(temp.path(), "/").unwrap();

        assert_eq!(mount.mount_location(), "/");
        assert_eq!(fs.read_file("/a.txt").unwrap(), b"a");
        assert_eq!(fs.read_file("/sub/b.txt").unwrap(), b"b");
        assert_eq!(fs.mount_points().len(), 1);
    }

    #[test]
    fn test_mount_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let mut fs = FileSystem::new();

        let err = fs.mount(temp.path().join("missing"), "/").unwrap_err();
        assert!(err.is_not_found());
        assert!(fs.mount_points().is_empty());
    }

    #[test]
    fn test_mount_unreadable_file_fails() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "blob.bin", "???");

        let mut fs = FileSystem::new();
        let err = fs.mount(temp.path().join("blob.bin"), "/").unwrap_err();
        assert!(err.is_io_error());
    }

    #[test]
    fn test_mount_points_snapshot_is_rebuilt() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let mut fs = FileSystem::new();

        fs.mount(a.path(), "/").unwrap();
        let first = fs.mount_points();
        assert!(Arc::ptr_eq(&first, &fs.mount_points()));

        fs.mount(b.path(), "/b").unwrap();
        let second = fs.mount_points();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].mount_location(), "/b/");
    }

    #[test]
    fn test_mount_write_location_is_synthetic() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        let mount = fs.mount(write.path(), "/elsewhere").unwrap();

        assert_eq!(mount.mount_location(), "/");
        assert!(fs.mount_points().is_empty());
    }

    #[test]
    fn test_unmount_unknown_fails() {
        let temp = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        let mount = MountPoint::new(temp.path(), "/").unwrap();

        let err = fs.unmount(&mount).unwrap_err();
        assert!(matches!(err, VfsError::MountPointNotFound { .. }));
        assert!(err.is_io_error());
    }

    #[test]
    fn test_unmount_physical_removes_every_location() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "a");
        let mut fs = FileSystem::new();
        fs.mount(temp.path(), "/one").unwrap();
        fs.mount(temp.path(), "/two").unwrap();

        fs.unmount_physical(temp.path()).unwrap();

        assert!(fs.mount_points().is_empty());
        assert!(fs.root().is_empty());
    }

    #[test]
    fn test_get_file_requires_name() {
        let fs = FileSystem::new();
        assert!(fs.get_file("/dir/").unwrap_err().is_argument_error());
        assert!(fs.get_file("/").unwrap_err().is_argument_error());
        assert!(fs.get_file("/missing.txt").unwrap().is_none());
    }

    #[test]
    fn test_get_directory_root() {
        let fs = FileSystem::new();
        let root = fs.get_directory("/").unwrap().unwrap();
        assert!(Arc::ptr_eq(&root, fs.root()));
        assert!(fs.get_directory("/nope").unwrap().is_none());
    }

    #[test]
    fn test_read_missing_file_fails() {
        let fs = FileSystem::new();
        assert!(fs.read_file("/missing.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_write_without_location_fails() {
        let mut fs = FileSystem::new();
        let err = fs.write_file("/a.txt", Some(b"data")).unwrap_err();
        assert!(err.is_invalid_operation());
        assert!(fs.get_file("/a.txt").unwrap().is_none());

        let err = fs.open_stream("/a.txt", true).unwrap_err();
        assert!(err.is_invalid_operation());
        assert!(fs.get_write_path("/a.txt").unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_write_file_registers_entry() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        let entry = fs.write_file("/saves/slot1.dat", Some(b"12345")).unwrap();

        assert_eq!(entry.size(), 5);
        assert_eq!(entry.full_path(), "/saves/slot1.dat");
        assert_eq!(
            fs::read(write.path().join("saves/slot1.dat")).unwrap(),
            b"12345"
        );
        assert!(Arc::ptr_eq(
            &entry.provider(),
            fs.providers().folder_provider()
        ));
    }

    #[test]
    fn test_write_file_none_only_registers() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        let entry = fs.write_file("/pending.txt", None).unwrap();

        assert_eq!(entry.size(), 0);
        assert!(!write.path().join("pending.txt").exists());
        assert!(fs.get_file("/pending.txt").unwrap().is_some());
    }

    #[test]
    fn test_write_file_empty_creates_file() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        fs.write_file("/empty.txt", Some(&[])).unwrap();

        let metadata = fs::metadata(write.path().join("empty.txt")).unwrap();
        assert_eq!(metadata.len(), 0);
    }

    #[test]
    fn test_write_file_over_directory_conflicts() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();
        fs.create_directory("/thing").unwrap();

        let err = fs.write_file("/thing", Some(b"x")).unwrap_err();
        assert!(matches!(err, VfsError::EntryConflict { .. }));
    }

    #[test]
    fn test_write_stream_updates_size_on_drop() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        {
            let mut stream = fs.open_stream("/log.txt", true).unwrap();
            stream.write_all(b"hello world").unwrap();
        }

        let entry = fs.get_file("/log.txt").unwrap().unwrap();
        assert_eq!(entry.size(), 11);

        let mut text = String::new();
        fs.open_stream("/log.txt", false)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_read_stream_of_missing_file_fails() {
        let mut fs = FileSystem::new();
        assert!(fs.open_stream("/nope", false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_directory_mirrors_physically() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        let dir = fs.create_directory("/a/b/c").unwrap();

        assert_eq!(dir.full_path(), "/a/b/c/");
        assert!(write.path().join("a/b/c").is_dir());
    }

    #[test]
    fn test_create_directory_strips_illegal_characters() {
        let mut fs = FileSystem::new();
        let dir = fs.create_directory("/we<ir>d/").unwrap();
        assert_eq!(dir.name(), "weird");
    }

    #[test]
    fn test_delete_file() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();
        fs.write_file("/a.txt", Some(b"a")).unwrap();

        fs.delete_file("/a.txt").unwrap();

        assert!(fs.get_file("/a.txt").unwrap().is_none());
        assert!(!write.path().join("a.txt").exists());
        assert!(fs.delete_file("/a.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_directory() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();
        fs.write_file("/a/b/c.txt", Some(b"c")).unwrap();

        fs.delete_directory("/a/b").unwrap();

        assert!(fs.get_directory("/a/b").unwrap().is_none());
        assert!(fs.get_directory("/a").unwrap().is_some());
        assert!(!write.path().join("a/b").exists());
        assert!(fs.delete_directory("/a/b").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_root_keeps_root() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();
        fs.write_file("/x/y.txt", Some(b"y")).unwrap();
        fs.write_file("/z.txt", Some(b"z")).unwrap();

        fs.delete_directory("/").unwrap();

        assert!(fs.root().is_empty());
        assert!(write.path().is_dir());
        assert_eq!(fs::read_dir(write.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_get_write_path() {
        let write = TempDir::new().unwrap();
        let mut fs = FileSystem::new();
        fs.set_write_location(write.path()).unwrap();

        let path = fs.get_write_path("/deep/er/file.bin").unwrap();

        assert!(path.ends_with("deep/er/file.bin"));
        assert!(write.path().join("deep/er").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_find_directories_pre_order() {
        let mut fs = FileSystem::new();
        fs.create_directory("/build/build-a").unwrap();
        fs.create_directory("/src/build").unwrap();

        let found = fs.find_directories("build*", true).unwrap();
        let paths: Vec<String> = found.iter().map(|d| d.full_path()).collect();
        assert_eq!(paths, vec!["/build/", "/build/build-a/", "/src/build/"]);

        let shallow = fs.find_directories("build*", false).unwrap();
        assert_eq!(shallow.len(), 1);
    }

    #[test]
    fn test_find_in_missing_directory_fails() {
        let fs = FileSystem::new();
        assert!(fs.find_files_in("/nope", "*", true).unwrap_err().is_not_found());
        assert!(
            fs.find_directories_in("/nope", "*", true)
                .unwrap_err()
                .is_not_found()
        );
        assert!(fs.find_files("", true).unwrap_err().is_argument_error());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "a");
        let mut fs = FileSystem::new();
        fs.mount(temp.path(), "/").unwrap();

        fs.clear();

        assert!(fs.root().is_empty());
        assert!(fs.mount_points().is_empty());
    }

    #[test]
    fn test_refresh_directory_picks_up_new_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/a.txt", "a");
        let mut fs = FileSystem::new();
        fs.mount(temp.path(), "/").unwrap();

        write(temp.path(), "data/b.txt", "b");
        fs::remove_file(temp.path().join("data/a.txt")).unwrap();
        let data = fs.get_directory("/data").unwrap().unwrap();
        fs.refresh_directory(&data, false).unwrap();

        assert!(data.file("a.txt").is_none());
        assert_eq!(fs.read_file("/data/b.txt").unwrap(), b"b");
    }

    #[test]
    fn test_refresh_directory_rejects_foreign_directory() {
        let mut fs = FileSystem::new();
        let foreign = Directory::new_root();
        fs.create_directory("/a").unwrap();
        let detached = foreign
            .ensure_directory(&["a".to_string()], ConflictPolicy::Fail)
            .unwrap();

        let err = fs.refresh_directory(&detached, true).unwrap_err();
        assert!(err.is_not_found());
    }
}
