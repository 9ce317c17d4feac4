//! Provider contract.
//!
//! A [`Provider`] knows one physical storage format. It enumerates a
//! physical location into the virtual tree, reads file content and opens
//! streams. Providers hold no entries themselves: they register what they
//! find through the [`EnumerationContext`] the file system hands them, so
//! every entry ends up in the tree the same way.
//!
//! The built-in [`FolderProvider`] serves plain directories and is the
//! template for other formats.

mod folder;
mod registry;
mod resolver;

pub use folder::FolderProvider;
pub use registry::ProviderRegistry;
pub use resolver::{PluginCatalog, ProviderFactory, ProviderResolver};

use crate::entry::{ConflictPolicy, Directory, FileEntry, PhysicalFileInfo};
use crate::error::{Result, VfsError};
use crate::mount_point::MountPoint;
use crate::path::VirtualPath;
use chrono::Utc;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

/// A pluggable reader for one physical storage format.
///
/// Implementations must be cheap to share: the file system keeps them as
/// `Arc<dyn Provider>` and every file entry points back at the provider
/// that serves it.
///
/// # Examples
///
/// ```
/// use mountfs_core::{EnumerationContext, FileEntry, FileStream, Provider, Result};
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct EmptyProvider;
///
/// impl Provider for EmptyProvider {
///     fn can_read_file(&self, path: &Path) -> Result<bool> {
///         Ok(path.extension().is_some_and(|e| e == "empty"))
///     }
///
///     fn enumerate(&self, _path: &Path, _context: &mut EnumerationContext<'_>) -> Result<()> {
///         Ok(())
///     }
///
///     fn read_file(&self, _file: &FileEntry) -> Result<Vec<u8>> {
///         Ok(Vec::new())
///     }
///
///     fn open_stream(&self, _file: &FileEntry, writeable: bool) -> Result<FileStream> {
///         if writeable {
///             return Err(self.not_supported("write streams"));
///         }
///         Ok(FileStream::from_bytes(Vec::new()))
///     }
/// }
///
/// let provider = EmptyProvider;
/// assert!(provider.can_read_file(Path::new("a.empty"))?);
/// assert!(provider.is_read_only());
/// # Ok::<(), mountfs_core::VfsError>(())
/// ```
pub trait Provider: Send + Sync + fmt::Debug {
    /// Identity of the provider; the registry keys providers by this name.
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Human readable description of the format.
    fn description(&self) -> &str {
        ""
    }

    /// Returns `true` if the provider cannot write back to its storage.
    fn is_read_only(&self) -> bool {
        true
    }

    /// File extensions this provider usually handles, without the dot.
    fn preferred_extensions(&self) -> &[&str] {
        &[]
    }

    /// Inspects a physical file and reports whether this provider can
    /// mount it. Should look at as little of the file as possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected.
    fn can_read_file(&self, physical_path: &Path) -> Result<bool>;

    /// Registers every directory and file found at `physical_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be read.
    fn enumerate(&self, physical_path: &Path, context: &mut EnumerationContext<'_>) -> Result<()>;

    /// Returns the complete content of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read.
    fn read_file(&self, file: &FileEntry) -> Result<Vec<u8>>;

    /// Opens a seekable stream over a file.
    ///
    /// # Errors
    ///
    /// Providers that cannot write return [`VfsError::NotSupported`] when
    /// `writeable` is set.
    fn open_stream(&self, file: &FileEntry, writeable: bool) -> Result<FileStream>;

    /// Replaces the content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::NotSupported`] unless the provider overrides it.
    fn write_file(&self, file: &FileEntry, data: &[u8]) -> Result<()> {
        let _ = (file, data);
        Err(self.not_supported("writing files"))
    }

    /// Called right before the provider leaves the registry.
    fn on_unload(&self) {}

    /// Builds the not-supported error for `operation`.
    fn not_supported(&self, operation: &str) -> VfsError {
        VfsError::NotSupported {
            provider: self.type_name().to_string(),
            operation: operation.to_string(),
        }
    }
}

/// Callbacks a provider uses to populate the tree during enumeration.
///
/// The context is bound to one mount: every entry it registers is tagged
/// with that mount point and with the enumerating provider. Paths passed in
/// are virtual and absolute; [`EnumerationContext::virtual_path`] maps
/// physical paths under the mount root.
pub struct EnumerationContext<'a> {
    root: &'a Arc<Directory>,
    directory: Arc<Directory>,
    provider: Arc<dyn Provider>,
    mount_point: &'a MountPoint,
    directories_added: usize,
    files_added: usize,
}

impl<'a> EnumerationContext<'a> {
    pub(crate) fn new(
        root: &'a Arc<Directory>,
        provider: Arc<dyn Provider>,
        mount_point: &'a MountPoint,
    ) -> Result<Self> {
        let location = VirtualPath::parse(mount_point.mount_location())?;
        let directory = root.ensure_directory(location.segments(), ConflictPolicy::Replace)?;
        Ok(Self {
            root,
            directory,
            provider,
            mount_point,
            directories_added: 0,
            files_added: 0,
        })
    }

    /// Returns the mount point being enumerated.
    #[must_use]
    pub const fn mount_point(&self) -> &MountPoint {
        self.mount_point
    }

    /// Returns the directory the mount is attached to.
    #[must_use]
    pub const fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// Maps a physical path under the mount root to its virtual path.
    #[must_use]
    pub fn virtual_path(&self, physical_path: &Path) -> Option<String> {
        self.mount_point.map_to_virtual(physical_path)
    }

    /// Joins a path relative to the mount location, e.g. an entry name
    /// stored inside a packed file.
    #[must_use]
    pub fn join(&self, relative: &str) -> String {
        let mut path = self.directory.full_path();
        path.push_str(relative.trim_start_matches(['/', '\\']));
        path
    }

    /// Adds a directory (and any missing parents) to the tree.
    ///
    /// A file of the same name registered by an earlier mount is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if `virtual_path` is not a valid virtual path.
    pub fn add_directory(&mut self, virtual_path: &str) -> Result<Arc<Directory>> {
        let path = VirtualPath::parse(virtual_path)?;
        let directory = self
            .root
            .ensure_directory(path.segments(), ConflictPolicy::Replace)?;
        self.directories_added += 1;
        Ok(directory)
    }

    /// Adds a file to the tree, or updates the existing entry of that path.
    ///
    /// A directory of the same name registered by an earlier mount is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if `virtual_path` is invalid or has no file name.
    pub fn add_file(&mut self, virtual_path: &str, info: PhysicalFileInfo) -> Result<Arc<FileEntry>> {
        let path = VirtualPath::parse(virtual_path)?;
        let name = path.file_name().ok_or_else(|| VfsError::InvalidPath {
            path: virtual_path.to_string(),
            reason: "a file path needs a file name".to_string(),
        })?;
        let directory = self
            .root
            .ensure_directory(path.parent_segments(), ConflictPolicy::Replace)?;
        let entry = directory.upsert_file(
            name,
            Arc::clone(&self.provider),
            self.mount_point.clone(),
            info,
            ConflictPolicy::Replace,
        )?;
        self.files_added += 1;
        Ok(entry)
    }

    /// Returns how many directories and files were registered.
    #[must_use]
    pub const fn counts(&self) -> (usize, usize) {
        (self.directories_added, self.files_added)
    }
}

impl fmt::Debug for EnumerationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumerationContext")
            .field("mount_point", self.mount_point)
            .field("provider", &self.provider.type_name())
            .field("directories_added", &self.directories_added)
            .field("files_added", &self.files_added)
            .finish()
    }
}

/// Anything a provider can hand out as a file stream.
pub trait StreamHandle: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> StreamHandle for T {}

/// A seekable stream over a virtual file.
///
/// Streams opened for writing through the file system remember their file
/// entry; when the stream is dropped the entry's size and timestamp are
/// updated to match what was written.
pub struct FileStream {
    inner: Box<dyn StreamHandle>,
    entry: Option<Arc<FileEntry>>,
}

impl FileStream {
    /// Wraps any seekable stream.
    #[must_use]
    pub fn new(inner: impl StreamHandle + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            entry: None,
        }
    }

    /// Serves an in-memory copy of some bytes.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(io::Cursor::new(data))
    }

    pub(crate) fn track(mut self, entry: Arc<FileEntry>) -> Self {
        self.entry = Some(entry);
        self
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };

        let length = self
            .inner
            .flush()
            .and_then(|()| self.inner.seek(SeekFrom::End(0)));
        match length {
            Ok(size) => {
                entry.update_file_info(size, Utc::now());
                tracing::debug!("Closed write stream for {} ({} bytes)", entry.full_path(), size);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to finalize write stream for {}: {}",
                    entry.full_path(),
                    e
                );
            }
        }
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStream")
            .field("entry", &self.entry.as_ref().map(|e| e.full_path()))
            .finish_non_exhaustive()
    }
}
