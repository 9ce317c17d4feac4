//! Virtual file system that composes physical sources into one tree.
//!
//! Plain directories and packed files are mounted under virtual
//! directories; the result is a single, case-insensitive, `/`-rooted
//! namespace. Reads go to whichever mount provided a file last, and every
//! write lands in one physical write location that shadows all mounts.
//!
//! # Features
//!
//! - **Mount precedence**: later mounts shadow earlier ones for the same path
//! - **Write redirection**: written files always win, whatever the mount order
//! - **Pluggable formats**: providers enumerate and read new storage formats
//! - **Stable entries**: file entries are updated in place across refreshes
//!
//! # Examples
//!
//! ```
//! use mountfs_core::FileSystem;
//! use std::fs;
//!
//! let base = tempfile::tempdir()?;
//! let saves = tempfile::tempdir()?;
//! fs::write(base.path().join("readme.txt"), "original")?;
//!
//! let mut vfs = FileSystem::new();
//! vfs.mount(base.path(), "/")?;
//! assert_eq!(vfs.read_file("/README.TXT")?, b"original");
//!
//! vfs.set_write_location(saves.path())?;
//! vfs.write_file("/readme.txt", Some(b"edited"))?;
//! vfs.refresh()?;
//! assert_eq!(vfs.read_file("/readme.txt")?, b"edited");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod entry;
pub mod error;
pub mod filesystem;
pub mod mask;
pub mod mount_point;
pub mod path;
pub mod provider;

pub use config::{FileSystemConfig, FileSystemConfigBuilder, MountConfig};
pub use entry::{Directory, FileEntry, PhysicalFileInfo};
pub use error::{Result, VfsError};
pub use filesystem::FileSystem;
pub use mask::NameMask;
pub use mount_point::MountPoint;
pub use path::VirtualPath;
pub use provider::{
    EnumerationContext, FileStream, FolderProvider, PluginCatalog, Provider, ProviderFactory,
    ProviderRegistry, ProviderResolver, StreamHandle,
};
