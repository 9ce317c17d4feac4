//! Declarative file system configuration.
//!
//! A [`FileSystemConfig`] lists what a file system should look like once
//! built: which provider plug-ins to load, which physical locations to
//! mount (in order), and where writes go. It is plain serde data so that
//! front ends can keep it in a TOML or JSON file.
//!
//! # Examples
//!
//! ```
//! use mountfs_core::FileSystemConfig;
//!
//! let config = FileSystemConfig::builder()
//!     .mount("/srv/base", "/")
//!     .mount("/srv/mods", "/")
//!     .write_location("/srv/saves")
//!     .build();
//!
//! assert_eq!(config.mounts.len(), 2);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Result, VfsError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration used by [`crate::FileSystem::from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystemConfig {
    /// Physical directory that receives every write.
    ///
    /// Default: `None` (read-only file system)
    pub write_location: Option<PathBuf>,

    /// Create the write location if it does not exist yet.
    ///
    /// Default: `true`
    pub create_write_location: bool,

    /// Provider plug-ins to load, by type name, before mounting.
    pub providers: Vec<String>,

    /// Locations to mount, oldest (lowest precedence) first.
    pub mounts: Vec<MountConfig>,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            write_location: None,
            create_write_location: true,
            providers: Vec::new(),
            mounts: Vec::new(),
        }
    }
}

impl FileSystemConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> FileSystemConfigBuilder {
        FileSystemConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidArgument`] if:
    /// - A provider name is empty
    /// - A mount has an empty physical path or mount location
    /// - The write location is an empty path
    pub fn validate(&self) -> Result<()> {
        if self.providers.iter().any(|p| p.trim().is_empty()) {
            return Err(VfsError::empty_argument("providers"));
        }

        for mount in &self.mounts {
            if mount.physical_path.as_os_str().is_empty() {
                return Err(VfsError::empty_argument("mounts.physical_path"));
            }
            if mount.mount_location.trim().is_empty() {
                return Err(VfsError::empty_argument("mounts.mount_location"));
            }
        }

        if let Some(location) = &self.write_location
            && location.as_os_str().is_empty()
        {
            return Err(VfsError::empty_argument("write_location"));
        }

        Ok(())
    }
}

/// One entry of [`FileSystemConfig::mounts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Directory or packed file to mount.
    pub physical_path: PathBuf,

    /// Virtual directory to mount it under.
    #[serde(default = "default_mount_location")]
    pub mount_location: String,
}

impl MountConfig {
    /// Creates a mount entry.
    pub fn new(physical_path: impl Into<PathBuf>, mount_location: impl Into<String>) -> Self {
        Self {
            physical_path: physical_path.into(),
            mount_location: mount_location.into(),
        }
    }
}

fn default_mount_location() -> String {
    "/".to_string()
}

/// Builder for [`FileSystemConfig`].
#[derive(Debug, Default)]
pub struct FileSystemConfigBuilder {
    config: FileSystemConfig,
}

impl FileSystemConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write location.
    #[must_use]
    pub fn write_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.write_location = Some(path.into());
        self
    }

    /// Controls whether a missing write location is created.
    #[must_use]
    pub const fn create_write_location(mut self, create: bool) -> Self {
        self.config.create_write_location = create;
        self
    }

    /// Adds a provider plug-in to load.
    #[must_use]
    pub fn provider(mut self, type_name: impl Into<String>) -> Self {
        self.config.providers.push(type_name.into());
        self
    }

    /// Appends a mount; later mounts take precedence.
    #[must_use]
    pub fn mount(mut self, physical_path: impl Into<PathBuf>, mount_location: impl Into<String>) -> Self {
        self.config
            .mounts
            .push(MountConfig::new(physical_path, mount_location));
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> FileSystemConfig {
        self.config
    }
}
