//! Error types for virtual file system operations.
//!
//! Every failure surfaces synchronously to the caller as a [`VfsError`].
//! Variants fall into a handful of kinds (argument, not-found,
//! invalid-operation, not-supported, I/O and creation errors) which can be
//! queried with the `is_xxx()` helpers.
//!
//! # Examples
//!
//! ```
//! use mountfs_core::VfsError;
//!
//! let error = VfsError::FileNotFound {
//!     path: "/missing.txt".to_string(),
//! };
//!
//! assert!(error.is_not_found());
//! assert!(!error.is_io_error());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type for virtual file system operations.
pub type Result<T> = std::result::Result<T, VfsError>;

/// Errors that can occur during virtual file system operations.
#[derive(Error, Debug)]
pub enum VfsError {
    /// A required parameter was empty or otherwise unusable.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Name of the offending parameter
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A virtual path could not be parsed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// A file and a directory would end up sharing the same virtual path.
    #[error("A file and a directory cannot share the path: {path}")]
    EntryConflict {
        /// The contested virtual path
        path: String,
    },

    /// The requested virtual file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Virtual path of the missing file
        path: String,
    },

    /// The requested virtual directory does not exist.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// Virtual path of the missing directory
        path: String,
    },

    /// A physical mount target does not exist on disk.
    #[error("Physical path does not exist: {}", path.display())]
    PhysicalPathNotFound {
        /// The missing physical path
        path: PathBuf,
    },

    /// A write was attempted while no write location is configured.
    #[error("Cannot {operation} without a write location")]
    NoWriteLocation {
        /// The operation that required a write location
        operation: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Provider '{provider}' does not support {operation}")]
    NotSupported {
        /// Type name of the provider
        provider: String,
        /// The unsupported operation
        operation: String,
    },

    /// No loaded provider can read the physical file.
    #[error("No loaded provider can read the file: {}", path.display())]
    UnreadableFile {
        /// The physical file that could not be mounted
        path: PathBuf,
    },

    /// The mount point to remove is not in the mount list.
    #[error("Mount point '{mount_location}' with physical location '{}' was not found", physical_path.display())]
    MountPointNotFound {
        /// Physical side of the mount point
        physical_path: PathBuf,
        /// Virtual side of the mount point
        mount_location: String,
    },

    /// An underlying operating system call failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Physical path the failing call operated on
        path: PathBuf,
        /// Error reported by the operating system
        #[source]
        source: std::io::Error,
    },

    /// No installed plug-in matches the requested provider type name.
    #[error("No provider plug-in named '{type_name}' is installed")]
    ProviderNotFound {
        /// The unresolved provider type name
        type_name: String,
    },

    /// The plug-in was found but did not produce a provider instance.
    #[error("Provider plug-in '{type_name}' did not create a provider")]
    ProviderCreationFailed {
        /// The provider type name whose factory failed
        type_name: String,
    },
}

impl VfsError {
    /// Wraps an [`std::io::Error`] together with the physical path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds an [`VfsError::InvalidArgument`] for an empty parameter.
    pub fn empty_argument(name: &str) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: "value must not be empty".to_string(),
        }
    }

    /// Returns `true` for errors raised because a parameter was rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use mountfs_core::VfsError;
    ///
    /// let error = VfsError::empty_argument("path");
    /// assert!(error.is_argument_error());
    /// ```
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::InvalidPath { .. } | Self::EntryConflict { .. }
        )
    }

    /// Returns `true` if a file, directory or physical target was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::DirectoryNotFound { .. }
                | Self::PhysicalPathNotFound { .. }
        )
    }

    /// Returns `true` if the operation is not valid in the current state.
    #[must_use]
    pub const fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::NoWriteLocation { .. })
    }

    /// Returns `true` if a provider declined an operation it does not implement.
    #[must_use]
    pub const fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Returns `true` for I/O failures, including unreadable mount targets
    /// and unknown mount points.
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::UnreadableFile { .. } | Self::MountPointNotFound { .. }
        )
    }

    /// Returns `true` if a provider plug-in could not be resolved or created.
    #[must_use]
    pub const fn is_creation_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotFound { .. } | Self::ProviderCreationFailed { .. }
        )
    }
}
