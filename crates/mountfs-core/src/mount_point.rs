//! Mount point value type.
//!
//! A [`MountPoint`] records one mount operation: which physical location was
//! exposed and under which virtual directory. Equality, ordering and hashing
//! are all case-insensitive so that the same mount written two different
//! ways is still recognized as a duplicate.
//!
//! # Examples
//!
//! ```
//! use mountfs_core::MountPoint;
//!
//! let a = MountPoint::new("/srv/Assets", "/data")?;
//! let b = MountPoint::new("/srv/assets", "/DATA/")?;
//!
//! assert_eq!(a, b);
//! assert_eq!(a.mount_location(), "/data/");
//! # Ok::<(), mountfs_core::VfsError>(())
//! ```

use crate::error::{Result, VfsError};
use crate::path::{SEPARATOR, VirtualPath, case_key, physical_key};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// An immutable (physical path, virtual mount location) pair.
#[derive(Debug, Clone, Serialize)]
pub struct MountPoint {
    physical_path: PathBuf,
    mount_location: String,
}

impl MountPoint {
    /// Creates a mount point.
    ///
    /// The mount location is normalized to a virtual directory path with a
    /// trailing `/`. The physical path is stored as given.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidArgument`] if either value is empty or
    /// whitespace, or [`VfsError::InvalidPath`] if the mount location is not a
    /// valid virtual path.
    pub fn new(physical_path: impl Into<PathBuf>, mount_location: &str) -> Result<Self> {
        let physical_path = physical_path.into();
        if physical_path.to_string_lossy().trim().is_empty() {
            return Err(VfsError::empty_argument("physical_path"));
        }
        if mount_location.trim().is_empty() {
            return Err(VfsError::empty_argument("mount_location"));
        }

        Ok(Self {
            physical_path,
            mount_location: VirtualPath::parse(mount_location)?.to_directory_string(),
        })
    }

    /// Returns the physical location that was mounted.
    #[must_use]
    pub fn physical_path(&self) -> &Path {
        &self.physical_path
    }

    /// Returns the virtual directory the location is exposed under.
    #[must_use]
    pub fn mount_location(&self) -> &str {
        &self.mount_location
    }

    /// Maps a physical path below this mount's root to its virtual path.
    ///
    /// Returns `None` if the path is not inside the mounted location.
    ///
    /// # Examples
    ///
    /// ```
    /// use mountfs_core::MountPoint;
    /// use std::path::Path;
    ///
    /// let mount = MountPoint::new("/srv/assets", "/data/")?;
    /// assert_eq!(
    ///     mount.map_to_virtual(Path::new("/srv/assets/maps/one.map")).as_deref(),
    ///     Some("/data/maps/one.map")
    /// );
    /// assert_eq!(mount.map_to_virtual(Path::new("/etc/passwd")), None);
    /// # Ok::<(), mountfs_core::VfsError>(())
    /// ```
    #[must_use]
    pub fn map_to_virtual(&self, physical_path: &Path) -> Option<String> {
        let relative = physical_path.strip_prefix(&self.physical_path).ok()?;
        let mut out = self.mount_location.clone();
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        out.push_str(&parts.join(&SEPARATOR.to_string()));
        Some(out)
    }

    /// Maps a virtual path below this mount's location to a physical path.
    ///
    /// Returns `None` if the virtual path is not inside the mount location or
    /// cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use mountfs_core::MountPoint;
    /// use std::path::PathBuf;
    ///
    /// let mount = MountPoint::new("/srv/assets", "/data/")?;
    /// assert_eq!(
    ///     mount.map_to_physical("/data/maps/one.map"),
    ///     Some(PathBuf::from("/srv/assets/maps/one.map"))
    /// );
    /// assert_eq!(mount.map_to_physical("/other/file"), None);
    /// # Ok::<(), mountfs_core::VfsError>(())
    /// ```
    #[must_use]
    pub fn map_to_physical(&self, virtual_path: &str) -> Option<PathBuf> {
        let location = VirtualPath::parse(&self.mount_location).ok()?;
        let target = VirtualPath::parse(virtual_path).ok()?;
        if !location.is_ancestor_of(&target) {
            return None;
        }

        let mut out = self.physical_path.clone();
        for segment in &target.segments()[location.segments().len()..] {
            out.push(segment);
        }
        Some(out)
    }

    fn keys(&self) -> (String, String) {
        (
            physical_key(&self.physical_path),
            case_key(&self.mount_location),
        )
    }
}

impl PartialEq for MountPoint {
    fn eq(&self, other: &Self) -> bool {
        self.keys() == other.keys()
    }
}

impl Eq for MountPoint {}

impl Hash for MountPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keys().hash(state);
    }
}

impl PartialOrd for MountPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MountPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.keys().cmp(&other.keys())
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.physical_path.display(),
            self.mount_location
        )
    }
}
