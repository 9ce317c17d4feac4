//! Virtual and physical path handling.
//!
//! Virtual paths always use `/` as the separator and are rooted at `/`.
//! [`VirtualPath`] parses the loose forms callers tend to pass (`foo/bar`,
//! `/foo/bar/`, `\foo\bar`) into a list of validated segments, stripping
//! characters that are not legal in entry names.
//!
//! # Examples
//!
//! ```
//! use mountfs_core::VirtualPath;
//!
//! let path = VirtualPath::parse("data/textures/stone.png")?;
//! assert_eq!(path.directory(), "/data/textures/");
//! assert_eq!(path.file_name(), Some("stone.png"));
//!
//! let dir = VirtualPath::parse("/data/textures/")?;
//! assert_eq!(dir.file_name(), None);
//! assert_eq!(dir.to_directory_string(), "/data/textures/");
//! # Ok::<(), mountfs_core::VfsError>(())
//! ```

use crate::error::{Result, VfsError};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Separator used by every virtual path.
pub const SEPARATOR: char = '/';

/// Characters removed from directory and file names.
const ILLEGAL_NAME_CHARS: &[char] = &['"', '<', '>', '|', ':', '*', '?'];

/// A parsed, normalized virtual path.
///
/// The path keeps whether it was written with a trailing separator: `"/a/b/"`
/// names a directory and has no file name, while `"/a/b"` may name either a
/// directory or a file called `b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPath {
    segments: Vec<String>,
    trailing_separator: bool,
}

impl VirtualPath {
    /// The root path `/`.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
            trailing_separator: true,
        }
    }

    /// Parses a virtual path.
    ///
    /// Backslashes are treated as separators, a missing leading `/` is
    /// implied, repeated separators collapse and illegal name characters are
    /// stripped from every segment.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidArgument`] if the path is empty or blank,
    /// and [`VfsError::InvalidPath`] if a segment is `.`/`..` or nothing is
    /// left of it once illegal characters are removed.
    pub fn parse(path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(VfsError::empty_argument("path"));
        }

        let unified = path.replace('\\', "/");
        let trailing_separator = unified.ends_with(SEPARATOR);
        let mut segments = Vec::new();

        for raw in unified.split(SEPARATOR).filter(|s| !s.is_empty()) {
            if raw == "." || raw == ".." {
                return Err(VfsError::InvalidPath {
                    path: path.to_string(),
                    reason: "relative segments are not allowed".to_string(),
                });
            }

            let name = sanitize_name(raw);
            if name.is_empty() {
                return Err(VfsError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("segment '{raw}' has no legal characters"),
                });
            }
            segments.push(name);
        }

        Ok(Self {
            trailing_separator: trailing_separator || segments.is_empty(),
            segments,
        })
    }

    /// Returns `true` if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns every segment of the path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the file name, if the path was not written as a directory.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.trailing_separator {
            None
        } else {
            self.segments.last().map(String::as_str)
        }
    }

    /// Returns the segments of the containing directory when the path is
    /// read as a file path.
    #[must_use]
    pub fn parent_segments(&self) -> &[String] {
        if self.file_name().is_some() {
            &self.segments[..self.segments.len() - 1]
        } else {
            &self.segments
        }
    }

    /// Returns the containing directory (with trailing `/`) when the path is
    /// read as a file path.
    #[must_use]
    pub fn directory(&self) -> String {
        join_directory(self.parent_segments())
    }

    /// Formats every segment as a directory path: `/a/b/`.
    #[must_use]
    pub fn to_directory_string(&self) -> String {
        join_directory(&self.segments)
    }

    /// Formats the path without a trailing separator: `/a/b`.
    #[must_use]
    pub fn to_file_string(&self) -> String {
        if self.segments.is_empty() {
            return SEPARATOR.to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push(SEPARATOR);
            out.push_str(segment);
        }
        out
    }

    /// Returns `true` if `self` is `other` or one of its ancestors,
    /// comparing segments case-insensitively.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| case_key(a) == case_key(b))
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trailing_separator {
            f.write_str(&self.to_directory_string())
        } else {
            f.write_str(&self.to_file_string())
        }
    }
}

/// Removes characters that may not appear in a directory or file name.
///
/// # Examples
///
/// ```
/// use mountfs_core::path::sanitize_name;
///
/// assert_eq!(sanitize_name("what?<now>"), "whatnow");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !ILLEGAL_NAME_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Key used for case-insensitive name lookups.
pub(crate) fn case_key(name: &str) -> String {
    name.to_lowercase()
}

fn join_directory(segments: &[String]) -> String {
    let mut out = String::from(SEPARATOR);
    for segment in segments {
        out.push_str(segment);
        out.push(SEPARATOR);
    }
    out
}

/// Converts a physical path to an absolute, lexically normalized path
/// without trailing separators.
///
/// # Errors
///
/// Returns [`VfsError::InvalidArgument`] if the path is empty and
/// [`VfsError::Io`] if the current directory cannot be determined.
pub fn absolute_physical(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(VfsError::empty_argument("physical_path"));
    }

    let absolute = std::path::absolute(path).map_err(|e| VfsError::io(path, e))?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Compares two physical paths case-insensitively.
#[must_use]
pub fn physical_eq(a: &Path, b: &Path) -> bool {
    physical_key(a) == physical_key(b)
}

/// Case-folded, separator-trimmed key for a physical path.
pub(crate) fn physical_key(path: &Path) -> String {
    let text = path.to_string_lossy().to_lowercase();
    let trimmed = text.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        text
    } else {
        trimmed.to_string()
    }
}
