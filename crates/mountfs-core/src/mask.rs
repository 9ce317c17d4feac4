//! Wildcard masks for entry-name searches.
//!
//! `*` matches any run of characters and `?` exactly one; everything else is
//! literal. Matching ignores case and always covers the whole name.

use crate::error::{Result, VfsError};
use regex::{Regex, RegexBuilder};

/// A compiled wildcard mask.
///
/// The mask must match the whole name, not a part of it: `a?` matches `ab`
/// but not `ba1x`.
///
/// # Examples
///
/// ```
/// use mountfs_core::NameMask;
///
/// let mask = NameMask::new("*.TXT")?;
/// assert!(mask.matches("notes.txt"));
/// assert!(!mask.matches("notes.txt.bak"));
///
/// let single = NameMask::new("file?.dat")?;
/// assert!(single.matches("file1.dat"));
/// assert!(!single.matches("file10.dat"));
/// assert!(!NameMask::new("a?")?.matches("ba1x"));
/// # Ok::<(), mountfs_core::VfsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct NameMask {
    pattern: String,
    regex: Regex,
}

impl NameMask {
    /// Compiles a mask.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidArgument`] if the mask is empty.
    pub fn new(mask: &str) -> Result<Self> {
        if mask.trim().is_empty() {
            return Err(VfsError::empty_argument("mask"));
        }

        let translated = regex::escape(mask)
            .replace(r"\*", ".*")
            .replace(r"\?", ".");
        let regex = RegexBuilder::new(&format!("^{translated}$"))
            .case_insensitive(true)
            .build()
            .map_err(|e| VfsError::InvalidArgument {
                name: "mask".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pattern: mask.to_string(),
            regex,
        })
    }

    /// Returns the mask as it was written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Tests an entry name against the mask.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}
