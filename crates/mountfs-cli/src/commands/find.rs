//! `find` command: searches the tree by name mask.

use anyhow::{Context, Result};
use mountfs_core::FileSystem;
use tracing::info;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// What a search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Files
    Files,
    /// Directories
    Directories,
}

/// Returns the full virtual paths of every match below `start`.
///
/// Files found in subdirectories come before the files of `start` itself;
/// directories are listed parent first.
pub fn search(
    vfs: &FileSystem,
    start: &str,
    mask: &str,
    target: Target,
    recursive: bool,
) -> Result<Vec<String>> {
    let paths = match target {
        Target::Files => vfs
            .find_files_in(start, mask, recursive)?
            .iter()
            .map(|f| f.full_path())
            .collect(),
        Target::Directories => vfs
            .find_directories_in(start, mask, recursive)?
            .iter()
            .map(|d| d.full_path())
            .collect(),
    };
    Ok(paths)
}

/// Runs the find command.
pub fn run(
    vfs: &FileSystem,
    mask: String,
    start: String,
    target: Target,
    recursive: bool,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let found = search(vfs, &start, &mask, target, recursive)
        .with_context(|| format!("failed to search '{start}' for '{mask}'"))?;
    info!("Found {} matches for {}", found.len(), mask);

    let formatted = format_output(&found, output_format).context("failed to format matches")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mounted() -> (TempDir, FileSystem) {
        let temp = TempDir::new().unwrap();
        for file in ["top.txt", "docs/readme.txt", "docs/notes.md", "docs/old/log.txt"] {
            let path = temp.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, file).unwrap();
        }

        let mut vfs = FileSystem::new();
        vfs.mount_root(temp.path()).unwrap();
        (temp, vfs)
    }

    #[test]
    fn test_search_files_recursive() {
        let (_temp, vfs) = mounted();
        let found = search(&vfs, "/", "*.TXT", Target::Files, true).unwrap();
        assert_eq!(
            found,
            vec!["/docs/old/log.txt", "/docs/readme.txt", "/top.txt"]
        );
    }

    #[test]
    fn test_search_files_flat() {
        let (_temp, vfs) = mounted();
        let found = search(&vfs, "/docs", "*", Target::Files, false).unwrap();
        assert_eq!(found, vec!["/docs/notes.md", "/docs/readme.txt"]);
    }

    #[test]
    fn test_search_directories() {
        let (_temp, vfs) = mounted();
        let found = search(&vfs, "/", "*", Target::Directories, true).unwrap();
        assert_eq!(found, vec!["/docs/", "/docs/old/"]);

        let found = search(&vfs, "/", "o?d", Target::Directories, true).unwrap();
        assert_eq!(found, vec!["/docs/old/"]);
    }

    #[test]
    fn test_search_errors() {
        let (_temp, vfs) = mounted();
        assert!(search(&vfs, "/missing", "*", Target::Files, true).is_err());
        assert!(search(&vfs, "/", "", Target::Files, true).is_err());
    }
}
