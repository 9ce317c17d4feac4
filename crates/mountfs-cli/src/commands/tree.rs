//! `tree` command: prints a directory and everything below it.

use anyhow::{Context, Result};
use mountfs_core::{Directory, FileSystem, VfsError};
use serde::Serialize;

use crate::formatters::format_output;
use crate::{ExitCode, OutputFormat};

/// A directory and its descendants.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeNode {
    /// Directory name (`/` for the root)
    pub name: String,
    /// File names
    pub files: Vec<String>,
    /// Child directories
    pub directories: Vec<Self>,
    /// `true` when the depth limit cut off deeper levels
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl TreeNode {
    fn build(directory: &Directory, depth: Option<usize>) -> Self {
        let can_descend = depth != Some(0);
        let children = directory.directories();

        Self {
            name: directory.name().to_string(),
            files: directory
                .files()
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            directories: if can_descend {
                children
                    .iter()
                    .map(|child| Self::build(child, depth.map(|d| d - 1)))
                    .collect()
            } else {
                Vec::new()
            },
            truncated: !can_descend && !children.is_empty(),
        }
    }

    /// Number of files in this node and the nodes below it.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len() + self.directories.iter().map(Self::file_count).sum::<usize>()
    }
}

/// Builds the tree below `path`, descending at most `depth` levels.
pub fn build_tree(vfs: &FileSystem, path: &str, depth: Option<usize>) -> Result<TreeNode> {
    let directory = vfs
        .get_directory(path)?
        .ok_or_else(|| VfsError::DirectoryNotFound {
            path: path.to_string(),
        })?;
    Ok(TreeNode::build(&directory, depth))
}

/// Runs the tree command.
pub fn run(
    vfs: &FileSystem,
    path: String,
    depth: Option<usize>,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let tree = build_tree(vfs, &path, depth).with_context(|| format!("failed to walk '{path}'"))?;
    let formatted = format_output(&tree, output_format).context("failed to format tree")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}
