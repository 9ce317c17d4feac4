//! CLI argument definitions and parsing.
//!
//! Defines the command-line interface structure using clap:
//! - `Cli` - Main CLI entry point
//! - `SourceArgs` - Where the virtual file system is assembled from
//! - `Commands` - Available subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::OutputFormat;

/// mountfs - inspect and edit a virtual file system assembled from mounts.
///
/// Directories and packed files are mounted under virtual paths; later
/// mounts shadow earlier ones and writes land in the write location.
#[derive(Parser, Debug)]
#[command(name = "mountfs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Mount sources
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long = "format", global = true, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

/// Options describing how the file system is assembled.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// TOML configuration file
    /// (default: `<config dir>/mountfs/config.toml` when present)
    #[arg(short, long, global = true, env = "MOUNTFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mount a physical path, optionally at a virtual location: PHYSICAL[=/VIRTUAL]
    ///
    /// Applied after the mounts of the configuration file, in order.
    #[arg(short, long = "mount", global = true, num_args = 1)]
    pub mounts: Vec<String>,

    /// Directory that receives every write
    #[arg(short, long, global = true)]
    pub write_location: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the contents of a virtual directory.
    ///
    /// # Examples
    ///
    /// ```bash
    /// mountfs --mount ./base --mount ./mods ls /textures
    /// ```
    Ls {
        /// Virtual directory to list
        #[arg(default_value = "/")]
        path: String,
    },

    /// Print the virtual directory tree.
    Tree {
        /// Directory the tree starts at
        #[arg(default_value = "/")]
        path: String,

        /// Maximum depth to descend (unlimited when omitted)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Show where a virtual file comes from.
    Stat {
        /// Virtual file path
        path: String,
    },

    /// Write a virtual file's contents to stdout.
    Cat {
        /// Virtual file path
        path: String,
    },

    /// Find files or directories whose name matches a mask.
    ///
    /// Masks support `*` and `?` wildcards and match case-insensitively.
    ///
    /// # Examples
    ///
    /// ```bash
    /// mountfs --mount ./game find "*.png" --in /textures
    /// ```
    Find {
        /// Name mask such as `*.txt`
        mask: String,

        /// Directory to search from
        #[arg(long = "in", default_value = "/")]
        start: String,

        /// Search directories instead of files
        #[arg(short, long)]
        directories: bool,

        /// Only search the start directory itself
        #[arg(long)]
        no_recursive: bool,
    },

    /// Write a file into the write location.
    ///
    /// Reads the contents from `--from`, or from stdin when omitted.
    Write {
        /// Virtual file path
        path: String,

        /// Physical file to copy the contents from
        #[arg(long, conflicts_with = "empty")]
        from: Option<PathBuf>,

        /// Create an empty file
        #[arg(long)]
        empty: bool,
    },

    /// Create a virtual directory (mirrored in the write location).
    Mkdir {
        /// Virtual directory path
        path: String,
    },

    /// Delete a file, or a directory with `--dir`.
    Rm {
        /// Virtual path to delete
        path: String,

        /// Delete a directory and everything below it
        #[arg(short, long)]
        dir: bool,
    },

    /// Show mount points, the write location and loaded providers.
    Mounts,
}
