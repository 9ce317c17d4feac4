//! Command execution and runtime logic.
//!
//! Contains command dispatch and logging initialization.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Commands, SourceArgs};
use crate::commands::{self, find::Target, write::Contents};
use crate::{ExitCode, OutputFormat};

/// Initializes logging infrastructure.
///
/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// applies unless `verbose` forces the debug level.
///
/// # Errors
///
/// Returns an error if logging initialization fails.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Executes the specified CLI command.
///
/// Assembles the file system from `sources`, then routes the command to
/// its handler.
///
/// # Errors
///
/// Returns an error if the file system cannot be assembled or the command
/// fails.
pub fn execute_command(
    command: Commands,
    sources: &SourceArgs,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let mut vfs = commands::common::build_filesystem(sources)?;

    match command {
        Commands::Ls { path } => commands::ls::run(&vfs, path, output_format),
        Commands::Tree { path, depth } => commands::tree::run(&vfs, path, depth, output_format),
        Commands::Stat { path } => commands::stat::run(&vfs, path, output_format),
        Commands::Cat { path } => commands::cat::run(&mut vfs, path),
        Commands::Find {
            mask,
            start,
            directories,
            no_recursive,
        } => {
            let target = if directories {
                Target::Directories
            } else {
                Target::Files
            };
            commands::find::run(&vfs, mask, start, target, !no_recursive, output_format)
        }
        Commands::Write { path, from, empty } => commands::write::run(
            &mut vfs,
            path,
            Contents::from_flags(from, empty),
            output_format,
        ),
        Commands::Mkdir { path } => commands::mkdir::run(&mut vfs, path, output_format),
        Commands::Rm { path, dir } => commands::rm::run(&mut vfs, path, dir, output_format),
        Commands::Mounts => commands::mounts::run(&vfs, output_format),
    }
}
