//! mountfs command-line interface.
//!
//! Assembles a virtual file system from a TOML configuration and
//! `--mount` arguments, then inspects or edits it.
//!
//! # Examples
//!
//! ```bash
//! # Layer a mod directory over the base content and list the result
//! mountfs --mount ./base --mount ./mods ls /textures
//!
//! # Which mount does a file come from?
//! mountfs --mount ./base --mount ./mods stat /textures/wall.png
//!
//! # Write into the write location
//! echo "volume=3" | mountfs --mount ./base --write-location ./saves write /settings.ini
//! ```

use clap::Parser;
use mountfs_cli::cli::Cli;
use mountfs_cli::commands::common::exit_code_for;
use mountfs_cli::runner::{execute_command, init_logging};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: failed to initialize logging: {e}");
    }

    let exit_code = match execute_command(cli.command, &cli.sources, cli.format) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code.as_i32());
}
