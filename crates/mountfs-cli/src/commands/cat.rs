//! `cat` command: streams a virtual file to stdout.

use anyhow::{Context, Result};
use mountfs_core::FileSystem;
use std::io::{self, Write};

use crate::ExitCode;

/// Copies the file at `path` into `out`, returning the number of bytes.
pub fn copy_to(vfs: &mut FileSystem, path: &str, out: &mut impl Write) -> Result<u64> {
    let mut stream = vfs
        .open_stream(path, false)
        .with_context(|| format!("failed to open '{path}'"))?;
    let copied = io::copy(&mut stream, out).with_context(|| format!("failed to read '{path}'"))?;
    out.flush()?;
    Ok(copied)
}

/// Runs the cat command.
///
/// File contents are written raw; the output format does not apply.
pub fn run(vfs: &mut FileSystem, path: String) -> Result<ExitCode> {
    let stdout = io::stdout();
    let copied = copy_to(vfs, &path, &mut stdout.lock())?;
    tracing::debug!("Wrote {copied} bytes of {path}");
    Ok(ExitCode::SUCCESS)
}
