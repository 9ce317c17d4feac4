//! Common utilities shared across CLI commands.
//!
//! Assembles the [`FileSystem`] every command runs against: the TOML
//! configuration is loaded first, then `--mount` and `--write-location`
//! extend and override it.

use anyhow::{Context, Result, bail};
use mountfs_core::{FileSystem, FileSystemConfig, MountConfig, PluginCatalog, VfsError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::ExitCode;
use crate::cli::SourceArgs;

/// Location of the configuration file read when `--config` is not given.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mountfs").join("config.toml"))
}

/// Parses a `PHYSICAL[=/VIRTUAL]` mount argument.
///
/// Only a trailing `=` followed by an absolute virtual path splits the
/// argument, so physical paths may themselves contain `=`.
///
/// # Examples
///
/// ```
/// use mountfs_cli::commands::common::parse_mount;
/// use std::path::Path;
///
/// let mount = parse_mount("./mods=/data/mods").unwrap();
/// assert_eq!(mount.physical_path, Path::new("./mods"));
/// assert_eq!(mount.mount_location, "/data/mods");
///
/// let mount = parse_mount("./base").unwrap();
/// assert_eq!(mount.mount_location, "/");
/// ```
pub fn parse_mount(spec: &str) -> Result<MountConfig> {
    let (physical, location) = match spec.rsplit_once('=') {
        Some((physical, location)) if location.starts_with('/') => (physical, location),
        _ => (spec, "/"),
    };

    if physical.trim().is_empty() {
        bail!("invalid mount '{spec}' (expected PHYSICAL[=/VIRTUAL])");
    }
    Ok(MountConfig::new(physical, location))
}

/// Loads a configuration file.
pub fn load_config(path: &Path) -> Result<FileSystemConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileSystemConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Merges the configuration file and the command-line sources.
///
/// An explicit `--config` must exist; the default location is optional.
pub fn build_config(sources: &SourceArgs) -> Result<FileSystemConfig> {
    let mut config = match &sources.config {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => {
                debug!("Using default config {}", path.display());
                load_config(&path)?
            }
            None => FileSystemConfig::default(),
        },
    };

    for spec in &sources.mounts {
        config.mounts.push(parse_mount(spec)?);
    }
    if let Some(location) = &sources.write_location {
        config.write_location = Some(location.clone());
    }

    Ok(config)
}

/// Builds the file system the commands operate on.
///
/// The CLI ships no provider plug-ins, so configurations naming one fail
/// with a provider-not-found error.
pub fn build_filesystem(sources: &SourceArgs) -> Result<FileSystem> {
    let config = build_config(sources)?;
    debug!(
        mounts = config.mounts.len(),
        write_location = ?config.write_location,
        "Building file system"
    );

    FileSystem::from_config(&config, Arc::new(PluginCatalog::new()))
        .context("failed to assemble the virtual file system")
}

/// Picks the process exit code for a failed command.
///
/// # Examples
///
/// ```
/// use mountfs_cli::ExitCode;
/// use mountfs_cli::commands::common::exit_code_for;
/// use mountfs_core::VfsError;
///
/// let err = anyhow::Error::new(VfsError::FileNotFound { path: "/a".into() });
/// assert_eq!(exit_code_for(&err), ExitCode::NOT_FOUND);
/// ```
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let vfs_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<VfsError>());

    match vfs_error {
        Some(e) if e.is_not_found() => ExitCode::NOT_FOUND,
        Some(e) if e.is_argument_error() => ExitCode::INVALID_INPUT,
        _ => ExitCode::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_mount_root() {
        let mount = parse_mount("/srv/base").unwrap();
        assert_eq!(mount.physical_path, PathBuf::from("/srv/base"));
        assert_eq!(mount.mount_location, "/");
    }

    #[test]
    fn test_parse_mount_with_location() {
        let mount = parse_mount("/srv/mods=/data").unwrap();
        assert_eq!(mount.physical_path, PathBuf::from("/srv/mods"));
        assert_eq!(mount.mount_location, "/data");
    }

    #[test]
    fn test_parse_mount_equals_in_physical_path() {
        let mount = parse_mount("/srv/a=b").unwrap();
        assert_eq!(mount.physical_path, PathBuf::from("/srv/a=b"));
        assert_eq!(mount.mount_location, "/");

        let mount = parse_mount("/srv/a=b=/x").unwrap();
        assert_eq!(mount.physical_path, PathBuf::from("/srv/a=b"));
        assert_eq!(mount.mount_location, "/x");
    }

    #[test]
    fn test_parse_mount_empty() {
        assert!(parse_mount("").is_err());
        assert!(parse_mount("=/data").is_err());
    }

    #[test]
    fn test_load_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
write_location = "/tmp/saves"

[[mounts]]
physical_path = "/srv/base"

[[mounts]]
physical_path = "/srv/mods"
mount_location = "/mods"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.write_location, Some(PathBuf::from("/tmp/saves")));
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].mount_location, "/");
        assert_eq!(config.mounts[1].mount_location, "/mods");
        assert!(config.create_write_location);
    }

    #[test]
    fn test_load_config_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "mounts = 5").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
        assert!(load_config(&temp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_build_config_flags_extend_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "write_location = \"/from/file\"\n[[mounts]]\nphysical_path = \"/srv/base\"\n",
        )
        .unwrap();

        let sources = SourceArgs {
            config: Some(path),
            mounts: vec!["/srv/mods=/mods".to_string()],
            write_location: Some(PathBuf::from("/from/flag")),
        };
        let config = build_config(&sources).unwrap();

        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[1].physical_path, PathBuf::from("/srv/mods"));
        assert_eq!(config.write_location, Some(PathBuf::from("/from/flag")));
    }

    #[test]
    fn test_build_filesystem() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("base");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("a.txt"), "a").unwrap();

        let sources = SourceArgs {
            config: Some(temp.path().join("none.toml")),
            ..SourceArgs::default()
        };
        assert!(build_filesystem(&sources).is_err());

        fs::write(temp.path().join("empty.toml"), "").unwrap();
        let sources = SourceArgs {
            config: Some(temp.path().join("empty.toml")),
            mounts: vec![base.display().to_string()],
            write_location: None,
        };
        let vfs = build_filesystem(&sources).unwrap();
        assert_eq!(vfs.read_file("/a.txt").unwrap(), b"a");
    }

    #[test]
    fn test_exit_code_for() {
        let not_found: Result<()> = Err(VfsError::DirectoryNotFound { path: "/x".into() }.into());
        let err = not_found.context("listing failed").unwrap_err();
        assert_eq!(exit_code_for(&err), ExitCode::NOT_FOUND);

        let err = anyhow::Error::new(VfsError::empty_argument("path"));
        assert_eq!(exit_code_for(&err), ExitCode::INVALID_INPUT);

        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), ExitCode::ERROR);
    }
}
