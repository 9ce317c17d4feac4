//! Shared fixtures for the integration tests.
//!
//! `PackProvider` reads a tiny packed format so the tests can exercise
//! provider selection, offsets and read-only streams:
//!
//! ```text
//! MPAK\n
//! <relative path>\t<size>\n     (one line per file)
//! \n
//! <file contents, back to back>
//! ```

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use mountfs_core::{
    EnumerationContext, FileEntry, FileStream, PhysicalFileInfo, Provider, Result, VfsError,
};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PACK_MAGIC: &[u8] = b"MPAK\n";

/// Writes a file (creating parent directories) below `dir`.
pub fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Writes a packed file holding `entries`.
pub fn write_pack(path: &Path, entries: &[(&str, &[u8])]) {
    let mut out = PACK_MAGIC.to_vec();
    for (name, data) in entries {
        out.extend_from_slice(format!("{name}\t{}\n", data.len()).as_bytes());
    }
    out.push(b'\n');
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    fs::write(path, out).unwrap();
}

/// Read-only provider for the packed test format.
#[derive(Debug, Default)]
pub struct PackProvider {
    pub unloads: AtomicUsize,
}

impl PackProvider {
    pub fn unload_count(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    fn index(physical_path: &Path) -> Result<Vec<(String, u64, u64)>> {
        let bytes = fs::read(physical_path).map_err(|e| VfsError::io(physical_path, e))?;
        let header_end = bytes
            .windows(2)
            .position(|w| w == b"\n\n")
            .ok_or_else(|| VfsError::io(physical_path, std::io::ErrorKind::InvalidData.into()))?
            + 2;

        let header = String::from_utf8_lossy(&bytes[PACK_MAGIC.len()..header_end]);
        let mut offset = header_end as u64;
        let mut entries = Vec::new();
        for line in header.lines().filter(|l| !l.is_empty()) {
            let (name, size) = line
                .split_once('\t')
                .ok_or_else(|| VfsError::io(physical_path, std::io::ErrorKind::InvalidData.into()))?;
            let size: u64 = size
                .parse()
                .map_err(|_| VfsError::io(physical_path, std::io::ErrorKind::InvalidData.into()))?;
            entries.push((name.to_string(), size, offset));
            offset += size;
        }
        Ok(entries)
    }
}

impl Provider for PackProvider {
    fn type_name(&self) -> &str {
        "pack"
    }

    fn description(&self) -> &str {
        "Test packed files"
    }

    fn preferred_extensions(&self) -> &[&str] {
        &["mpak"]
    }

    fn can_read_file(&self, physical_path: &Path) -> Result<bool> {
        let mut magic = [0_u8; 5];
        let mut file = File::open(physical_path).map_err(|e| VfsError::io(physical_path, e))?;
        Ok(file.read_exact(&mut magic).is_ok() && magic == PACK_MAGIC)
    }

    fn enumerate(&self, physical_path: &Path, context: &mut EnumerationContext<'_>) -> Result<()> {
        let created: DateTime<Utc> = fs::metadata(physical_path)
            .and_then(|m| m.modified())
            .map_or_else(|_| Utc::now(), DateTime::from);

        for (name, size, offset) in Self::index(physical_path)? {
            let virtual_path = context.join(&name);
            context.add_file(
                &virtual_path,
                PhysicalFileInfo::new(physical_path, size, created).with_offset(offset),
            )?;
        }
        Ok(())
    }

    fn read_file(&self, file: &FileEntry) -> Result<Vec<u8>> {
        let path = file.physical_path();
        let mut handle = File::open(&path).map_err(|e| VfsError::io(&path, e))?;
        handle
            .seek(SeekFrom::Start(file.offset()))
            .map_err(|e| VfsError::io(&path, e))?;

        let mut data = vec![0_u8; usize::try_from(file.size()).unwrap()];
        handle
            .read_exact(&mut data)
            .map_err(|e| VfsError::io(&path, e))?;
        Ok(data)
    }

    fn open_stream(&self, file: &FileEntry, writeable: bool) -> Result<FileStream> {
        if writeable {
            return Err(self.not_supported("write streams"));
        }
        Ok(FileStream::from_bytes(self.read_file(file)?))
    }

    fn on_unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }
}
