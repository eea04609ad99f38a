//! In-memory file blobs and the reference catalog.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::debug;

use gbnft_engine::OutboundFile;

/// One file held fully in memory. The name is the basename only; filenames
/// on the wire never contain directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub bytes: Bytes,
}

impl FileBlob {
    /// Read a file from disk, keeping only its basename.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .with_context(|| format!("{} has no filename component", path.display()))?
            .to_string_lossy()
            .into_owned();
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        debug!(name = %name, len = bytes.len(), "loaded file");
        Ok(Self {
            name,
            bytes: Bytes::from(bytes),
        })
    }
}

impl From<FileBlob> for OutboundFile {
    fn from(blob: FileBlob) -> Self {
        OutboundFile {
            name: blob.name,
            bytes: blob.bytes,
        }
    }
}

/// Content equality of two files.
pub fn compare(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Read a client file list: one path per line, blank lines skipped.
pub fn read_names_from_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read file list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// The receiver's reference set of files.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<FileBlob>,
}

impl Catalog {
    /// Load every regular file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }
        let mut entries = Vec::new();
        for entry in
            fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                entries.push(FileBlob::read(entry.path())?);
            }
        }
        debug!(count = entries.len(), "catalog loaded");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First catalog entry whose content equals `bytes`, if any.
    pub fn match_bytes(&self, bytes: &[u8]) -> Option<&FileBlob> {
        self.entries.iter().find(|e| compare(&e.bytes, bytes))
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<FileBlob>) -> Self {
        Self { entries }
    }
}
