//! Streaming, all-or-nothing cache file writer.

use crate::cache::types::CacheError;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Writes a cache file through a sibling temp file.
///
/// Bytes go to `.<name>.<pid>.<seq>.tmp` next to the target. [`commit`]
/// renames the temp file over the target, so readers only ever see complete
/// files. Dropping the writer without committing deletes the temp file.
///
/// [`commit`]: CacheWriter::commit
#[derive(Debug)]
pub struct CacheWriter {
    target: PathBuf,
    temp_path: PathBuf,
    file: Option<BufWriter<File>>,
    bytes_written: u64,
    committed: bool,
}

impl CacheWriter {
    /// Create the temp file for `target`, creating parent directories.
    pub fn create(target: &Path) -> Result<Self, CacheError> {
        let parent = target
            .parent()
            .ok_or_else(|| CacheError::NoParent(target.to_path_buf()))?;
        fs::create_dir_all(parent)?;

        let temp_path = temp_path_for(target);
        let file = File::create(&temp_path)?;

        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            file: Some(BufWriter::new(file)),
            bytes_written: 0,
            committed: false,
        })
    }

    /// Final location of the cache file.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Number of bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and move the temp file into place.
    pub fn commit(mut self) -> Result<PathBuf, CacheError> {
        if let Some(file) = self.file.take() {
            let file = file.into_inner().map_err(|e| e.into_error())?;
            drop(file);
        }
        fs::rename(&self.temp_path, &self.target)?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Write for CacheWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("cache writer already closed"))?;
        let written = file.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        sequence
    ))
}
