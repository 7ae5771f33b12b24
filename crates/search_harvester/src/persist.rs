use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::page_filename;
use crate::types::PageIndex;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Writable only if a temp file can be created inside it.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_ref())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Keeps the decoded body of every successful page as `{prefix}_{page:02}.json`.
#[derive(Debug, Clone)]
pub struct PageStore {
    writer: AtomicFileWriter,
    prefix: String,
}

impl PageStore {
    pub fn new(dir: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            prefix: prefix.into(),
        }
    }

    /// Creates the directory if needed and checks it is writable.
    pub fn ensure_ready(&self) -> Result<(), PersistError> {
        ensure_output_dir(&self.writer.dir)
    }

    pub fn save(&self, page: PageIndex, document: &Value) -> Result<PathBuf, PersistError> {
        let pretty = serde_json::to_string_pretty(document)?;
        self.writer.write(&page_filename(&self.prefix, page), pretty)
    }
}
