use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// What `remove_path` found at the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    File,
    Directory,
    Missing,
}

/// Read a source document as UTF-8.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).with_context(|| format!("Failed to read file {}", path.display()))
}

/// Write a document, creating parent directories as needed.
pub fn write_document<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write file {}", path.display()))
}

/// Delete a file or a whole directory tree. A missing target is not an error.
pub fn remove_path<P: AsRef<Path>>(path: P) -> Result<Removed> {
    let path = path.as_ref();
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Removed::Missing),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
        }
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory {}", path.display()))?;
        Ok(Removed::Directory)
    } else {
        fs::remove_file(path).with_context(|| format!("Failed to remove file {}", path.display()))?;
        Ok(Removed::File)
    }
}
