//! Loading template sources from disk.
//!
//! The engine itself only works on bytes; these helpers are for callers that
//! keep templates in a directory tree.

use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("Template not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid template directory: {0}")]
    InvalidTemplateDir(String),
}

/// Read a template's raw bytes from `template_root`.
pub fn read_template(
    relative_path: &RelativePath,
    template_root: &Path,
) -> Result<Vec<u8>, IoError> {
    let absolute_path = relative_path.to_path(template_root);
    if !absolute_path.is_file() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read(&absolute_path).map_err(IoError::Io)
}

pub fn validate_template_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidTemplateDir(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    Ok(())
}
