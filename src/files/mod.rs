//! File and search primitives
//!
//! Directory listing, glob matching, content search and file reads. Each
//! primitive returns structured results or a [`FileError`]; the tool layer
//! turns errors into `Failure` results with remediation hints.

pub mod listing;
pub mod read;
pub mod search;

use serde::Serialize;
use std::path::{Path, PathBuf};

pub use listing::list_directory;
pub use read::{
    mime_type_for, read_base64, read_text, write_text, BinaryFile, BinaryReader,
    LocalBinaryReader,
};
pub use search::{glob_entries, grep, GlobFilter, GlobOutcome, GrepMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// Shape shared by directory listings and glob results
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Omitted for folders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntry {
    pub(crate) fn from_metadata(path: &Path, metadata: &std::fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let is_dir = metadata.is_dir();
        Self {
            name,
            path: path.to_string_lossy().to_string(),
            kind: if is_dir { EntryKind::Folder } else { EntryKind::File },
            size: if is_dir { None } else { Some(metadata.len()) },
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("path must be absolute: {}", .0.display())]
    NotAbsolute(PathBuf),
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("{operation} is not available in this process")]
    Unavailable { operation: &'static str },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub(crate) fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                FileError::PermissionDenied(path.to_path_buf())
            }
            _ => FileError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Only a missing capability is permanent until restart
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FileError::Unavailable { .. })
    }
}
