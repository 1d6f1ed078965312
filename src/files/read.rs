//! File reads and writes

use super::FileError;
use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::path::Path;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

/// MIME type from the file extension; unknown extensions map to a generic binary type
pub fn mime_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
        return DEFAULT_MIME_TYPE;
    };
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Read a UTF-8 text file
pub async fn read_text(path: &Path) -> Result<String, FileError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FileError::from_io(path, e))
}

/// Write a text file, optionally creating parent directories. Returns bytes written.
pub async fn write_text(path: &Path, content: &str, create_dirs: bool) -> Result<usize, FileError> {
    if create_dirs {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::from_io(parent, e))?;
        }
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| FileError::from_io(path, e))?;
    Ok(content.len())
}

/// Raw byte reads, wired in by the host process
#[async_trait]
pub trait BinaryReader: Send + Sync {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileError>;
}

/// Reads straight from the local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBinaryReader;

#[async_trait]
impl BinaryReader for LocalBinaryReader {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| FileError::from_io(path, e))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryFile {
    pub base64: String,
    pub mime_type: String,
    pub data_url: String,
    pub size: usize,
}

/// Read a file as base64. `None` means the capability was never wired into
/// this process, which is reported as [`FileError::Unavailable`].
pub async fn read_base64(
    reader: Option<&dyn BinaryReader>,
    path: &Path,
) -> Result<BinaryFile, FileError> {
    let reader = reader.ok_or(FileError::Unavailable {
        operation: "binary file reading",
    })?;
    let bytes = reader.read_bytes(path).await?;
    let mime_type = mime_type_for(path);
    let base64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(BinaryFile {
        data_url: format!("data:{};base64,{}", mime_type, base64),
        base64,
        mime_type: mime_type.to_string(),
        size: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("data.xyz")), DEFAULT_MIME_TYPE);
        assert_eq!(mime_type_for(Path::new("Makefile")), DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_read_base64_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let file = read_base64(Some(&LocalBinaryReader), &path).await.unwrap();
        assert_eq!(file.mime_type, "image/png");
        assert!(file.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(file.base64, "iVBORw==");
        assert_eq!(file.size, 4);
    }

    #[tokio::test]
    async fn test_read_base64_unavailable() {
        let err = read_base64(None, Path::new("/tmp/x.png")).await.unwrap_err();
        assert!(matches!(err, FileError::Unavailable { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_read_write_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/notes.txt");

        let written = write_text(&path, "hello", true).await.unwrap();
        assert_eq!(written, 5);
        assert_eq!(read_text(&path).await.unwrap(), "hello");

        let missing = read_text(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(missing, FileError::NotFound(_)));
        assert!(missing.is_retryable());
    }
}
