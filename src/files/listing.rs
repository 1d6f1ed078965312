//! Directory listing

use super::{FileEntry, FileError};
use std::path::Path;

/// List the entries of an absolute directory path, folders first
pub async fn list_directory(path: &Path) -> Result<Vec<FileEntry>, FileError> {
    if !path.is_absolute() {
        return Err(FileError::NotAbsolute(path.to_path_buf()));
    }

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| FileError::from_io(path, e))?;
    if !metadata.is_dir() {
        return Err(FileError::NotADirectory(path.to_path_buf()));
    }

    let mut reader = tokio::fs::read_dir(path)
        .await
        .map_err(|e| FileError::from_io(path, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| FileError::from_io(path, e))?
    {
        let entry_path = entry.path();
        // Entries can vanish between readdir and stat
        match tokio::fs::metadata(&entry_path).await {
            Ok(meta) => entries.push(FileEntry::from_metadata(&entry_path, &meta)),
            Err(e) => tracing::debug!("Skipping {:?}: {}", entry_path, e),
        }
    }

    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::EntryKind;

    #[tokio::test]
    async fn test_list_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join("a_folder")).unwrap();

        let entries = list_directory(dir.path()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a_folder");
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].size, None);
        assert_eq!(entries[1].name, "b.txt");
        assert_eq!(entries[1].size, Some(5));
    }

    #[tokio::test]
    async fn test_folder_size_not_serialized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let entries = list_directory(dir.path()).await.unwrap();
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("size").is_none());
    }

    #[tokio::test]
    async fn test_missing_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            list_directory(&missing).await,
            Err(FileError::NotFound(_))
        ));
        assert!(matches!(
            list_directory(Path::new("relative/dir")).await,
            Err(FileError::NotAbsolute(_))
        ));
    }
}
