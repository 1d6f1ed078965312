//! Path permission grants
//!
//! Grants are keyed by `(path, operation)`. Session grants live in process
//! memory for the lifetime of the store; persistent grants go through a
//! [`PermissionStorage`] backend (sled by default) and survive restarts.
//! Lookups consult session grants first. A grant on a directory covers
//! everything beneath it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

const PERMISSIONS_TREE: &str = "permissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Read,
    Write,
    Execute,
}

impl FileOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileOperation::Read => "read",
            FileOperation::Write => "write",
            FileOperation::Execute => "execute",
        }
    }
}

impl std::str::FromStr for FileOperation {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(FileOperation::Read),
            "write" => Ok(FileOperation::Write),
            "execute" => Ok(FileOperation::Execute),
            other => Err(PermissionError::InvalidOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// Process lifetime only
    Session,
    /// Survives restarts
    Persistent,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionKey {
    pub path: PathBuf,
    pub operation: FileOperation,
}

impl PermissionKey {
    pub fn new(path: impl AsRef<Path>, operation: FileOperation) -> Self {
        Self {
            path: normalize(path.as_ref()),
            operation,
        }
    }

    fn storage_key(&self) -> String {
        format!("{}:{}", self.operation.as_str(), self.path.to_string_lossy())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub path: PathBuf,
    pub operation: FileOperation,
    pub scope: GrantScope,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("permission storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode permission grant: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid operation '{0}' (expected read, write or execute)")]
    InvalidOperation(String),
    #[error("no config directory found")]
    NoConfigDir,
}

/// Persistent grant storage collaborator
pub trait PermissionStorage: Send + Sync {
    fn check(&self, key: &PermissionKey) -> Result<bool, PermissionError>;
    fn grant(&self, grant: &PermissionGrant) -> Result<(), PermissionError>;
    fn revoke(&self, key: &PermissionKey) -> Result<bool, PermissionError>;
    fn list(&self) -> Result<Vec<PermissionGrant>, PermissionError>;
}

/// Sled-backed persistent grants
pub struct SledPermissionStorage {
    db: Arc<Db>,
}

impl SledPermissionStorage {
    /// Open the store at the default location
    pub fn new() -> Result<Self, PermissionError> {
        let mut path = dirs::config_dir().ok_or(PermissionError::NoConfigDir)?;
        path.push("deskpilot");
        path.push("permissions.db");
        Self::open(path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, PermissionError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// In-memory database, discarded on drop
    pub fn temporary() -> Result<Self, PermissionError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl PermissionStorage for SledPermissionStorage {
    fn check(&self, key: &PermissionKey) -> Result<bool, PermissionError> {
        let tree = self.db.open_tree(PERMISSIONS_TREE)?;
        Ok(tree.contains_key(key.storage_key().as_bytes())?)
    }

    fn grant(&self, grant: &PermissionGrant) -> Result<(), PermissionError> {
        let tree = self.db.open_tree(PERMISSIONS_TREE)?;
        let key = PermissionKey::new(&grant.path, grant.operation);
        tree.insert(key.storage_key().as_bytes(), serde_json::to_vec(grant)?)?;
        tree.flush()?;
        Ok(())
    }

    fn revoke(&self, key: &PermissionKey) -> Result<bool, PermissionError> {
        let tree = self.db.open_tree(PERMISSIONS_TREE)?;
        let removed = tree.remove(key.storage_key().as_bytes())?.is_some();
        tree.flush()?;
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<PermissionGrant>, PermissionError> {
        let tree = self.db.open_tree(PERMISSIONS_TREE)?;
        let mut grants = Vec::new();
        for item in tree.iter() {
            let (_, value) = item?;
            grants.push(serde_json::from_slice(&value)?);
        }
        Ok(grants)
    }
}

/// Session + persisted grant lookup
pub struct PermissionStore {
    session: RwLock<HashMap<PermissionKey, PermissionGrant>>,
    persisted: Option<Arc<dyn PermissionStorage>>,
}

impl PermissionStore {
    /// Session-only store
    pub fn in_memory() -> Self {
        Self {
            session: RwLock::new(HashMap::new()),
            persisted: None,
        }
    }

    pub fn with_storage(storage: Arc<dyn PermissionStorage>) -> Self {
        Self {
            session: RwLock::new(HashMap::new()),
            persisted: Some(storage),
        }
    }

    /// Scope of the grant covering `path` for `operation`, if any
    pub fn check(&self, path: &Path, operation: FileOperation) -> Option<GrantScope> {
        let path = normalize(path);

        if let Ok(session) = self.session.read() {
            let covered = path
                .ancestors()
                .any(|p| session.contains_key(&PermissionKey::new(p, operation)));
            if covered {
                return Some(GrantScope::Session);
            }
        }

        let storage = self.persisted.as_ref()?;
        for ancestor in path.ancestors() {
            match storage.check(&PermissionKey::new(ancestor, operation)) {
                Ok(true) => return Some(GrantScope::Persistent),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Permission storage lookup failed: {}", e);
                    return None;
                }
            }
        }
        None
    }

    pub fn is_granted(&self, path: &Path, operation: FileOperation) -> bool {
        self.check(path, operation).is_some()
    }

    pub fn grant(
        &self,
        path: &Path,
        operation: FileOperation,
        scope: GrantScope,
    ) -> Result<PermissionGrant, PermissionError> {
        let key = PermissionKey::new(path, operation);
        let grant = PermissionGrant {
            path: key.path.clone(),
            operation,
            scope,
            granted_at: Utc::now(),
        };

        match scope {
            GrantScope::Session => {
                if let Ok(mut session) = self.session.write() {
                    session.insert(key, grant.clone());
                }
            }
            GrantScope::Persistent => match &self.persisted {
                Some(storage) => storage.grant(&grant)?,
                None => {
                    tracing::warn!(
                        "No persistent permission storage; keeping grant for {:?} in session",
                        grant.path
                    );
                    if let Ok(mut session) = self.session.write() {
                        session.insert(key, grant.clone());
                    }
                }
            },
        }

        tracing::info!(
            "Granted {} on {:?} ({:?})",
            operation.as_str(),
            grant.path,
            scope
        );
        Ok(grant)
    }

    /// Remove both the session entry and any persisted record for the key
    pub fn revoke(&self, path: &Path, operation: FileOperation) -> Result<bool, PermissionError> {
        let key = PermissionKey::new(path, operation);
        let mut removed = self
            .session
            .write()
            .map(|mut session| session.remove(&key).is_some())
            .unwrap_or(false);
        if let Some(storage) = &self.persisted {
            removed |= storage.revoke(&key)?;
        }
        Ok(removed)
    }

    pub fn list(&self) -> Result<Vec<PermissionGrant>, PermissionError> {
        let mut grants: Vec<PermissionGrant> = self
            .session
            .read()
            .map(|session| session.values().cloned().collect())
            .unwrap_or_default();
        if let Some(storage) = &self.persisted {
            grants.extend(storage.list()?);
        }
        grants.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(grants)
    }
}

/// Resolve `.` and `..` lexically; `..` never climbs above the root
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PermissionStore {
        PermissionStore::with_storage(Arc::new(SledPermissionStorage::temporary().unwrap()))
    }

    #[test]
    fn test_session_grant_covers_children() {
        let store = PermissionStore::in_memory();
        store
            .grant(Path::new("/work/project"), FileOperation::Write, GrantScope::Session)
            .unwrap();

        assert_eq!(
            store.check(Path::new("/work/project/src/main.rs"), FileOperation::Write),
            Some(GrantScope::Session)
        );
        assert!(!store.is_granted(Path::new("/work/other"), FileOperation::Write));
        assert!(!store.is_granted(Path::new("/work/project"), FileOperation::Read));
    }

    #[test]
    fn test_session_checked_before_persisted() {
        let store = store();
        store
            .grant(Path::new("/data"), FileOperation::Read, GrantScope::Persistent)
            .unwrap();
        assert_eq!(
            store.check(Path::new("/data/a.txt"), FileOperation::Read),
            Some(GrantScope::Persistent)
        );

        store
            .grant(Path::new("/data"), FileOperation::Read, GrantScope::Session)
            .unwrap();
        assert_eq!(
            store.check(Path::new("/data/a.txt"), FileOperation::Read),
            Some(GrantScope::Session)
        );
    }

    #[test]
    fn test_revoke_removes_both() {
        let store = store();
        let path = Path::new("/data/notes");
        store.grant(path, FileOperation::Write, GrantScope::Session).unwrap();
        store.grant(path, FileOperation::Write, GrantScope::Persistent).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        assert!(store.revoke(path, FileOperation::Write).unwrap());
        assert!(!store.is_granted(path, FileOperation::Write));
        assert!(store.list().unwrap().is_empty());
        assert!(!store.revoke(path, FileOperation::Write).unwrap());
    }

    #[test]
    fn test_trailing_separator_normalized() {
        let store = PermissionStore::in_memory();
        store
            .grant(Path::new("/tmp/x/"), FileOperation::Read, GrantScope::Session)
            .unwrap();
        assert!(store.is_granted(Path::new("/tmp/x"), FileOperation::Read));
    }

    #[test]
    fn test_parent_components_cannot_escape_grant() {
        let store = PermissionStore::in_memory();
        store
            .grant(Path::new("/work/project"), FileOperation::Write, GrantScope::Session)
            .unwrap();

        assert!(!store.is_granted(
            Path::new("/work/project/../../etc/passwd"),
            FileOperation::Write
        ));
        assert!(!store.is_granted(Path::new("/work/project/.."), FileOperation::Write));
        assert!(store.is_granted(
            Path::new("/work/project/src/../README.md"),
            FileOperation::Write
        ));
        assert_eq!(normalize(Path::new("/../../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn test_parse_operation() {
        assert_eq!("write".parse::<FileOperation>().unwrap(), FileOperation::Write);
        assert!("delete".parse::<FileOperation>().is_err());
    }
}
