//! `StorageAdapter`: the collaborator interface for type-set persistence
//! (spec.md §1 lists the file-ring storage adapter as out of scope; this is
//! the trait it would implement, plus a minimal JSON reference impl
//! sufficient to exercise load/save end to end).

use super::format::FileContents;
use crate::error::EngineError;

/// Owned exclusively by the persistence worker thread (spec §5 "Storage
/// adapters are owned by the persistence worker").
pub trait StorageAdapter: Send + Sync {
    fn save(&self, contents: &FileContents) -> Result<(), EngineError>;
    fn load(&self) -> Result<FileContents, EngineError>;
}

/// Reference adapter: one JSON file per type-set. Stands in for the
/// out-of-scope file-ring adapter (spec.md §1).
pub struct FileStorageAdapter {
    path: std::path::PathBuf,
}

impl FileStorageAdapter {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StorageAdapter for FileStorageAdapter {
    fn save(&self, contents: &FileContents) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(contents)
            .map_err(|e| EngineError::PersistFailure(format!("serialize {}: {e}", self.path.display())))?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json).map_err(|e| EngineError::PersistFailure(format!("write {}: {e}", tmp_path.display())))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| EngineError::PersistFailure(format!("rename into {}: {e}", self.path.display())))
    }

    fn load(&self) -> Result<FileContents, EngineError> {
        if !self.path.exists() {
            return Ok(FileContents {
                persisted_version_seq: 0,
                type_table_set: Vec::new(),
            });
        }
        let bytes = std::fs::read(&self.path).map_err(|e| EngineError::PersistFailure(format!("read {}: {e}", self.path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| EngineError::PersistFailure(format!("parse {}: {e}", self.path.display())))
    }
}
