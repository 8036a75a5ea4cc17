// Persistent file identity and the by-id lookup used to resolve it
use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Persistent identifier of a submitted source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for FileId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A submitted source file as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: FileId,
    /// Display name (usually the path inside the submission)
    pub name: String,
}

impl SourceFile {
    pub fn new(id: impl Into<FileId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Resolves persistent file ids to full file records
///
/// Match records only keep ids and go through this lookup when a caller asks
/// for the file, so a long-lived record never pins file contents in memory.
pub trait FileLookup: Send + Sync {
    fn source_file(&self, id: FileId) -> Option<Arc<SourceFile>>;
}

/// Simple thread-safe lookup backed by a hash map
#[derive(Default)]
pub struct InMemoryFileStore {
    files: RwLock<HashMap<FileId, Arc<SourceFile>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a file, returning the shared handle
    pub fn insert(&self, file: SourceFile) -> Arc<SourceFile> {
        let file = Arc::new(file);
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.id, file.clone());
        file
    }

    pub fn remove(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileLookup for InMemoryFileStore {
    fn source_file(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}
