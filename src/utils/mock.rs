use std::path::Path;

use tempfile::TempDir;

use crate::storage::storage_manager::StorageManager;

/// RAII data directory for tests and benches: a fresh engine rooted in
/// a temp dir, removed when the value drops.
pub struct TempData {
    dir: TempDir,
}

impl TempData {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp data dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage_manager(&self) -> StorageManager {
        StorageManager::new(self.dir.path()).expect("failed to open storage manager")
    }
}

impl Default for TempData {
    fn default() -> Self {
        Self::new()
    }
}
