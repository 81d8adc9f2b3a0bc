use serde::{Deserialize, Serialize};

use crate::types::{PageNumber, RowId, page_number};

/// Row-id bookkeeping persisted as `<table>_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Highest id ever allocated; -1 means none yet.
    pub auto_id: i64,
    /// Reclaimed ids, reused LIFO from the back.
    pub deleted_ids: Vec<RowId>,
}

impl Default for TableMetadata {
    fn default() -> Self {
        Self {
            auto_id: -1,
            deleted_ids: Vec::new(),
        }
    }
}

impl TableMetadata {
    pub fn last_allocated(&self) -> Option<RowId> {
        if self.auto_id < 0 {
            None
        } else {
            Some(self.auto_id as RowId)
        }
    }

    /// Number of pages covered by allocated ids; 0 for a fresh table.
    pub fn page_count(&self) -> PageNumber {
        match self.last_allocated() {
            Some(id) => page_number(id) + 1,
            None => 0,
        }
    }
}
