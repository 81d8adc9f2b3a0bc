use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::RowId;
use crate::types::error::{DatabaseError, Result};

/// Primary-key value (canonical text) → row id. Persisted as one JSON
/// map per table, rewritten in full on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKeyIndex {
    entries: HashMap<String, RowId>,
}

impl PrimaryKeyIndex {
    pub fn lookup(&self, value: &str) -> Result<RowId> {
        self.entries
            .get(value)
            .copied()
            .ok_or_else(|| DatabaseError::PrimaryKeyNotFound {
                value: value.to_string(),
            })
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains_key(value)
    }

    pub fn insert(&mut self, value: String, row_id: RowId) -> Result<()> {
        if self.entries.contains_key(&value) {
            return Err(DatabaseError::DuplicatePrimaryKey { value });
        }
        self.entries.insert(value, row_id);
        Ok(())
    }

    pub fn remove(&mut self, value: &str) -> Result<RowId> {
        self.entries
            .remove(value)
            .ok_or_else(|| DatabaseError::PrimaryKeyNotFound {
                value: value.to_string(),
            })
    }

    /// Move an entry to a new key when the primary-key column changes.
    pub fn rekey(&mut self, old_value: &str, new_value: String) -> Result<RowId> {
        if self.entries.contains_key(&new_value) {
            return Err(DatabaseError::DuplicatePrimaryKey { value: new_value });
        }
        let row_id = self.remove(old_value)?;
        self.entries.insert(new_value, row_id);
        Ok(row_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
