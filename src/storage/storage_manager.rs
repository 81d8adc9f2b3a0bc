use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::executor::aggregate::{AggregateFunction, GroupByExecutor};
use crate::executor::condition::Filter;
use crate::executor::join::JoinExecutor;
use crate::executor::query::{OrderBy, QueryExecutor, QueryResult};
use crate::storage::catalog::TableCatalog;
use crate::storage::schema::{ColumnSchema, TableSchema};
use crate::types::error::{DatabaseError, Result};

/// Root of the engine: a data directory holding one subdirectory per
/// table. All state lives on disk; the manager itself is only the path,
/// so every operation observes the latest persisted state.
pub struct StorageManager {
    data_dir: PathBuf,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn check_table_exists(&self, name: &str) -> bool {
        self.data_dir.join(name).exists()
    }

    pub fn create_table(
        &self,
        name: &str,
        columns: Vec<ColumnSchema>,
        primary_key: &str,
    ) -> Result<()> {
        if columns.is_empty() {
            return Err(DatabaseError::InvalidData {
                details: format!("table '{name}' must have at least one column"),
            });
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DatabaseError::InvalidData {
                    details: format!("duplicate column name: {}", column.name),
                });
            }
        }
        if !columns.iter().any(|column| column.name == primary_key) {
            return Err(DatabaseError::ColumnNotFound {
                name: primary_key.to_string(),
                table: name.to_string(),
            });
        }
        let schema = TableSchema::new(columns, primary_key);
        TableCatalog::create(&self.data_dir, name, schema)?;
        info!(table = name, primary_key, "created table");
        Ok(())
    }

    /// Insert one row given textual column values. The duplicate-key
    /// check runs before id allocation, so a rejected insert never
    /// consumes an id.
    pub fn insert(&self, table: &str, values: &HashMap<String, String>) -> Result<()> {
        let mut catalog = TableCatalog::open(&self.data_dir, table)?;
        let row = catalog.schema.prepare_row(table, values)?;
        let pk_text = catalog.schema.primary_key_text(table, values)?;
        if catalog.index.contains(&pk_text) {
            return Err(DatabaseError::DuplicatePrimaryKey { value: pk_text });
        }
        let (row_id, is_new) = catalog.allocate_row_id()?;
        if let Err(write_err) = catalog.write_row(row_id, row) {
            if is_new {
                // best-effort compensation, not a transaction
                catalog.metadata.auto_id -= 1;
                if let Err(flush_err) = catalog.flush_metadata() {
                    warn!(table, error = %flush_err, "failed to roll back row-id counter");
                }
            }
            return Err(write_err);
        }
        if !is_new {
            catalog.metadata.deleted_ids.retain(|id| *id != row_id);
            catalog.flush_metadata()?;
        }
        catalog.index.insert(pk_text, row_id)?;
        catalog.flush_index()?;
        debug!(table, row_id, "inserted row");
        Ok(())
    }

    /// Overwrite the row whose `column` holds `value`, resolved through
    /// the primary-key index. A changed primary-key value re-keys the
    /// index before the row write.
    pub fn update(
        &self,
        table: &str,
        column: &str,
        value: &str,
        new_values: &HashMap<String, String>,
    ) -> Result<()> {
        let mut catalog = TableCatalog::open(&self.data_dir, table)?;
        if !catalog.schema.has_column(column) {
            return Err(DatabaseError::ColumnNotFound {
                name: column.to_string(),
                table: table.to_string(),
            });
        }
        let lookup_key = catalog.schema.lookup_key(value);
        let row_id = catalog.index.lookup(&lookup_key)?;
        if catalog.schema.primary_key == column {
            let new_pk = catalog.schema.primary_key_text(table, new_values)?;
            if new_pk != lookup_key {
                catalog.index.rekey(&lookup_key, new_pk)?;
                catalog.flush_index()?;
            }
        }
        let row = catalog.schema.prepare_row(table, new_values)?;
        catalog.write_row(row_id, row)?;
        debug!(table, row_id, "updated row");
        Ok(())
    }

    /// Tombstone the row whose primary key holds `value`. Only the
    /// primary-key column is a valid delete target.
    pub fn delete(&self, table: &str, column: &str, value: &str) -> Result<()> {
        let mut catalog = TableCatalog::open(&self.data_dir, table)?;
        if catalog.schema.primary_key != column {
            return Err(DatabaseError::InvalidDeleteTarget {
                column: column.to_string(),
                table: table.to_string(),
            });
        }
        let lookup_key = catalog.schema.lookup_key(value);
        // index entry goes first; the slot write may still fail afterwards
        let row_id = catalog.index.remove(&lookup_key)?;
        catalog.flush_index()?;
        catalog.tombstone(row_id)?;
        debug!(table, row_id, "deleted row");
        Ok(())
    }

    /// Full-table scan with optional filter, projection and global
    /// ordering.
    pub fn execute_query(
        &self,
        table: &str,
        columns: Option<&[String]>,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> Result<QueryResult> {
        QueryExecutor::new(self).execute(table, columns, filter, order_by)
    }

    /// Nested-loop equality join, falling back to a plain query when no
    /// join table is given.
    pub fn execute_join_query(
        &self,
        table: &str,
        columns: Option<&[String]>,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
        join_table: Option<&str>,
        join_condition: Option<&str>,
    ) -> Result<QueryResult> {
        JoinExecutor::new(self).execute(table, columns, filter, order_by, join_table, join_condition)
    }

    /// Single-pass group-by aggregation.
    pub fn perform_group_by(
        &self,
        table: &str,
        group_column: &str,
        function: AggregateFunction,
        aggregate_column: &str,
    ) -> Result<Vec<(String, f64)>> {
        GroupByExecutor::new(self).execute(table, group_column, function, aggregate_column)
    }
}
