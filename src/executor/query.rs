use std::collections::HashMap;

use tempfile::TempDir;

use crate::executor::condition::{CompiledFilter, Filter};
use crate::executor::scan::{PageScanner, Scanner};
use crate::executor::sort::{RunMerger, SortDirection, read_run, sort_records, write_run};
use crate::storage::catalog::TableCatalog;
use crate::storage::storage_manager::StorageManager;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::{DataType, Value};

/// Global ordering request: column plus direction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// Projected result set: header plus typed rows in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Full-table scan / filter / project. An ordered query spills each
/// page's sorted matches as a run and routes through the external run
/// merge, so the result is globally ordered even across many pages.
pub struct QueryExecutor<'a> {
    storage: &'a StorageManager,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(storage: &'a StorageManager) -> Self {
        Self { storage }
    }

    pub fn execute(
        &self,
        table: &str,
        columns: Option<&[String]>,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> Result<QueryResult> {
        let catalog = TableCatalog::open(self.storage.data_dir(), table)?;
        let schema = &catalog.schema;

        let projection: Vec<String> = match columns {
            Some(requested) => requested.to_vec(),
            None => schema.column_names(),
        };
        // field position and declared type per projected column
        let mut projected = Vec::with_capacity(projection.len());
        for name in &projection {
            match (schema.columns.index_of(name), schema.data_type_of(name)) {
                (Some(index), Some(data_type)) => projected.push((index, data_type)),
                _ => {
                    return Err(DatabaseError::ColumnNotFound {
                        name: name.clone(),
                        table: table.to_string(),
                    });
                }
            }
        }

        let compiled = match filter {
            Some(filter) => Some(filter.compile()?),
            None => None,
        };
        let types = schema.type_map();
        let mut scanner = PageScanner::new(&catalog);

        if let Some(order) = order_by {
            let (key_index, key_type) = match (
                schema.columns.index_of(&order.column),
                schema.data_type_of(&order.column),
            ) {
                (Some(index), Some(data_type)) => (index, data_type),
                _ => {
                    return Err(DatabaseError::ColumnNotFound {
                        name: order.column.clone(),
                        table: table.to_string(),
                    });
                }
            };
            // per-invocation spill namespace; dropped (and removed) on return
            let spill = TempDir::new()?;
            let header = schema.column_names();
            let mut runs = Vec::new();
            while let Some(rows) = scanner.next_page()? {
                let mut matched = Vec::new();
                for row in rows {
                    let fields = schema.field_map(&row)?;
                    if row_matches(compiled.as_ref(), &fields, &types)? {
                        matched.push(row.fields);
                    }
                }
                if matched.is_empty() {
                    continue;
                }
                let matched = sort_records(matched, key_index, key_type, order.direction)?;
                let path = spill.path().join(format!("run_{}.csv", runs.len()));
                write_run(&path, &header, &matched)?;
                runs.push(path);
            }
            let merger = RunMerger::new(spill.path(), order.column.as_str(), key_type, order.direction);
            let merged = merger.merge(runs)?;
            let (_, records) = read_run(&merged)?;
            let mut rows = Vec::with_capacity(records.len());
            for record in records {
                rows.push(project_record(&record, &projected)?);
            }
            Ok(QueryResult {
                columns: projection,
                rows,
            })
        } else {
            let mut rows = Vec::new();
            while let Some(page_rows) = scanner.next_page()? {
                for row in page_rows {
                    let fields = schema.field_map(&row)?;
                    if row_matches(compiled.as_ref(), &fields, &types)? {
                        rows.push(project_record(&row.fields, &projected)?);
                    }
                }
            }
            Ok(QueryResult {
                columns: projection,
                rows,
            })
        }
    }
}

pub(crate) fn row_matches(
    compiled: Option<&CompiledFilter>,
    fields: &HashMap<String, Value>,
    types: &HashMap<String, DataType>,
) -> Result<bool> {
    match compiled {
        Some(filter) => filter.matches(fields, types),
        None => Ok(true),
    }
}

pub(crate) fn project_record(
    record: &[String],
    projected: &[(usize, DataType)],
) -> Result<Vec<Value>> {
    projected
        .iter()
        .map(|(index, data_type)| {
            data_type.parse(record.get(*index).map(String::as_str).unwrap_or(""))
        })
        .collect()
}
