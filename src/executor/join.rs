use std::collections::HashMap;

use tempfile::TempDir;

use crate::executor::condition::Filter;
use crate::executor::query::{OrderBy, QueryExecutor, QueryResult, project_record, row_matches};
use crate::executor::scan::{PageScanner, Scanner};
use crate::executor::sort::{RunMerger, read_run, sort_records, write_run};
use crate::storage::catalog::TableCatalog;
use crate::storage::storage_manager::StorageManager;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::{DataType, Value};

/// Parsed equality join predicate, normalized so `left_column` belongs
/// to the query's first table.
struct JoinOn {
    left_column: String,
    right_column: String,
}

/// The merged column namespace of a join: every column is addressable
/// as `table.column`, and as its plain name with the right side
/// overwriting plain-name collisions.
struct JoinNamespace {
    /// Canonical record layout: left columns then right, table-qualified.
    header: Vec<String>,
    /// Any accepted name (qualified or plain) → index into `header`.
    name_index: HashMap<String, usize>,
    /// Declared type per canonical header position.
    header_types: Vec<DataType>,
}

impl JoinNamespace {
    fn new(left_name: &str, left: &TableCatalog, right_name: &str, right: &TableCatalog) -> Self {
        let mut header = Vec::new();
        let mut name_index = HashMap::new();
        let mut header_types = Vec::new();
        for column in left.schema.columns.iter() {
            let index = header.len();
            header.push(format!("{left_name}.{}", column.name));
            header_types.push(column.data_type);
            name_index.insert(format!("{left_name}.{}", column.name), index);
            name_index.insert(column.name.clone(), index);
        }
        for column in right.schema.columns.iter() {
            let index = header.len();
            header.push(format!("{right_name}.{}", column.name));
            header_types.push(column.data_type);
            name_index.insert(format!("{right_name}.{}", column.name), index);
            // plain names resolve to the right table on collision
            name_index.insert(column.name.clone(), index);
        }
        Self {
            header,
            name_index,
            header_types,
        }
    }

    fn resolve(&self, name: &str) -> Option<(usize, DataType)> {
        self.name_index
            .get(name)
            .map(|index| (*index, self.header_types[*index]))
    }

    /// Typed field map over one merged record, keyed by every accepted
    /// name form.
    fn field_map(&self, record: &[String]) -> Result<HashMap<String, Value>> {
        let mut fields = HashMap::with_capacity(self.name_index.len());
        for (name, index) in &self.name_index {
            let text = record.get(*index).map(String::as_str).unwrap_or("");
            fields.insert(name.clone(), self.header_types[*index].parse(text)?);
        }
        Ok(fields)
    }

    /// Declared-type map in the same namespace, for the flat filter form.
    fn type_map(&self) -> HashMap<String, DataType> {
        self.name_index
            .iter()
            .map(|(name, index)| (name.clone(), self.header_types[*index]))
            .collect()
    }
}

/// Nested-loop equality join across two tables, page pair by page pair.
/// Ordered joins spill one sorted run per page pair and merge the runs
/// into a single globally ordered result.
pub struct JoinExecutor<'a> {
    storage: &'a StorageManager,
}

impl<'a> JoinExecutor<'a> {
    pub fn new(storage: &'a StorageManager) -> Self {
        Self { storage }
    }

    pub fn execute(
        &self,
        table: &str,
        columns: Option<&[String]>,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
        join_table: Option<&str>,
        join_condition: Option<&str>,
    ) -> Result<QueryResult> {
        let Some(join_table) = join_table else {
            return QueryExecutor::new(self.storage).execute(table, columns, filter, order_by);
        };
        let join_condition =
            join_condition.ok_or_else(|| DatabaseError::MalformedCondition {
                details: "join requires a join condition".to_string(),
            })?;
        if table == join_table {
            return Err(DatabaseError::MalformedCondition {
                details: "joining a table with itself is not supported".to_string(),
            });
        }

        let left = TableCatalog::open(self.storage.data_dir(), table)?;
        let right = TableCatalog::open(self.storage.data_dir(), join_table)?;
        let on = parse_join_condition(join_condition, table, &left, join_table, &right)?;

        let namespace = JoinNamespace::new(table, &left, join_table, &right);
        let projection: Vec<String> = match columns {
            Some(requested) => requested.to_vec(),
            None => namespace.header.clone(),
        };
        let mut projected = Vec::with_capacity(projection.len());
        for name in &projection {
            match namespace.resolve(name) {
                Some(entry) => projected.push(entry),
                None => {
                    return Err(DatabaseError::ColumnNotFound {
                        name: name.clone(),
                        table: format!("{table} join {join_table}"),
                    });
                }
            }
        }

        let compiled = match filter {
            Some(filter) => Some(filter.compile()?),
            None => None,
        };
        let types = namespace.type_map();

        // join key positions and types, one per side
        let (left_key, left_key_type) = match (
            left.schema.columns.index_of(&on.left_column),
            left.schema.data_type_of(&on.left_column),
        ) {
            (Some(index), Some(data_type)) => (index, data_type),
            _ => {
                return Err(DatabaseError::ColumnNotFound {
                    name: on.left_column.clone(),
                    table: table.to_string(),
                });
            }
        };
        let (right_key, right_key_type) = match (
            right.schema.columns.index_of(&on.right_column),
            right.schema.data_type_of(&on.right_column),
        ) {
            (Some(index), Some(data_type)) => (index, data_type),
            _ => {
                return Err(DatabaseError::ColumnNotFound {
                    name: on.right_column.clone(),
                    table: join_table.to_string(),
                });
            }
        };

        // global-order plumbing, set up only when ordering was requested
        let order = match order_by {
            Some(order) => {
                let (key_index, key_type) =
                    namespace
                        .resolve(&order.column)
                        .ok_or_else(|| DatabaseError::ColumnNotFound {
                            name: order.column.clone(),
                            table: format!("{table} join {join_table}"),
                        })?;
                Some((order, key_index, key_type, TempDir::new()?))
            }
            None => None,
        };

        let mut results: Vec<Vec<String>> = Vec::new();
        let mut runs = Vec::new();
        let mut left_scanner = PageScanner::new(&left);
        while let Some(left_rows) = left_scanner.next_page()? {
            let mut right_scanner = PageScanner::new(&right);
            while let Some(right_rows) = right_scanner.next_page()? {
                let mut matched: Vec<Vec<String>> = Vec::new();
                for left_row in &left_rows {
                    let left_text = left_row.fields.get(left_key).map(String::as_str).unwrap_or("");
                    let left_value = left_key_type.parse(left_text)?;
                    for right_row in &right_rows {
                        let right_text =
                            right_row.fields.get(right_key).map(String::as_str).unwrap_or("");
                        let right_value = right_key_type.parse(right_text)?;
                        if left_value != right_value {
                            continue;
                        }
                        let record: Vec<String> = left_row
                            .fields
                            .iter()
                            .chain(right_row.fields.iter())
                            .cloned()
                            .collect();
                        let fields = namespace.field_map(&record)?;
                        if row_matches(compiled.as_ref(), &fields, &types)? {
                            matched.push(record);
                        }
                    }
                }
                match &order {
                    Some((order, key_index, key_type, spill)) => {
                        if matched.is_empty() {
                            continue;
                        }
                        let matched =
                            sort_records(matched, *key_index, *key_type, order.direction)?;
                        let path = spill.path().join(format!("run_{}.csv", runs.len()));
                        write_run(&path, &namespace.header, &matched)?;
                        runs.push(path);
                    }
                    None => results.extend(matched),
                }
            }
        }

        if let Some((order, key_index, key_type, spill)) = &order {
            let key_name = namespace.header[*key_index].clone();
            let merger = RunMerger::new(spill.path(), key_name, *key_type, order.direction);
            let merged = merger.merge(runs)?;
            let (_, records) = read_run(&merged)?;
            results = records;
        }

        let mut rows = Vec::with_capacity(results.len());
        for record in &results {
            rows.push(project_record(record, &projected)?);
        }
        Ok(QueryResult {
            columns: projection,
            rows,
        })
    }
}

/// Parse `table.column==table.column`, accepting the two tables in
/// either order.
fn parse_join_condition(
    text: &str,
    left_name: &str,
    left: &TableCatalog,
    right_name: &str,
    right: &TableCatalog,
) -> Result<JoinOn> {
    let malformed = || DatabaseError::MalformedCondition {
        details: format!("join condition must be `table.column==table.column`, got '{text}'"),
    };
    let (lhs, rhs) = text.split_once("==").ok_or_else(malformed)?;
    let (lhs_table, lhs_column) = lhs.trim().split_once('.').ok_or_else(malformed)?;
    let (rhs_table, rhs_column) = rhs.trim().split_once('.').ok_or_else(malformed)?;

    let (left_column, right_column) = if lhs_table == left_name && rhs_table == right_name {
        (lhs_column.to_string(), rhs_column.to_string())
    } else if lhs_table == right_name && rhs_table == left_name {
        (rhs_column.to_string(), lhs_column.to_string())
    } else {
        let unknown = if lhs_table != left_name && lhs_table != right_name {
            lhs_table
        } else {
            rhs_table
        };
        return Err(DatabaseError::TableNotFound {
            name: unknown.to_string(),
        });
    };

    if !left.schema.has_column(&left_column) {
        return Err(DatabaseError::ColumnNotFound {
            name: left_column,
            table: left_name.to_string(),
        });
    }
    if !right.schema.has_column(&right_column) {
        return Err(DatabaseError::ColumnNotFound {
            name: right_column,
            table: right_name.to_string(),
        });
    }
    Ok(JoinOn {
        left_column,
        right_column,
    })
}
