use std::collections::HashMap;

use tracing::warn;

use crate::executor::scan::{PageScanner, Scanner};
use crate::storage::catalog::TableCatalog;
use crate::storage::storage_manager::StorageManager;
use crate::types::error::{DatabaseError, Result};

/// Aggregate functions supported by group-by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Count,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn parse(text: &str) -> Result<Self> {
        match text.to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggregateFunction::Sum),
            "COUNT" => Ok(AggregateFunction::Count),
            "MIN" => Ok(AggregateFunction::Min),
            "MAX" => Ok(AggregateFunction::Max),
            other => Err(DatabaseError::UnsupportedOperator {
                operator: other.to_string(),
            }),
        }
    }
}

/// Running state for one distinct group value.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
    max: f64,
    min: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }
}

impl Accumulator {
    /// Only the requested function's slot advances; COUNT counts the row
    /// no matter what the aggregate value was.
    fn apply(&mut self, function: AggregateFunction, value: f64) {
        match function {
            AggregateFunction::Sum => self.sum += value,
            AggregateFunction::Count => self.count += 1,
            AggregateFunction::Max => {
                if value > self.max {
                    self.max = value;
                }
            }
            AggregateFunction::Min => {
                if value < self.min {
                    self.min = value;
                }
            }
        }
    }

    fn result(&self, function: AggregateFunction) -> f64 {
        match function {
            AggregateFunction::Sum => self.sum,
            AggregateFunction::Count => self.count as f64,
            AggregateFunction::Max => self.max,
            AggregateFunction::Min => self.min,
        }
    }
}

/// Single-pass group-by over all pages of one table. Output pairs come
/// back in first-seen group order.
pub struct GroupByExecutor<'a> {
    storage: &'a StorageManager,
}

impl<'a> GroupByExecutor<'a> {
    pub fn new(storage: &'a StorageManager) -> Self {
        Self { storage }
    }

    pub fn execute(
        &self,
        table: &str,
        group_column: &str,
        function: AggregateFunction,
        aggregate_column: &str,
    ) -> Result<Vec<(String, f64)>> {
        let catalog = TableCatalog::open(self.storage.data_dir(), table)?;
        let group_index = catalog
            .schema
            .columns
            .index_of(group_column)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: group_column.to_string(),
                table: table.to_string(),
            })?;
        let aggregate_index = catalog
            .schema
            .columns
            .index_of(aggregate_column)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: aggregate_column.to_string(),
                table: table.to_string(),
            })?;

        let mut seen_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Accumulator> = HashMap::new();
        let mut scanner = PageScanner::new(&catalog);
        while let Some(rows) = scanner.next_page()? {
            for row in rows {
                let group_value = row.fields.get(group_index).cloned().unwrap_or_default();
                let raw = row
                    .fields
                    .get(aggregate_index)
                    .map(String::as_str)
                    .unwrap_or("");
                // a value that won't parse is counted as 0, not an error
                let value = match raw.parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        warn!(
                            table,
                            column = aggregate_column,
                            value = raw,
                            "non-numeric aggregate value treated as 0"
                        );
                        0.0
                    }
                };
                let entry = groups.entry(group_value.clone()).or_insert_with(|| {
                    seen_order.push(group_value.clone());
                    Accumulator::default()
                });
                entry.apply(function, value);
            }
        }

        Ok(seen_order
            .into_iter()
            .map(|group| {
                let result = groups
                    .get(&group)
                    .map(|accumulator| accumulator.result(function))
                    .unwrap_or_default();
                (group, result)
            })
            .collect())
    }
}
