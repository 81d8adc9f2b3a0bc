use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::error::{DatabaseError, Result};
use crate::types::row::Row;
use crate::types::value::{DataType, Value};

/// A single column declaration. Position in the parent `Columns` vec is
/// the on-disk field position.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column list, serialized as the `{"name": "type", ...}` object
/// of `<table>_schema.json`. JSON object order is the schema order, so
/// (de)serialization goes through a map visitor instead of a `HashMap`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Columns(Vec<ColumnSchema>);

impl Columns {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self(columns)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnSchema> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.0.iter().find(|column| column.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|column| column.name == name)
    }
}

impl Serialize for Columns {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for column in &self.0 {
            map.serialize_entry(&column.name, &column.data_type)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Columns {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = Columns;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of column name to type tag")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Columns, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns = Vec::new();
                while let Some((name, data_type)) = map.next_entry::<String, DataType>()? {
                    columns.push(ColumnSchema { name, data_type });
                }
                Ok(Columns(columns))
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}

/// Table schema: ordered columns plus the designated primary-key column.
/// Immutable once the table is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Columns,
    pub primary_key: String,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>, primary_key: impl Into<String>) -> Self {
        Self {
            columns: Columns::new(columns),
            primary_key: primary_key.into(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.get(name).is_some()
    }

    pub fn data_type_of(&self, name: &str) -> Option<DataType> {
        self.columns.get(name).map(|column| column.data_type)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Convert caller-supplied textual values into a storable row,
    /// validating that every schema column is present and convertible.
    pub fn prepare_row(&self, table: &str, values: &HashMap<String, String>) -> Result<Row> {
        let mut fields = Vec::with_capacity(self.columns.len());
        for column in self.columns.iter() {
            let raw = values
                .get(&column.name)
                .ok_or_else(|| DatabaseError::ColumnNotFound {
                    name: column.name.clone(),
                    table: table.to_string(),
                })?;
            let value = column.data_type.parse(raw)?;
            fields.push(value.to_string());
        }
        Ok(Row::new(fields))
    }

    /// Decode a stored row into typed values, zipped against the columns.
    pub fn decode_row(&self, row: &Row) -> Result<Vec<Value>> {
        self.columns
            .iter()
            .zip(&row.fields)
            .map(|(column, field)| column.data_type.parse(field))
            .collect()
    }

    /// Column-name → typed-value map for condition evaluation.
    pub fn field_map(&self, row: &Row) -> Result<HashMap<String, Value>> {
        let mut fields = HashMap::with_capacity(self.columns.len());
        for (column, field) in self.columns.iter().zip(&row.fields) {
            fields.insert(column.name.clone(), column.data_type.parse(field)?);
        }
        Ok(fields)
    }

    /// Column-name → declared-type map for the flat condition form.
    pub fn type_map(&self) -> HashMap<String, DataType> {
        self.columns
            .iter()
            .map(|column| (column.name.clone(), column.data_type))
            .collect()
    }

    /// Canonical index text of the primary-key value found in `values`.
    pub fn primary_key_text(&self, table: &str, values: &HashMap<String, String>) -> Result<String> {
        let data_type =
            self.data_type_of(&self.primary_key)
                .ok_or_else(|| DatabaseError::ColumnNotFound {
                    name: self.primary_key.clone(),
                    table: table.to_string(),
                })?;
        let raw = values
            .get(&self.primary_key)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: self.primary_key.clone(),
                table: table.to_string(),
            })?;
        Ok(data_type.parse(raw)?.to_string())
    }

    /// Canonical index key for a caller-supplied primary-key value.
    /// Falls back to the raw text when it does not parse; the lookup
    /// then simply misses.
    pub fn lookup_key(&self, raw: &str) -> String {
        match self.data_type_of(&self.primary_key) {
            Some(data_type) => data_type
                .parse(raw)
                .map(|value| value.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}
