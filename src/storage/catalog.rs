use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::storage::index::PrimaryKeyIndex;
use crate::storage::metadata::TableMetadata;
use crate::storage::schema::TableSchema;
use crate::types::error::{DatabaseError, Result};
use crate::types::page::Page;
use crate::types::row::Row;
use crate::types::value::Value;
use crate::types::{PageNumber, RowId, page_number, slot_position};

const SCHEMA_SUFFIX: &str = "_schema.json";
const METADATA_SUFFIX: &str = "_metadata.json";
const INDEX_SUFFIX: &str = "_primary_key_index.json";

/// Per-table persisted state behind one load-on-open / flush-on-mutation
/// boundary. Every engine operation opens a fresh catalog, so callers
/// always observe the latest on-disk state and nothing is cached across
/// calls.
pub struct TableCatalog {
    table_name: String,
    dir: PathBuf,
    pub schema: TableSchema,
    pub metadata: TableMetadata,
    pub index: PrimaryKeyIndex,
}

impl TableCatalog {
    pub fn open(data_dir: &Path, table_name: &str) -> Result<Self> {
        let dir = data_dir.join(table_name);
        if !dir.exists() {
            return Err(DatabaseError::TableNotFound {
                name: table_name.to_string(),
            });
        }
        let schema = read_json(&dir.join(format!("{table_name}{SCHEMA_SUFFIX}")))?;
        let metadata = read_json(&dir.join(format!("{table_name}{METADATA_SUFFIX}")))?;
        let index = read_json(&dir.join(format!("{table_name}{INDEX_SUFFIX}")))?;
        Ok(Self {
            table_name: table_name.to_string(),
            dir,
            schema,
            metadata,
            index,
        })
    }

    /// Persist a fresh table: schema, empty metadata, empty index and an
    /// empty first page.
    pub fn create(data_dir: &Path, table_name: &str, schema: TableSchema) -> Result<Self> {
        let dir = data_dir.join(table_name);
        if dir.exists() {
            return Err(DatabaseError::TableAlreadyExists {
                name: table_name.to_string(),
            });
        }
        fs::create_dir_all(&dir)?;
        let catalog = Self {
            table_name: table_name.to_string(),
            dir,
            schema,
            metadata: TableMetadata::default(),
            index: PrimaryKeyIndex::default(),
        };
        catalog.flush_schema()?;
        catalog.flush_metadata()?;
        catalog.flush_index()?;
        fs::write(catalog.page_path(0), "")?;
        Ok(catalog)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn page_path(&self, page: PageNumber) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.table_name, page))
    }

    fn state_path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.table_name, suffix))
    }

    fn flush_schema(&self) -> Result<()> {
        write_json(&self.state_path(SCHEMA_SUFFIX), &self.schema)
    }

    pub fn flush_metadata(&self) -> Result<()> {
        write_json(&self.state_path(METADATA_SUFFIX), &self.metadata)
    }

    pub fn flush_index(&self) -> Result<()> {
        write_json(&self.state_path(INDEX_SUFFIX), &self.index)
    }

    /// Pop a reclaimed id (most recently deleted first) or advance the
    /// counter. Only the new-id path persists the counter here; a reused
    /// id is flushed out of the free list by the caller once the row
    /// write has landed.
    pub fn allocate_row_id(&mut self) -> Result<(RowId, bool)> {
        if let Some(row_id) = self.metadata.deleted_ids.pop() {
            return Ok((row_id, false));
        }
        self.metadata.auto_id += 1;
        self.flush_metadata()?;
        Ok((self.metadata.auto_id as RowId, true))
    }

    pub fn page_count(&self) -> PageNumber {
        self.metadata.page_count()
    }

    pub fn read_page(&self, page: PageNumber) -> Result<Page> {
        let path = self.page_path(page);
        if !path.exists() {
            return Ok(Page::default());
        }
        Ok(Page::from_csv(&fs::read_to_string(path)?))
    }

    /// Non-tombstone rows of one page, decoded per schema.
    pub fn read_rows(&self, page: PageNumber) -> Result<Vec<Vec<Value>>> {
        let page = self.read_page(page)?;
        page.live_rows()
            .map(|row| self.schema.decode_row(row))
            .collect()
    }

    /// Whole-page read-modify-write of the slot addressed by `row_id`.
    /// The page file is created on demand; intervening slots are padded
    /// with empty rows.
    pub fn write_row(&self, row_id: RowId, row: Row) -> Result<()> {
        let page_number = page_number(row_id);
        let mut page = self.read_page(page_number)?;
        page.set_slot(slot_position(row_id), row, self.schema.columns.len());
        fs::write(self.page_path(page_number), page.to_csv())?;
        Ok(())
    }

    /// Clear the slot and return the id to the free list.
    pub fn tombstone(&mut self, row_id: RowId) -> Result<()> {
        self.write_row(row_id, Row::empty(self.schema.columns.len()))?;
        self.metadata.deleted_ids.push(row_id);
        self.flush_metadata()?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
