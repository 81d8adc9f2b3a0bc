use crate::types::ROWS_PER_PAGE;
use crate::types::row::Row;

/*
 * Page Layout on Disk (`<table>_<page_number>.csv`)
 *
 *   slot 0:  value,value,...,value
 *   slot 1:  ,,            <- tombstone: every field empty
 *   ...
 *   slot 63: value,value,...,value
 *
 * One line per slot, at most 64 slots. The page, not the slot, is the
 * unit of I/O: every mutation rewrites the whole file.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
}

impl Page {
    pub fn from_csv(text: &str) -> Self {
        Self {
            rows: text.lines().map(Row::from_csv_line).collect(),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&row.to_csv_line());
            out.push('\n');
        }
        out
    }

    /// Overwrite `slot`, padding the gap with empty rows when the page
    /// is shorter than the target position.
    pub fn set_slot(&mut self, slot: usize, row: Row, width: usize) {
        debug_assert!(slot < ROWS_PER_PAGE);
        while self.rows.len() <= slot {
            self.rows.push(Row::empty(width));
        }
        self.rows[slot] = row;
    }

    /// Non-tombstone rows in slot order.
    pub fn live_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| !row.is_tombstone())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
