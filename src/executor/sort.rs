use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::error::{DatabaseError, Result};
use crate::types::row::Row;
use crate::types::value::{DataType, Value};

/// Sort direction for `order_by` and run merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(text: &str) -> Result<Self> {
        match text.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(DatabaseError::InvalidData {
                details: format!("sort direction must be ASC or DESC, got '{other}'"),
            }),
        }
    }
}

/// Write one sorted run: a header row naming the columns, then records.
pub fn write_run(path: &Path, header: &[String], records: &[Vec<String>]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", Row::encode_csv(header))?;
    for record in records {
        writeln!(writer, "{}", Row::encode_csv(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a run back as `(header, records)`.
pub fn read_run(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines();
    let header = match lines.next() {
        Some(line) => Row::decode_csv(line),
        None => Vec::new(),
    };
    let records = lines.map(Row::decode_csv).collect();
    Ok((header, records))
}

/// Sort records by one typed key column, decoding the key once per
/// record. A descending request reverses the ascending order.
pub fn sort_records(
    records: Vec<Vec<String>>,
    key_index: usize,
    key_type: DataType,
    direction: SortDirection,
) -> Result<Vec<Vec<String>>> {
    let mut keyed = records
        .into_iter()
        .map(|record| {
            let text = record.get(key_index).map(String::as_str).unwrap_or("");
            Ok((key_type.parse(text)?, record))
        })
        .collect::<Result<Vec<(Value, Vec<String>)>>>()?;
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    if direction == SortDirection::Desc {
        keyed.reverse();
    }
    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

/// Pairwise external merge of pre-sorted run files. Adjacent runs merge
/// two at a time, an odd run carries over unmerged, so N runs settle in
/// ceil(log2 N) passes; the last remaining file is the output. The
/// ordering column is re-parsed to its declared type for every
/// comparison, keeping numeric keys in numeric order rather than
/// lexicographic.
pub struct RunMerger<'a> {
    dir: &'a Path,
    key: String,
    key_type: DataType,
    direction: SortDirection,
}

impl<'a> RunMerger<'a> {
    pub fn new(dir: &'a Path, key: impl Into<String>, key_type: DataType, direction: SortDirection) -> Self {
        Self {
            dir,
            key: key.into(),
            key_type,
            direction,
        }
    }

    /// Merge all runs into one file and return its path. A single run is
    /// already the answer; no runs yield an empty output file.
    pub fn merge(&self, runs: Vec<PathBuf>) -> Result<PathBuf> {
        if runs.is_empty() {
            let path = self.dir.join("merge_empty.csv");
            fs::write(&path, "")?;
            return Ok(path);
        }
        let mut current = runs;
        let mut pass = 0usize;
        while current.len() > 1 {
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for (i, pair) in current.chunks(2).enumerate() {
                match pair {
                    [left, right] => {
                        let out = self.dir.join(format!("merge_{pass}_{i}.csv"));
                        self.merge_pair(left, right, &out)?;
                        next.push(out);
                    }
                    [odd] => next.push(odd.clone()),
                    _ => {}
                }
            }
            debug!(pass, remaining = next.len(), "merge pass complete");
            current = next;
            pass += 1;
        }
        Ok(current.remove(0))
    }

    /// Streaming two-pointer merge of one run pair.
    fn merge_pair(&self, left: &Path, right: &Path, out: &Path) -> Result<()> {
        let mut left = RunReader::open(left, &self.key)?;
        let mut right = RunReader::open(right, &self.key)?;
        let file = File::create(out)?;
        let mut writer = BufWriter::new(file);
        let header = if left.header.is_empty() {
            &right.header
        } else {
            &left.header
        };
        writeln!(writer, "{}", Row::encode_csv(header))?;
        loop {
            let take_left = match (&left.pending, &right.pending) {
                (Some(a), Some(b)) => {
                    let key_a = self.key_type.parse(left.key_text(a))?;
                    let key_b = self.key_type.parse(right.key_text(b))?;
                    self.takes_precedence(&key_a, &key_b)
                }
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let record = if take_left {
                left.next_record()?
            } else {
                right.next_record()?
            };
            if let Some(fields) = record {
                writeln!(writer, "{}", Row::encode_csv(&fields))?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Whether `a` is written before `b` for the configured direction.
    fn takes_precedence(&self, a: &Value, b: &Value) -> bool {
        let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
        match self.direction {
            SortDirection::Asc => ordering != Ordering::Greater,
            SortDirection::Desc => ordering != Ordering::Less,
        }
    }
}

/// One open run with a single-record lookahead.
struct RunReader {
    lines: Lines<BufReader<File>>,
    header: Vec<String>,
    key_index: usize,
    pending: Option<Vec<String>>,
}

impl RunReader {
    fn open(path: &Path, key: &str) -> Result<Self> {
        let mut lines = BufReader::new(File::open(path)?).lines();
        let header = match lines.next() {
            Some(line) => Row::decode_csv(&line?),
            None => Vec::new(),
        };
        let key_index = if header.is_empty() {
            0
        } else {
            header
                .iter()
                .position(|column| column.as_str() == key)
                .ok_or_else(|| DatabaseError::InvalidData {
                    details: format!("run file is missing ordering column '{key}'"),
                })?
        };
        let mut reader = Self {
            lines,
            header,
            key_index,
            pending: None,
        };
        reader.refill()?;
        Ok(reader)
    }

    fn key_text<'r>(&self, record: &'r [String]) -> &'r str {
        record.get(self.key_index).map(String::as_str).unwrap_or("")
    }

    /// Hand out the lookahead record and pull in the next one.
    fn next_record(&mut self) -> Result<Option<Vec<String>>> {
        let record = self.pending.take();
        self.refill()?;
        Ok(record)
    }

    fn refill(&mut self) -> Result<()> {
        self.pending = match self.lines.next() {
            Some(line) => Some(Row::decode_csv(&line?)),
            None => None,
        };
        Ok(())
    }
}
