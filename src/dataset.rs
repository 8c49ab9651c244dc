//! Contract dataset - loads the contracts CSV into typed rows.
//!
//! The known columns are resolved to positions once per load, so the filter
//! pipeline reads fields by accessor instead of by column name. Columns the
//! service does not interpret are carried through untouched and serialized in
//! file order.

use crate::error::LoadError;
use csv::ReaderBuilder;
use itertools::Itertools;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub const ENTITY_STATE: &str = "Entity State";
pub const NAICS_DESCRIPTION: &str = "NAICS Description";
pub const CONTRACTING_AGENCY: &str = "Contracting Agency";
pub const ACTION_OBLIGATION: &str = "Action Obligation ($)";
pub const TAGS: &str = "Tags";
pub const CONTRACT_ID: &str = "Contract ID";
pub const BUSINESS_NAME: &str = "Legal Business Name";

/// Positions of the columns the service reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    state: usize,
    description: usize,
    agency: usize,
    obligation: usize,
    tags: usize,
    contract_id: Option<usize>,
    business_name: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Result<Self, LoadError> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            state: required(ENTITY_STATE)?,
            description: required(NAICS_DESCRIPTION)?,
            agency: required(CONTRACTING_AGENCY)?,
            obligation: required(ACTION_OBLIGATION)?,
            tags: required(TAGS)?,
            contract_id: position(CONTRACT_ID),
            business_name: position(BUSINESS_NAME),
        })
    }
}

/// JSON representation chosen for a column after looking at every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    fn of_cell(cell: &str) -> Option<ColumnKind> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.parse::<i64>().is_ok() {
            return Some(ColumnKind::Integer);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Some(ColumnKind::Float),
            _ => Some(ColumnKind::Text),
        }
    }

    fn widen(current: Option<ColumnKind>, next: Option<ColumnKind>) -> Option<ColumnKind> {
        use ColumnKind::*;
        match (current, next) {
            (None, k) | (k, None) => k,
            (Some(Text), _) | (_, Some(Text)) => Some(Text),
            (Some(Float), _) | (_, Some(Float)) => Some(Float),
            (Some(Integer), Some(Integer)) => Some(Integer),
        }
    }
}

/// One CSV record, cells in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRow {
    cells: Vec<String>,
}

impl ContractRow {
    fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// The whole dataset as loaded from one CSV file.
#[derive(Debug, Clone)]
pub struct ContractTable {
    headers: Vec<String>,
    kinds: Vec<ColumnKind>,
    columns: ColumnIndex,
    rows: Vec<ContractRow>,
    rejected: usize,
}

impl ContractTable {
    /// Read and parse the CSV file at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            rejected = table.rejected,
            "loaded contract data"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        if let Some(name) = headers.iter().duplicates().next() {
            return Err(LoadError::DuplicateColumn(name.clone()));
        }
        let columns = ColumnIndex::resolve(&headers)?;

        let mut rows = Vec::new();
        let mut rejected = 0;
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            if record.len() != headers.len() {
                warn!(
                    record = line + 1,
                    expected = headers.len(),
                    found = record.len(),
                    "rejecting record with wrong field count"
                );
                rejected += 1;
                continue;
            }
            rows.push(ContractRow {
                cells: record.iter().map(str::to_string).collect(),
            });
        }

        let kinds = (0..headers.len())
            .map(|idx| {
                rows.iter()
                    .map(|row| ColumnKind::of_cell(row.cell(idx)))
                    .fold(None, ColumnKind::widen)
                    .unwrap_or(ColumnKind::Text)
            })
            .collect();

        Ok(Self {
            headers,
            kinds,
            columns,
            rows,
            rejected,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn kind(&self, column: &str) -> Option<ColumnKind> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.kinds.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records dropped at load time for having the wrong number of fields.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        self.rows.iter().map(move |row| RowView { table: self, row })
    }

    /// Non-blank values of one column, deduplicated. Sorted when `sorted` is
    /// set, otherwise in first-seen order.
    pub fn distinct<'a, F>(&'a self, project: F, sorted: bool) -> Vec<String>
    where
        F: Fn(RowView<'a>) -> &'a str,
    {
        let values = self
            .rows()
            .map(|row| project(row).trim().to_string())
            .filter(|value| !value.is_empty())
            .unique();

        if sorted {
            values.sorted().collect()
        } else {
            values.collect()
        }
    }
}

/// A row borrowed together with the table it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a ContractTable,
    row: &'a ContractRow,
}

impl<'a> RowView<'a> {
    pub fn state(&self) -> &'a str {
        self.row.cell(self.table.columns.state)
    }

    pub fn description(&self) -> &'a str {
        self.row.cell(self.table.columns.description)
    }

    pub fn agency(&self) -> &'a str {
        self.row.cell(self.table.columns.agency)
    }

    pub fn obligation(&self) -> &'a str {
        self.row.cell(self.table.columns.obligation)
    }

    pub fn tags(&self) -> &'a str {
        self.row.cell(self.table.columns.tags)
    }

    /// `None` when the file has no identifier column.
    pub fn contract_id(&self) -> Option<&'a str> {
        self.table.columns.contract_id.map(|idx| self.row.cell(idx))
    }

    pub fn business_name(&self) -> Option<&'a str> {
        self.table.columns.business_name.map(|idx| self.row.cell(idx))
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.headers.iter().position(|h| h == column)?;
        Some(self.row.cell(idx))
    }
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let table = self.table;
        let mut map = serializer.serialize_map(Some(table.headers.len()))?;
        for (idx, header) in table.headers.iter().enumerate() {
            let cell = self.row.cell(idx);
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                map.serialize_entry(header, "")?;
                continue;
            }
            match table.kinds[idx] {
                ColumnKind::Integer => match trimmed.parse::<i64>() {
                    Ok(i) => map.serialize_entry(header, &i)?,
                    Err(_) => map.serialize_entry(header, cell)?,
                },
                ColumnKind::Float => match trimmed.parse::<f64>() {
                    Ok(f) => map.serialize_entry(header, &f)?,
                    Err(_) => map.serialize_entry(header, cell)?,
                },
                ColumnKind::Text => map.serialize_entry(header, cell)?,
            }
        }
        map.end()
    }
}
