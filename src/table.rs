use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Result, ensure_exists};
use crate::extractor::FeatureRecord;
use crate::merger::{IMAGE_COLUMN, SOURCE_COLUMN};

pub const REGION_NAME_COLUMN: &str = "region_name";

/// Identity columns read back verbatim, so names like `007` keep their text.
pub const TEXT_COLUMNS: [&str; 3] = [IMAGE_COLUMN, SOURCE_COLUMN, REGION_NAME_COLUMN];

/// Backend bookkeeping columns that never reach a persisted table.
pub const EXCLUDED_PREFIXES: [&str; 2] = ["diagnostics_", "general_"];

/// A single non-null table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    /// Numbers are recognised, everything else stays text; empty is null.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<f64>() {
            Ok(value) => Scalar::Number(value),
            Err(_) => Scalar::Text(raw.to_string()),
        })
    }

    /// Like [`parse`](Self::parse) but never yields a number.
    pub fn text(raw: &str) -> Option<Self> {
        (!raw.is_empty()).then(|| Scalar::Text(raw.to_string()))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug keeps exponent notation and the shortest round-trip digits.
            Scalar::Number(value) => write!(f, "{value:?}"),
            Scalar::Text(value) => f.write_str(value),
            Scalar::Bool(value) => write!(f, "{value}"),
        }
    }
}

pub type Cell = Option<Scalar>;

/// Rectangular table; missing cells are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell at `row` in column `name`, `None` when absent or null.
    pub fn get(&self, row: usize, name: &str) -> Option<&Scalar> {
        let column = self.column_index(name)?;
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// Append a row given as (column, value) pairs; unknown columns are added.
    pub fn push_row<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (String, Cell)>,
    {
        let mut row = vec![None; self.columns.len()];
        for (name, value) in cells {
            let index = match self.column_index(&name) {
                Some(index) => index,
                None => {
                    self.columns.push(name);
                    for existing in &mut self.rows {
                        existing.push(None);
                    }
                    row.push(None);
                    self.columns.len() - 1
                }
            };
            row[index] = value;
        }
        self.rows.push(row);
    }

    /// Rows as (column, value) pairs, nulls included.
    pub fn iter_rows(&self) -> impl Iterator<Item = impl Iterator<Item = (&str, &Cell)>> {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
        })
    }

    /// Read a table written by [`write_csv`](Self::write_csv).
    ///
    /// Cells in [`TEXT_COLUMNS`] stay text; other cells are numbers when
    /// they parse as one.
    pub fn read_csv(path: &Path) -> Result<Self> {
        ensure_exists(path)?;
        let mut reader = csv::Reader::from_path(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let parsers: Vec<fn(&str) -> Cell> = columns
            .iter()
            .map(|column| {
                if TEXT_COLUMNS.contains(&column.as_str()) {
                    Scalar::text as fn(&str) -> Cell
                } else {
                    Scalar::parse
                }
            })
            .collect();
        let mut table = Self::new(columns);
        for record in reader.records() {
            let record = record?;
            table.rows.push(
                record
                    .iter()
                    .zip(&parsers)
                    .map(|(raw, parse)| parse(raw))
                    .collect(),
            );
        }
        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(
                row.iter()
                    .map(|cell| cell.as_ref().map(Scalar::to_string).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Shapes feature records into a table and persists it.
#[derive(Clone, Debug)]
pub struct TableAssembler {
    excluded_prefixes: Vec<String>,
}

impl Default for TableAssembler {
    fn default() -> Self {
        Self::new(EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect())
    }
}

impl TableAssembler {
    pub fn new(excluded_prefixes: Vec<String>) -> Self {
        Self { excluded_prefixes }
    }

    fn is_excluded(&self, column: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| column.starts_with(prefix.as_str()))
    }

    /// One row per record; columns are `region_name` followed by the union
    /// of feature names in first-seen order.
    pub fn assemble(&self, records: &[FeatureRecord]) -> FeatureTable {
        let mut table = FeatureTable::new(vec![REGION_NAME_COLUMN.to_string()]);
        for record in records {
            let features = record
                .features
                .iter()
                .filter(|(name, _)| !self.is_excluded(name))
                .map(|(name, value)| (name.clone(), Some(Scalar::Number(*value))));
            table.push_row(
                std::iter::once((
                    REGION_NAME_COLUMN.to_string(),
                    Some(Scalar::Text(record.region_name.clone())),
                ))
                .chain(features),
            );
        }
        table
    }

    /// Write `table` to `path`; an empty table is not written.
    ///
    /// Returns whether a file was produced.
    pub fn persist(&self, table: &FeatureTable, path: &Path) -> Result<bool> {
        if table.is_empty() {
            warn!(path = %path.display(), "No features were extracted, nothing written");
            return Ok(false);
        }
        table.write_csv(path)?;
        info!(rows = table.len(), path = %path.display(), "Radiomics table saved");
        Ok(true)
    }
}
