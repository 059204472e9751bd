//! The in-memory metrics table.
//!
//! # Invariants
//!
//! - Column names are unique and include [`DATE_COLUMN`].
//! - Every row has exactly one cell per column.
//! - Cells of the date column are `CellValue::Date` or `CellValue::Null`.
//! - The table is immutable once built.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use super::value::CellValue;

/// Column holding each row's calendar date.
pub const DATE_COLUMN: &str = "date";
/// Column holding the cost measure, visible only to roles that may view cost.
pub const COST_COLUMN: &str = "cost_micros";

static NULL_CELL: CellValue = CellValue::Null;

/// Error returned when building or loading a table fails.
#[derive(Debug)]
pub enum TableError {
    /// The file could not be read or is not valid CSV.
    Csv { path: PathBuf, message: String },
    /// No column is named `date`.
    MissingDateColumn,
    /// A column name appears twice.
    DuplicateColumn(String),
    /// A row has the wrong number of cells.
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A date cell could not be parsed.
    InvalidDate { row: usize, value: String },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv { path, message } => {
                write!(f, "invalid metrics table {}: {message}", path.display())
            }
            Self::MissingDateColumn => write!(f, "metrics table has no '{DATE_COLUMN}' column"),
            Self::DuplicateColumn(name) => write!(f, "duplicate metrics column: {name}"),
            Self::RowWidth {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} cells, expected {expected}"),
            Self::InvalidDate { row, value } => {
                write!(f, "row {row} has an invalid date: '{value}'")
            }
        }
    }
}

impl std::error::Error for TableError {}

/// One row of the metrics table. Cells are in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    cells: Vec<CellValue>,
}

impl MetricsRow {
    #[must_use]
    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    #[must_use]
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }
}

/// Immutable metrics dataset.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    columns: Vec<Arc<str>>,
    date_column: usize,
    rows: Vec<MetricsRow>,
}

impl MetricsTable {
    /// Build a table from column names and rows of cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns are invalid, a row has the wrong width,
    /// or a date cell holds something other than a date or null.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumn(column.clone()));
            }
        }
        let date_column = columns
            .iter()
            .position(|column| column == DATE_COLUMN)
            .ok_or(TableError::MissingDateColumn)?;

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, cells)| {
                if cells.len() != columns.len() {
                    return Err(TableError::RowWidth {
                        row: index + 1,
                        expected: columns.len(),
                        found: cells.len(),
                    });
                }
                match cells.get(date_column) {
                    Some(CellValue::Date(_) | CellValue::Null) => Ok(MetricsRow { cells }),
                    other => Err(TableError::InvalidDate {
                        row: index + 1,
                        value: other.map(ToString::to_string).unwrap_or_default(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns: columns.into_iter().map(Arc::from).collect(),
            date_column,
            rows,
        })
    }

    /// Load a table from a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the table is invalid.
    pub fn load_csv(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let table = Self::from_csv_reader(file, path)?;
        tracing::info!(
            "loaded {} metrics rows with columns [{}] from {}",
            table.len(),
            table.columns().join(", "),
            path.display()
        );
        Ok(table)
    }

    /// Parse a CSV document. `source` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid CSV or the table is invalid.
    pub fn from_csv_reader<R: Read>(reader: R, source: &Path) -> Result<Self, TableError> {
        let csv_error = |e: &csv::Error| TableError::Csv {
            path: source.to_path_buf(),
            message: e.to_string(),
        };

        let mut reader = csv::Reader::from_reader(reader);
        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(&e))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        let date_column = columns
            .iter()
            .position(|column| column == DATE_COLUMN)
            .ok_or(TableError::MissingDateColumn)?;

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| csv_error(&e))?;
            let cells = record
                .iter()
                .enumerate()
                .map(|(column, raw)| {
                    if column == date_column {
                        CellValue::parse_date(raw).ok_or_else(|| TableError::InvalidDate {
                            row: index + 1,
                            value: raw.to_string(),
                        })
                    } else {
                        Ok(CellValue::infer(raw))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }

        Self::new(columns, rows)
    }

    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|column| &**column).collect()
    }

    pub(crate) fn column_names(&self) -> &[Arc<str>] {
        &self.columns
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| &**column == name)
    }

    #[must_use]
    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    /// The calendar date of `row`, if it has one.
    #[must_use]
    pub fn row_date(&self, row: &MetricsRow) -> Option<NaiveDate> {
        row.cell(self.date_column).as_date()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
