//! Metrics query pipeline.
//!
//! Every query runs the same fixed stages over the full table:
//!
//! 1. filter rows to the requested date range
//! 2. sort by the requested column (stable, nulls last)
//! 3. count the matching rows as `total`
//! 4. cut out the requested page
//! 5. redact fields the caller may not see
//!
//! Redaction runs after pagination and after counting, so it never affects
//! `total` and its cost scales with the page size.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::date::parse_calendar_date;
use super::table::{COST_COLUMN, MetricsRow, MetricsTable};
use super::value::CellValue;
use crate::users::Capabilities;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Caller-supplied query parameters, as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Error returned for a query that cannot be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// `sort_by` names a column the table does not have.
    UnknownColumn(String),
    /// A date bound could not be parsed.
    InvalidDate {
        parameter: &'static str,
        value: String,
    },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownColumn(column) => write!(f, "Invalid sort_by column: {column}"),
            Self::InvalidDate { parameter, value } => {
                write!(f, "Invalid {parameter}: '{value}' is not a valid date")
            }
        }
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `asc` in any case (or no value) is ascending; anything else descends.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => Self::Ascending,
            Some(value) if value.trim().eq_ignore_ascii_case("asc") => Self::Ascending,
            Some(_) => Self::Descending,
        }
    }
}

/// A page request with both values clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number, at least 1.
    pub page: u64,
    /// Rows per page, between 1 and [`MAX_PAGE_SIZE`].
    pub page_size: u64,
}

impl Pagination {
    #[must_use]
    pub fn clamped(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Self {
            page: page.unsigned_abs(),
            page_size: page_size.unsigned_abs(),
        }
    }

    /// Index of the first row on this page. Saturates instead of overflowing.
    #[must_use]
    pub fn offset(&self) -> usize {
        let offset = self.page.saturating_sub(1).saturating_mul(self.page_size);
        usize::try_from(offset).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }
}

/// One output row: column names paired with values, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(Arc<str>, CellValue)>,
}

impl Record {
    fn from_row(columns: &[Arc<str>], row: &MetricsRow) -> Self {
        Self {
            fields: columns
                .iter()
                .zip(row.cells())
                .map(|(name, value)| (Arc::clone(name), value.clone()))
                .collect(),
        }
    }

    /// Drop `column` from the record if present.
    fn redact(&mut self, column: &str) {
        self.fields.retain(|(name, _)| &**name != column);
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| &**name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| &**name)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(&**name, value)?;
        }
        map.end()
    }
}

/// One page of query output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    #[serde(rename = "data")]
    pub rows: Vec<Record>,
    pub page: u64,
    pub page_size: u64,
    /// Rows matching the filters, before pagination and redaction.
    pub total: usize,
}

/// Runs queries against a shared, immutable metrics table.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    table: Arc<MetricsTable>,
}

impl MetricsEngine {
    #[must_use]
    pub const fn new(table: Arc<MetricsTable>) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &MetricsTable {
        &self.table
    }

    /// Run the query pipeline for a caller with `capabilities`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if a date bound does not parse or `sort_by`
    /// names an unknown column. Nothing is computed in that case.
    pub fn query(
        &self,
        query: &MetricsQuery,
        capabilities: Capabilities,
    ) -> Result<QueryResult, QueryError> {
        let start = parse_bound("start_date", query.start_date.as_deref())?;
        let end = parse_bound("end_date", query.end_date.as_deref())?;
        let sort = self.resolve_sort(query)?;
        let pagination = Pagination::clamped(query.page, query.page_size);

        let table = &*self.table;

        // 1. Filter
        let mut matching: Vec<&MetricsRow> = table
            .rows()
            .iter()
            .filter(|row| within_range(table.row_date(row), start, end))
            .collect();

        // 2. Sort
        if let Some((column, direction)) = sort {
            matching.sort_by(|a, b| compare_cells(a.cell(column), b.cell(column), direction));
        }

        // 3. Total
        let total = matching.len();

        // 4. Paginate
        let mut rows: Vec<Record> = matching
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit())
            .map(|row| Record::from_row(table.column_names(), row))
            .collect();

        // 5. Redact
        if !capabilities.view_cost {
            for row in &mut rows {
                row.redact(COST_COLUMN);
            }
        }

        tracing::debug!(
            total,
            returned = rows.len(),
            page = pagination.page,
            page_size = pagination.page_size,
            "metrics query"
        );

        Ok(QueryResult {
            rows,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
        })
    }

    fn resolve_sort(
        &self,
        query: &MetricsQuery,
    ) -> Result<Option<(usize, SortDirection)>, QueryError> {
        let Some(sort_by) = query.sort_by.as_deref().filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        let column = self
            .table
            .column_index(sort_by)
            .ok_or_else(|| QueryError::UnknownColumn(sort_by.to_string()))?;
        Ok(Some((column, SortDirection::parse(query.sort_dir.as_deref()))))
    }
}

/// Parse an optional date bound. Empty strings count as absent.
fn parse_bound(
    parameter: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, QueryError> {
    match value.filter(|value| !value.trim().is_empty()) {
        None => Ok(None),
        Some(value) => parse_calendar_date(value)
            .map(Some)
            .ok_or_else(|| QueryError::InvalidDate {
                parameter,
                value: value.to_string(),
            }),
    }
}

/// Inclusive range check. A row without a date never matches a bound.
fn within_range(date: Option<NaiveDate>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(date) = date else {
        return false;
    };
    start.is_none_or(|start| date >= start) && end.is_none_or(|end| date <= end)
}

/// Order two cells for sorting. Nulls go last whatever the direction.
fn compare_cells(a: &CellValue, b: &CellValue, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.total_cmp(b);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    }
}
