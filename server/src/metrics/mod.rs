//! Metrics dataset and query engine.
//!
//! The table is loaded once at startup and never mutated. Queries scan it in
//! full; there are no indexes.

mod date;
mod query;
mod table;
mod value;

pub use date::parse_calendar_date;
pub use query::{
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MetricsEngine, MetricsQuery, Pagination,
    QueryError, QueryResult, Record, SortDirection,
};
pub use table::{COST_COLUMN, DATE_COLUMN, MetricsRow, MetricsTable, TableError};
pub use value::CellValue;
