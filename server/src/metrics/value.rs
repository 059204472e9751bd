//! Cell values of the metrics table.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::date::parse_calendar_date;

/// A single cell of the metrics table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing value.
    Null,
    Integer(i64),
    /// Always finite; non-finite input is stored as `Null`.
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl CellValue {
    /// Infer the type of a raw CSV field.
    ///
    /// Empty fields become `Null`, then integers, then finite floats; anything
    /// else is kept as text.
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Integer(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Self::float(value);
        }
        Self::Text(raw.to_string())
    }

    /// Parse a raw date field. Empty fields become `Null`.
    ///
    /// Returns `None` if the field is non-empty but not a date.
    #[must_use]
    pub fn parse_date(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return Some(Self::Null);
        }
        parse_calendar_date(raw).map(Self::Date)
    }

    #[must_use]
    pub const fn float(value: f64) -> Self {
        if value.is_finite() {
            Self::Float(value)
        } else {
            Self::Null
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Rank used to order values of different types: numbers, then dates,
    /// then text, then nulls.
    const fn type_rank(&self) -> u8 {
        match self {
            Self::Integer(_) | Self::Float(_) => 0,
            Self::Date(_) => 1,
            Self::Text(_) => 2,
            Self::Null => 3,
        }
    }

    /// Total order over values, with integers and floats compared numerically.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Mixed int/float comparison is approximate by nature.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Date(_) => serializer.collect_str(self),
            Self::Text(value) => serializer.serialize_str(value),
        }
    }
}
