//! Field-level view of records for generic filtering and sorting.
//!
//! # Responsibility
//! - Let the query pipeline and stores address record fields by their
//!   external names without knowing the concrete record type.
//!
//! # Invariants
//! - Dates compare through their ISO `YYYY-MM-DD` rendering, which is
//!   fixed-width and zero-padded, so lexicographic order equals date order.
//! - Values of different variants never compare equal and never order.

use chrono::NaiveDate;
use std::cmp::Ordering;

/// Typed value of one record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    /// Multi-valued field (for example service tags).
    List(Vec<String>),
}

/// How equality filters compare a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatch {
    /// Case-sensitive comparison (codes, ids, enumerations).
    Exact,
    /// Case-insensitive comparison (names and other free text).
    CaseInsensitive,
}

impl FieldValue {
    /// Whether this value equals the externally supplied `expected` text.
    ///
    /// `List` values match when any element matches.
    pub fn equals(&self, expected: &str, mode: FieldMatch) -> bool {
        match self {
            Self::Text(value) => text_equals(value, expected, mode),
            Self::Integer(value) => expected.trim().parse::<i64>() == Ok(*value),
            Self::Date(value) => iso_date(*value) == expected,
            Self::List(values) => values
                .iter()
                .any(|value| text_equals(value, expected, mode)),
        }
    }

    /// Case-insensitive substring test. `needle` must already be lowercase.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        match self {
            Self::Text(value) => value.to_lowercase().contains(needle),
            Self::Integer(value) => value.to_string().contains(needle),
            Self::Date(value) => iso_date(*value).contains(needle),
            Self::List(values) => values
                .iter()
                .any(|value| value.to_lowercase().contains(needle)),
        }
    }

    /// Orders this value against a textual range bound.
    ///
    /// Returns `None` when the bound cannot be compared with this value.
    pub fn compare_bound(&self, bound: &str) -> Option<Ordering> {
        match self {
            Self::Text(value) => Some(value.as_str().cmp(bound)),
            Self::Date(value) => Some(iso_date(*value).as_str().cmp(bound)),
            Self::Integer(value) => bound.trim().parse::<i64>().ok().map(|b| value.cmp(&b)),
            Self::List(_) => None,
        }
    }

    /// Natural ordering between two values of the same variant.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// A flat record addressable by external field names.
pub trait Record: Clone {
    /// Stable record id.
    fn record_id(&self) -> &str;

    /// Value of `name`, or `None` when the field is unknown or unset.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Comparison mode of `name` for equality filters.
    fn field_match(_name: &str) -> FieldMatch {
        FieldMatch::Exact
    }
}

/// ISO `YYYY-MM-DD` rendering.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn text(value: impl Into<String>) -> Option<FieldValue> {
    Some(FieldValue::Text(value.into()))
}

pub(crate) fn optional_text(value: Option<&String>) -> Option<FieldValue> {
    value.map(|value| FieldValue::Text(value.clone()))
}

fn text_equals(value: &str, expected: &str, mode: FieldMatch) -> bool {
    match mode {
        FieldMatch::Exact => value == expected,
        FieldMatch::CaseInsensitive => value.to_lowercase() == expected.to_lowercase(),
    }
}
