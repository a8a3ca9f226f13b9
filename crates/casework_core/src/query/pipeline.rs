//! Filter, sort and paginate over `Record` slices.
//!
//! # Invariants
//! - Sorting is stable; records missing the sort field go last in both
//!   directions.
//! - Unknown field names never match a filter. They are not errors.
//! - `total_pages == ceil(total_matched / page_size)`; a page past the end
//!   is empty.

use crate::model::record::{FieldValue, Record};
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

pub type QueryResult<T> = Result<T, QueryError>;

/// Rejected query configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidConfiguration(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration(message) => {
                write!(f, "invalid query configuration: {message}")
            }
        }
    }
}

impl Error for QueryError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

/// Inclusive bounds; `None` leaves that side open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeBounds {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl RangeBounds {
    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn admits(&self, value: &FieldValue) -> bool {
        let above_min = self.min.as_deref().map_or(true, |min| {
            matches!(
                value.compare_bound(min),
                Some(Ordering::Greater | Ordering::Equal)
            )
        });
        let below_max = self.max.as_deref().map_or(true, |max| {
            matches!(
                value.compare_bound(max),
                Some(Ordering::Less | Ordering::Equal)
            )
        });
        above_min && below_max
    }
}

/// Case-insensitive substring search over several fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    pub needle: String,
    pub fields: Vec<String>,
}

/// Everything one listing request asks of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub equality_filters: BTreeMap<String, String>,
    pub range_filters: BTreeMap<String, RangeBounds>,
    pub text_search: Vec<TextSearch>,
    pub sort: Option<SortSpec>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    /// Requested page sizes above this are clamped.
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            equality_filters: BTreeMap::new(),
            range_filters: BTreeMap::new(),
            text_search: Vec::new(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equality_filters.insert(field.into(), value.into());
        self
    }

    pub fn filter_range(
        mut self,
        field: impl Into<String>,
        min: Option<String>,
        max: Option<String>,
    ) -> Self {
        self.range_filters
            .insert(field.into(), RangeBounds { min, max });
        self
    }

    pub fn search<I, S>(mut self, needle: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_search.push(TextSearch {
            needle: needle.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec {
            key: key.into(),
            direction,
        });
        self
    }

    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Page size actually used for slicing.
    pub fn applied_page_size(&self) -> u32 {
        self.page_size.min(self.max_page_size)
    }

    fn validate(&self) -> QueryResult<()> {
        if self.page == 0 {
            return Err(QueryError::InvalidConfiguration(
                "page must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(QueryError::InvalidConfiguration(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(QueryError::InvalidConfiguration(
                "max page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pagination metadata, serialized with the listing envelope keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    #[serde(rename = "limit")]
    pub page_size: u32,
    #[serde(rename = "total")]
    pub total_matched: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// Every record that passes the filters, in sorted order, unpaginated.
pub fn matching<T: Record>(records: &[T], config: &QueryConfig) -> Vec<T> {
    let searches: Vec<(String, &[String])> = config
        .text_search
        .iter()
        .map(|search| (search.needle.trim().to_lowercase(), search.fields.as_slice()))
        .filter(|(needle, _)| !needle.is_empty())
        .collect();

    let filtered: Vec<&T> = records
        .iter()
        .filter(|record| passes_equality(*record, &config.equality_filters))
        .filter(|record| passes_ranges(*record, &config.range_filters))
        .filter(|record| {
            searches
                .iter()
                .all(|(needle, fields)| passes_search(*record, needle, fields))
        })
        .collect();

    match &config.sort {
        Some(sort) => sorted(filtered, sort),
        None => filtered.into_iter().cloned().collect(),
    }
}

/// Filters, sorts and slices one page.
///
/// # Errors
/// - `InvalidConfiguration` when `page` or `page_size` is zero.
pub fn run_query<T: Record>(records: &[T], config: &QueryConfig) -> QueryResult<Page<T>> {
    config.validate()?;
    let page_size = config.applied_page_size();
    let matched = matching(records, config);
    let total_matched = matched.len();
    let size = page_size as usize;
    let total_pages = total_matched.div_ceil(size);
    let start = (config.page as usize - 1).saturating_mul(size);

    let items: Vec<T> = matched.into_iter().skip(start).take(size).collect();
    debug!(
        "event=query_run module=query status=ok input={} matched={} page={} page_size={} returned={}",
        records.len(),
        total_matched,
        config.page,
        page_size,
        items.len()
    );

    Ok(Page {
        items,
        meta: PageMeta {
            page: config.page,
            page_size,
            total_matched,
            total_pages,
        },
    })
}

fn passes_equality<T: Record>(record: &T, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(field, expected)| {
        record
            .field(field)
            .is_some_and(|value| value.equals(expected, T::field_match(field)))
    })
}

fn passes_ranges<T: Record>(record: &T, filters: &BTreeMap<String, RangeBounds>) -> bool {
    filters.iter().all(|(field, bounds)| {
        bounds.is_open() || record.field(field).is_some_and(|value| bounds.admits(&value))
    })
}

fn passes_search<T: Record>(record: &T, needle: &str, fields: &[String]) -> bool {
    fields.iter().any(|field| {
        record
            .field(field)
            .is_some_and(|value| value.contains_lowercase(needle))
    })
}

fn sorted<T: Record>(records: Vec<&T>, sort: &SortSpec) -> Vec<T> {
    let mut keyed: Vec<(Option<FieldValue>, &T)> = records
        .into_iter()
        .map(|record| (record.field(&sort.key), record))
        .collect();

    // `sort_by` is stable, so ties keep their filtered order.
    keyed.sort_by(|(left, _), (right, _)| match (left, right) {
        (Some(left), Some(right)) => match sort.direction {
            SortDirection::Ascending => left.sort_cmp(right),
            SortDirection::Descending => right.sort_cmp(left),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, record)| record.clone()).collect()
}
