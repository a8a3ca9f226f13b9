//! Listing query pipeline.
//!
//! # Responsibility
//! - Apply equality, range and text filters, a stable sort and pagination
//!   uniformly to every record listing.
//! - Translate external request parameters into `QueryConfig` values.
//!
//! # Invariants
//! - The pipeline never mutates its input slice.
//! - Filtering is deterministic: the same input and config give the same
//!   output.
//!
//! # See also
//! - `report` consumes `matching` output for aggregation.

pub mod params;
pub mod pipeline;

pub use params::{attendance_period, attendance_query, person_query, RequestParams};
pub use pipeline::{
    matching, run_query, Page, PageMeta, QueryConfig, QueryError, QueryResult, RangeBounds,
    SortDirection, SortSpec, TextSearch,
};
