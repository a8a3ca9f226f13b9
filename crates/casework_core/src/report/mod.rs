//! Dashboard report aggregation.
//!
//! # Responsibility
//! - Group records into keyed counts and compute means.
//! - Build the five dashboard reports (`geral`, `mensal`, `servicos`,
//!   `tecnicos`, `demografico`) from person and attendance snapshots.
//!
//! # Invariants
//! - `BucketCounts::total` counts records, not bucket hits.
//! - The mean of an empty input is `None`, never `NaN`.

pub mod aggregator;
pub mod reports;

pub use aggregator::{age_bracket, count_by, count_where, mean, BucketCounts};
pub use reports::{
    build_report, DemographicReport, GeneralReport, KindCounts, ModeCounts, MonthlyReport,
    Report, ReportKind, ServicesReport, SexCounts, TechniciansReport,
};
