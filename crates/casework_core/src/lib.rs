//! Core domain logic for the casework dashboard.
//! This crate is the single source of truth for registry and attendance
//! invariants.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod report;
pub mod seed;
pub mod service;
pub mod store;

pub use api::{
    ApiError, ApiResult, CaseworkApi, DataEnvelope, ErrorEnvelope, ListEnvelope,
    MemoryCaseworkApi,
};
pub use auth::{AccessDenied, Authenticator, Claims, Session, SessionUser, SignedTokenCodec};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig, StoreBackend};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attendance::{
    AttendanceKind, AttendanceMode, AttendancePatch, AttendanceRecord, NewAttendance, Outcome,
    ServiceTag,
};
pub use model::person::{NewPerson, Person, PersonPatch, Sex};
pub use query::{Page, PageMeta, QueryConfig, RequestParams};
pub use report::{Report, ReportKind};
pub use seed::seed_demo;
pub use store::{open_stores, MemoryStore, RecordStore, SqliteStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
