//! Casework use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls, validation and the query pipeline into
//!   use-case level APIs.
//! - Keep the request boundary decoupled from storage details.
//!
//! # Invariants
//! - Services are generic over `RecordStore` and never name a backend.
//! - Time comes from the injected `Clock` only.

pub mod attendance_service;
pub mod error;
pub mod person_service;
pub mod report_service;

pub use attendance_service::AttendanceService;
pub use error::{ServiceError, ServiceResult};
pub use person_service::PersonService;
pub use report_service::ReportService;
