//! Casework domain model.
//!
//! # Responsibility
//! - Define the two record kinds (persons, attendances) and their inputs.
//! - Expose records field-by-field through `Record` for generic queries.
//!
//! # Invariants
//! - Records are immutable by replacement: updates build a new value that
//!   keeps the original id.
//! - Serialized field names are the external request/response keys.

pub mod attendance;
pub mod person;
pub mod record;
