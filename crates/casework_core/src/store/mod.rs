//! Record store contracts and implementations.
//!
//! # Responsibility
//! - Define the `get/list/put/delete` contract services depend on.
//! - Keep backend details (lock, SQL) out of the query pipeline and services.
//!
//! # Invariants
//! - `list` returns records in insertion order.
//! - `put` on an existing id replaces that record in place (last write wins).
//! - `delete` of a missing id is `StoreError::NotFound`.
//!
//! # See also
//! - `memory::MemoryStore` (default backend), `sqlite::SqliteStore`.

use crate::config::StoreBackend;
use crate::db::DbError;
use crate::model::attendance::AttendanceRecord;
use crate::model::person::Person;
use crate::model::record::Record;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Backend-erased person store shared between services.
pub type SharedPersonStore = Arc<dyn RecordStore<Person> + Send + Sync>;
/// Backend-erased attendance store shared between services.
pub type SharedAttendanceStore = Arc<dyn RecordStore<AttendanceRecord> + Send + Sync>;

/// Store-level failures.
#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    /// Backend refused the write because of a uniqueness constraint.
    Constraint(String),
    /// Backend is unusable (poisoned lock, uninitialized connection).
    Unavailable(String),
    Db(DbError),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Constraint(message) => write!(f, "constraint violated: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored record: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &value {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                return Self::Constraint(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whether `put` created or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
}

/// Ordered collection of records of one kind.
pub trait RecordStore<T: Record> {
    /// Record with `id`, if present.
    fn get(&self, id: &str) -> StoreResult<Option<T>>;
    /// Every record in insertion order.
    fn list(&self) -> StoreResult<Vec<T>>;
    /// Appends a new record or replaces the one with the same id.
    fn put(&self, record: &T) -> StoreResult<PutOutcome>;
    /// Removes and returns the record with `id`.
    fn delete(&self, id: &str) -> StoreResult<T>;
}

impl<T: Record, S: RecordStore<T> + ?Sized> RecordStore<T> for Arc<S> {
    fn get(&self, id: &str) -> StoreResult<Option<T>> {
        (**self).get(id)
    }

    fn list(&self) -> StoreResult<Vec<T>> {
        (**self).list()
    }

    fn put(&self, record: &T) -> StoreResult<PutOutcome> {
        (**self).put(record)
    }

    fn delete(&self, id: &str) -> StoreResult<T> {
        (**self).delete(id)
    }
}

impl<T: Record, S: RecordStore<T> + ?Sized> RecordStore<T> for &S {
    fn get(&self, id: &str) -> StoreResult<Option<T>> {
        (**self).get(id)
    }

    fn list(&self) -> StoreResult<Vec<T>> {
        (**self).list()
    }

    fn put(&self, record: &T) -> StoreResult<PutOutcome> {
        (**self).put(record)
    }

    fn delete(&self, id: &str) -> StoreResult<T> {
        (**self).delete(id)
    }
}

/// Opens the person and attendance stores for `backend`.
///
/// The SQLite backend serves both record kinds from one connection.
pub fn open_stores(
    backend: &StoreBackend,
) -> StoreResult<(SharedPersonStore, SharedAttendanceStore)> {
    match backend {
        StoreBackend::Memory => {
            let persons: SharedPersonStore = Arc::new(MemoryStore::<Person>::new());
            let attendances: SharedAttendanceStore =
                Arc::new(MemoryStore::<AttendanceRecord>::new());
            Ok((persons, attendances))
        }
        StoreBackend::Sqlite { path } => {
            let store = Arc::new(match path {
                Some(path) => SqliteStore::open(path)?,
                None => SqliteStore::open_in_memory()?,
            });
            let persons: SharedPersonStore = store.clone();
            let attendances: SharedAttendanceStore = store;
            Ok((persons, attendances))
        }
    }
}
