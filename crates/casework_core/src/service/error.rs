//! Use-case error shared by the casework services.

use crate::model::attendance::AttendanceValidationError;
use crate::model::person::PersonValidationError;
use crate::query::QueryError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Listing or report parameters were rejected.
    InvalidConfiguration(String),
    /// Input failed field-level validation.
    Validation(String),
    NotFound {
        kind: &'static str,
        id: String,
    },
    /// The write would break a uniqueness invariant.
    Conflict(String),
    Store(StoreError),
}

impl ServiceError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration(message) => write!(f, "{message}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Constraint(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

impl From<QueryError> for ServiceError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::InvalidConfiguration(message) => Self::InvalidConfiguration(message),
        }
    }
}

impl From<PersonValidationError> for ServiceError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<AttendanceValidationError> for ServiceError {
    fn from(value: AttendanceValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}
