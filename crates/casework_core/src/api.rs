//! Request boundary for presentation-layer handlers.
//!
//! # Responsibility
//! - Verify the session token before every protected operation.
//! - Map service results into response envelopes and HTTP-style errors.
//!
//! # Invariants
//! - No operation returns a raw store or service error; transport failures
//!   and panics become `ApiError::Internal` and are logged, not returned.
//! - Every call emits one `event=api_call` log line with its outcome.

use crate::auth::{AccessDenied, Authenticator, Claims, LoginError, Session, SessionUser};
use crate::auth::{TokenError, TokenVerifier};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::logging::panic_summary;
use crate::model::attendance::{AttendancePatch, AttendanceRecord, NewAttendance};
use crate::model::person::{NewPerson, Person, PersonPatch};
use crate::query::{PageMeta, RequestParams};
use crate::report::Report;
use crate::service::attendance_service::ATTENDANCE_KIND;
use crate::service::{AttendanceService, PersonService, ReportService, ServiceError};
use crate::store::{MemoryStore, RecordStore};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

const MSG_UNAUTHORIZED: &str = "Não autorizado";
const MSG_INTERNAL: &str = "Erro interno do servidor";
const MSG_PERSON_CREATED: &str = "Usuário cadastrado com sucesso";
const MSG_PERSON_UPDATED: &str = "Usuário atualizado com sucesso";
const MSG_PERSON_DELETED: &str = "Usuário removido com sucesso";
const MSG_ATTENDANCE_CREATED: &str = "Atendimento registrado com sucesso";
const MSG_ATTENDANCE_UPDATED: &str = "Atendimento atualizado com sucesso";
const MSG_ATTENDANCE_DELETED: &str = "Atendimento removido com sucesso";
const MSG_MISSING_CREDENTIALS: &str = "Username e password são obrigatórios";
const MSG_INVALID_DATA: &str = "Dados inválidos";
const MSG_NATIONAL_ID_TAKEN: &str = "CPF já cadastrado no sistema";
const MSG_PERSON_NOT_FOUND: &str = "Usuário não encontrado";
const MSG_ATTENDANCE_NOT_FOUND: &str = "Atendimento não encontrado";

pub type ApiResult<T> = Result<T, ApiError>;

/// Boundary failure with an HTTP-style status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unauthorized,
    InvalidConfiguration(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    /// Details are logged; callers only see a generic message.
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::InvalidConfiguration(_) | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal => 500,
        }
    }

    /// Failure envelope: `{ "success": false, "error": ... }`.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            success: false,
            error: self.to_string(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "{MSG_UNAUTHORIZED}"),
            Self::InvalidConfiguration(message)
            | Self::Validation(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => write!(f, "{message}"),
            Self::Internal => write!(f, "{MSG_INTERNAL}"),
        }
    }
}

impl Error for ApiError {}

impl From<AccessDenied> for ApiError {
    fn from(_: AccessDenied) -> Self {
        Self::Unauthorized
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::InvalidConfiguration(message) => Self::InvalidConfiguration(message),
            ServiceError::Validation(detail) => {
                warn!("event=api_reject module=api status=invalid detail={detail}");
                Self::Validation(MSG_INVALID_DATA.to_string())
            }
            ServiceError::NotFound { kind, id } => {
                warn!("event=api_reject module=api status=not_found kind={kind} id={id}");
                let message = match kind {
                    ATTENDANCE_KIND => MSG_ATTENDANCE_NOT_FOUND,
                    _ => MSG_PERSON_NOT_FOUND,
                };
                Self::NotFound(message.to_string())
            }
            ServiceError::Conflict(detail) => {
                warn!("event=api_reject module=api status=conflict detail={detail}");
                Self::Conflict(MSG_NATIONAL_ID_TAKEN.to_string())
            }
            ServiceError::Store(err) => {
                error!("event=store_failure module=api status=error error={err}");
                Self::Internal
            }
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(value: LoginError) -> Self {
        match value {
            LoginError::MissingCredentials => {
                Self::Validation(MSG_MISSING_CREDENTIALS.to_string())
            }
            LoginError::InvalidCredentials => Self::Unauthorized,
            LoginError::Token(err) => {
                error!("event=token_issue module=api status=error error={err}");
                Self::Internal
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEnvelope<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> DataEnvelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    fn with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

/// In-memory boundary used by tests and the CLI.
pub type MemoryCaseworkApi =
    CaseworkApi<Arc<MemoryStore<Person>>, Arc<MemoryStore<AttendanceRecord>>>;

/// Every operation the presentation layer may call.
pub struct CaseworkApi<P, A>
where
    P: RecordStore<Person> + Clone,
    A: RecordStore<AttendanceRecord> + Clone,
{
    persons: PersonService<P>,
    attendances: AttendanceService<A, P>,
    reports: ReportService<P, A>,
    authenticator: Authenticator,
    verifier: Arc<dyn TokenVerifier>,
    clock: Arc<dyn Clock>,
}

impl MemoryCaseworkApi {
    /// Boundary over fresh, empty in-memory stores.
    pub fn in_memory(config: &CoreConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            config,
            clock,
        )
    }
}

impl<P, A> CaseworkApi<P, A>
where
    P: RecordStore<Person> + Clone,
    A: RecordStore<AttendanceRecord> + Clone,
{
    /// Wires services over the given stores.
    ///
    /// Tokens are verified by the authenticator's own codec unless
    /// `with_verifier` replaces it.
    pub fn new(
        persons: P,
        attendances: A,
        config: &CoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        let authenticator =
            Authenticator::new(config.operator.clone(), &config.token, Arc::clone(&clock))?;
        let verifier: Arc<dyn TokenVerifier> = authenticator.codec();
        Ok(Self {
            persons: PersonService::new(persons.clone(), Arc::clone(&clock), config.paging),
            attendances: AttendanceService::new(
                attendances.clone(),
                persons.clone(),
                Arc::clone(&clock),
                config.paging,
            ),
            reports: ReportService::new(persons, attendances),
            authenticator,
            verifier,
            clock,
        })
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn login(&self, username: &str, password: &str) -> ApiResult<DataEnvelope<Session>> {
        self.observed("login", || {
            let session = self.authenticator.login(username, password)?;
            Ok(DataEnvelope::ok(session))
        })
    }

    /// Public profile of the token holder.
    pub fn me(&self, token: Option<&str>) -> ApiResult<DataEnvelope<SessionUser>> {
        self.guarded("me", token, |claims| {
            Ok(DataEnvelope::ok(SessionUser::from(claims)))
        })
    }

    pub fn list_persons(
        &self,
        token: Option<&str>,
        params: &RequestParams,
    ) -> ApiResult<ListEnvelope<Person>> {
        self.guarded("list_persons", token, |_| {
            let page = self.persons.list(params)?;
            Ok(ListEnvelope {
                success: true,
                data: page.items,
                pagination: page.meta,
            })
        })
    }

    pub fn get_person(&self, token: Option<&str>, id: &str) -> ApiResult<DataEnvelope<Person>> {
        self.guarded("get_person", token, |_| {
            Ok(DataEnvelope::ok(self.persons.get(id)?))
        })
    }

    pub fn register_person(
        &self,
        token: Option<&str>,
        input: NewPerson,
    ) -> ApiResult<DataEnvelope<Person>> {
        self.guarded("register_person", token, |_| {
            let person = self.persons.register(input)?;
            info!("event=person_register module=api status=ok id={}", person.id);
            Ok(DataEnvelope::with_message(person, MSG_PERSON_CREATED))
        })
    }

    pub fn update_person(
        &self,
        token: Option<&str>,
        id: &str,
        patch: PersonPatch,
    ) -> ApiResult<DataEnvelope<Person>> {
        self.guarded("update_person", token, |_| {
            let person = self.persons.update(id, patch)?;
            Ok(DataEnvelope::with_message(person, MSG_PERSON_UPDATED))
        })
    }

    /// Deletes a person; its attendances are kept.
    pub fn delete_person(&self, token: Option<&str>, id: &str) -> ApiResult<DataEnvelope<Person>> {
        self.guarded("delete_person", token, |_| {
            let person = self.persons.delete(id)?;
            Ok(DataEnvelope::with_message(person, MSG_PERSON_DELETED))
        })
    }

    pub fn list_attendances(
        &self,
        token: Option<&str>,
        params: &RequestParams,
    ) -> ApiResult<ListEnvelope<AttendanceRecord>> {
        self.guarded("list_attendances", token, |_| {
            let page = self.attendances.list(params)?;
            Ok(ListEnvelope {
                success: true,
                data: page.items,
                pagination: page.meta,
            })
        })
    }

    pub fn get_attendance(
        &self,
        token: Option<&str>,
        id: &str,
    ) -> ApiResult<DataEnvelope<AttendanceRecord>> {
        self.guarded("get_attendance", token, |_| {
            Ok(DataEnvelope::ok(self.attendances.get(id)?))
        })
    }

    /// Submits an attendance; the caller is the default technician.
    pub fn submit_attendance(
        &self,
        token: Option<&str>,
        input: NewAttendance,
    ) -> ApiResult<DataEnvelope<AttendanceRecord>> {
        self.guarded("submit_attendance", token, |claims| {
            let record = self.attendances.submit(input, &claims.display_name)?;
            info!(
                "event=attendance_submit module=api status=ok id={} person_id={}",
                record.id, record.person_id
            );
            Ok(DataEnvelope::with_message(record, MSG_ATTENDANCE_CREATED))
        })
    }

    pub fn update_attendance(
        &self,
        token: Option<&str>,
        id: &str,
        patch: AttendancePatch,
    ) -> ApiResult<DataEnvelope<AttendanceRecord>> {
        self.guarded("update_attendance", token, |_| {
            let record = self.attendances.update(id, patch)?;
            Ok(DataEnvelope::with_message(record, MSG_ATTENDANCE_UPDATED))
        })
    }

    pub fn delete_attendance(
        &self,
        token: Option<&str>,
        id: &str,
    ) -> ApiResult<DataEnvelope<AttendanceRecord>> {
        self.guarded("delete_attendance", token, |_| {
            let record = self.attendances.delete(id)?;
            Ok(DataEnvelope::with_message(record, MSG_ATTENDANCE_DELETED))
        })
    }

    /// Dashboard report selected by `tipo`.
    pub fn report(
        &self,
        token: Option<&str>,
        params: &RequestParams,
    ) -> ApiResult<DataEnvelope<Report>> {
        self.guarded("report", token, |_| {
            let (kind, report) = self.reports.report(params)?;
            info!("event=report_build module=api status=ok kind={}", kind.as_str());
            Ok(DataEnvelope::ok(report))
        })
    }

    fn guarded<R, F>(&self, op: &'static str, token: Option<&str>, run: F) -> ApiResult<R>
    where
        F: FnOnce(&Claims) -> ApiResult<R>,
    {
        let claims = match self.verifier.verify(token, self.clock.now()) {
            Ok(claims) => claims,
            Err(denied) => {
                warn!("event=api_call module=api op={op} status=denied code=401");
                return Err(denied.into());
            }
        };
        self.observed(op, || run(&claims))
    }

    fn observed<R, F>(&self, op: &'static str, run: F) -> ApiResult<R>
    where
        F: FnOnce() -> ApiResult<R>,
    {
        let started_at = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
            error!(
                "event=api_panic module=api op={op} status=error payload={}",
                panic_summary(payload.as_ref())
            );
            Err(ApiError::Internal)
        });

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!("event=api_call module=api op={op} status=ok duration_ms={duration_ms}"),
            Err(err) => warn!(
                "event=api_call module=api op={op} status=error code={} duration_ms={duration_ms}",
                err.status_code()
            ),
        }
        result
    }
}
