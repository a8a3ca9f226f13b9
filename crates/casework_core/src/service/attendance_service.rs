//! Attendance record use-cases.
//!
//! # Responsibility
//! - Submit, update, fetch, delete and list attendance records.
//! - Resolve the referenced person once at submission and copy its name and
//!   national id onto the record.
//!
//! # Invariants
//! - `created_at` comes from the service clock at submission and is never
//!   rewritten by updates.
//! - Deleting or editing a person never touches its attendances.

use crate::clock::Clock;
use crate::config::PagingConfig;
use crate::model::attendance::{
    AttendancePatch, AttendanceRecord, AttendanceValidationError, NewAttendance, PersonSnapshot,
    FIELD_PERSON_ID,
};
use crate::model::person::Person;
use crate::query::{attendance_query, run_query, Page, RequestParams};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::person_service::PERSON_KIND;
use crate::store::{RecordStore, StoreError};
use std::sync::Arc;
use uuid::Uuid;

pub const ATTENDANCE_KIND: &str = "attendance";

/// Attendance facade over an attendance store and a person store.
pub struct AttendanceService<A, P>
where
    A: RecordStore<AttendanceRecord>,
    P: RecordStore<Person>,
{
    attendances: A,
    persons: P,
    clock: Arc<dyn Clock>,
    paging: PagingConfig,
}

impl<A, P> AttendanceService<A, P>
where
    A: RecordStore<AttendanceRecord>,
    P: RecordStore<Person>,
{
    pub fn new(attendances: A, persons: P, clock: Arc<dyn Clock>, paging: PagingConfig) -> Self {
        Self {
            attendances,
            persons,
            clock,
            paging,
        }
    }

    /// Records a new attendance.
    ///
    /// `caller_name` becomes the technician when the input names none.
    pub fn submit(&self, input: NewAttendance, caller_name: &str) -> ServiceResult<AttendanceRecord> {
        let person_id = input.person_id.trim().to_string();
        if person_id.is_empty() {
            return Err(AttendanceValidationError::MissingField(FIELD_PERSON_ID).into());
        }
        let person = self
            .persons
            .get(&person_id)?
            .ok_or_else(|| ServiceError::not_found(PERSON_KIND, person_id.as_str()))?;

        let record = AttendanceRecord::submit(
            Uuid::new_v4().to_string(),
            PersonSnapshot {
                id: person.id,
                name: person.full_name,
                national_id: person.national_id,
            },
            input,
            caller_name,
            self.clock.now(),
        )?;
        self.attendances.put(&record)?;
        Ok(record)
    }

    /// Applies a partial update; identity and creation time are kept.
    pub fn update(&self, id: &str, patch: AttendancePatch) -> ServiceResult<AttendanceRecord> {
        let next = self.get(id)?.patched(patch)?;
        self.attendances.put(&next)?;
        Ok(next)
    }

    pub fn get(&self, id: &str) -> ServiceResult<AttendanceRecord> {
        self.attendances
            .get(id)?
            .ok_or_else(|| ServiceError::not_found(ATTENDANCE_KIND, id))
    }

    pub fn delete(&self, id: &str) -> ServiceResult<AttendanceRecord> {
        self.attendances.delete(id).map_err(|err| match err {
            StoreError::NotFound(_) => ServiceError::not_found(ATTENDANCE_KIND, id),
            other => ServiceError::from(other),
        })
    }

    /// One page of attendances, newest first unless `sortBy` says otherwise.
    pub fn list(&self, params: &RequestParams) -> ServiceResult<Page<AttendanceRecord>> {
        let config = attendance_query(params, &self.paging)?;
        let records = self.attendances.list()?;
        Ok(run_query(&records, &config)?)
    }

    /// Every attendance in store order.
    pub fn all(&self) -> ServiceResult<Vec<AttendanceRecord>> {
        Ok(self.attendances.list()?)
    }
}
