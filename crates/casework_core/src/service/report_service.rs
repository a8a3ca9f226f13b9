//! Dashboard report use-case.

use crate::model::attendance::AttendanceRecord;
use crate::model::person::Person;
use crate::query::params::{param, PARAM_REPORT_KIND};
use crate::query::{attendance_period, RequestParams};
use crate::report::{build_report, Report, ReportKind};
use crate::service::error::ServiceResult;
use crate::store::RecordStore;

/// Builds reports from snapshots of both stores.
pub struct ReportService<P, A>
where
    P: RecordStore<Person>,
    A: RecordStore<AttendanceRecord>,
{
    persons: P,
    attendances: A,
}

impl<P, A> ReportService<P, A>
where
    P: RecordStore<Person>,
    A: RecordStore<AttendanceRecord>,
{
    pub fn new(persons: P, attendances: A) -> Self {
        Self {
            persons,
            attendances,
        }
    }

    /// Report selected by `tipo` over the `dataInicio`/`dataFim` period.
    pub fn report(&self, params: &RequestParams) -> ServiceResult<(ReportKind, Report)> {
        let kind = ReportKind::from_param(param(params, PARAM_REPORT_KIND))?;
        let period = attendance_period(params)?;
        let persons = self.persons.list()?;
        let attendances = self.attendances.list()?;
        Ok((
            kind,
            build_report(kind, &persons, &attendances, period.as_ref()),
        ))
    }
}
