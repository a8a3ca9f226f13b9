//! SQLite-backed record store.
//!
//! # Responsibility
//! - Persist persons and attendances in the migrated casework schema.
//! - Map rows back into domain records with the same ordering contract as
//!   `MemoryStore`.
//!
//! # Invariants
//! - Upserts keep the original rowid, so `list` (ordered by rowid) stays in
//!   insertion order after replacements.
//! - Attendance service tags are rewritten as a whole inside the same
//!   transaction as the attendance row.
//! - The national-id unique index surfaces as `StoreError::Constraint`.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::attendance::{
    AttendanceKind, AttendanceMode, AttendanceRecord, Outcome, ServiceTag,
};
use crate::model::person::{Person, Sex};
use crate::model::record::iso_date;
use crate::store::{PutOutcome, RecordStore, StoreError, StoreResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PERSON_COLUMNS: &str = "id, full_name, national_id, birth_date, age, sex, phones, address,
     guardian_name, guardian_national_id, registered_on";

const ATTENDANCE_COLUMNS: &str = "id, person_id, person_name, person_national_id, date, kind,
     mode, mode_other, technician, demand, referrals, observations, social_opinion, outcome,
     created_at";

/// Record store over one SQLite connection.
///
/// The connection is guarded by a mutex so one store can be shared
/// between threads behind an `Arc`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and migrates it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db(path)?),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db_in_memory()?),
        })
    }

    /// Wraps an already migrated connection.
    ///
    /// Connections whose schema version differs from the latest known
    /// migration are rejected as `StoreError::Unavailable`.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        let version = current_version(&conn)?;
        let latest = latest_version();
        if version != latest {
            return Err(StoreError::Unavailable(format!(
                "connection schema version is {version}, expected {latest}"
            )));
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite store lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl RecordStore<Person> for SqliteStore {
    fn get(&self, id: &str) -> StoreResult<Option<Person>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1;"
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(person_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StoreResult<Vec<Person>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM persons ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(person_from_row(row)?);
        }
        Ok(persons)
    }

    fn put(&self, record: &Person) -> StoreResult<PutOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = row_outcome(&tx, "persons", &record.id)?;

        tx.execute(
            "INSERT INTO persons (
                id, full_name, national_id, birth_date, age, sex, phones, address,
                guardian_name, guardian_national_id, registered_on
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                full_name = excluded.full_name,
                national_id = excluded.national_id,
                birth_date = excluded.birth_date,
                age = excluded.age,
                sex = excluded.sex,
                phones = excluded.phones,
                address = excluded.address,
                guardian_name = excluded.guardian_name,
                guardian_national_id = excluded.guardian_national_id,
                registered_on = excluded.registered_on;",
            params![
                record.id,
                record.full_name,
                record.national_id,
                iso_date(record.birth_date),
                record.age,
                record.sex.as_str(),
                record.phones,
                record.address,
                record.guardian_name,
                record.guardian_national_id,
                iso_date(record.registered_on),
            ],
        )?;

        tx.commit()?;
        Ok(outcome)
    }

    fn delete(&self, id: &str) -> StoreResult<Person> {
        let existing = RecordStore::<Person>::get(self, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM persons WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(existing)
    }
}

impl RecordStore<AttendanceRecord> for SqliteStore {
    fn get(&self, id: &str) -> StoreResult<Option<AttendanceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE id = ?1;"
        ))?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut record = attendance_from_row(row)?;
        record.services = load_services(&conn, id)?;
        Ok(Some(record))
    }

    fn list(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let conn = self.lock()?;
        let mut services = load_all_services(&conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = attendance_from_row(row)?;
            record.services = services.remove(&record.id).unwrap_or_default();
            records.push(record);
        }
        Ok(records)
    }

    fn put(&self, record: &AttendanceRecord) -> StoreResult<PutOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = row_outcome(&tx, "attendances", &record.id)?;

        tx.execute(
            "INSERT INTO attendances (
                id, person_id, person_name, person_national_id, date, kind, mode,
                mode_other, technician, demand, referrals, observations, social_opinion,
                outcome, created_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                person_id = excluded.person_id,
                person_name = excluded.person_name,
                person_national_id = excluded.person_national_id,
                date = excluded.date,
                kind = excluded.kind,
                mode = excluded.mode,
                mode_other = excluded.mode_other,
                technician = excluded.technician,
                demand = excluded.demand,
                referrals = excluded.referrals,
                observations = excluded.observations,
                social_opinion = excluded.social_opinion,
                outcome = excluded.outcome,
                created_at = excluded.created_at;",
            params![
                record.id,
                record.person_id,
                record.person_name,
                record.person_national_id,
                iso_date(record.date),
                record.kind.as_str(),
                record.mode.as_str(),
                record.mode_other,
                record.technician,
                record.demand,
                record.referrals,
                record.observations,
                record.social_opinion,
                record.outcome.as_str(),
                record
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ],
        )?;

        tx.execute(
            "DELETE FROM attendance_services WHERE attendance_id = ?1;",
            [record.id.as_str()],
        )?;
        for (position, tag) in record.services.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StoreError::InvalidData("too many service tags".to_string()))?;
            tx.execute(
                "INSERT INTO attendance_services (attendance_id, position, label, is_other)
                 VALUES (?1, ?2, ?3, ?4);",
                params![record.id, position, tag.label(), !tag.is_known()],
            )?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn delete(&self, id: &str) -> StoreResult<AttendanceRecord> {
        let existing = RecordStore::<AttendanceRecord>::get(self, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM attendances WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(existing)
    }
}

fn row_outcome(tx: &Transaction<'_>, table: &'static str, id: &str) -> StoreResult<PutOutcome> {
    let existing: Option<i64> = tx
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE id = ?1;"),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(if existing.is_some() {
        PutOutcome::Replaced
    } else {
        PutOutcome::Inserted
    })
}

fn person_from_row(row: &Row<'_>) -> StoreResult<Person> {
    let sex_code: String = row.get("sex")?;
    let sex = Sex::parse(&sex_code)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown sex code `{sex_code}`")))?;
    Ok(Person {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        national_id: row.get("national_id")?,
        birth_date: parse_date(&row.get::<_, String>("birth_date")?)?,
        age: row.get("age")?,
        sex,
        phones: row.get("phones")?,
        address: row.get("address")?,
        guardian_name: row.get("guardian_name")?,
        guardian_national_id: row.get("guardian_national_id")?,
        registered_on: parse_date(&row.get::<_, String>("registered_on")?)?,
    })
}

fn attendance_from_row(row: &Row<'_>) -> StoreResult<AttendanceRecord> {
    let kind: String = row.get("kind")?;
    let mode: String = row.get("mode")?;
    let outcome: String = row.get("outcome")?;
    let created_at: String = row.get("created_at")?;

    Ok(AttendanceRecord {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        person_name: row.get("person_name")?,
        person_national_id: row.get("person_national_id")?,
        date: parse_date(&row.get::<_, String>("date")?)?,
        kind: AttendanceKind::parse(&kind)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown attendance kind `{kind}`")))?,
        mode: AttendanceMode::parse(&mode)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown attendance mode `{mode}`")))?,
        mode_other: row.get("mode_other")?,
        technician: row.get("technician")?,
        demand: row.get("demand")?,
        services: Vec::new(),
        referrals: row.get("referrals")?,
        observations: row.get("observations")?,
        social_opinion: row.get("social_opinion")?,
        outcome: Outcome::parse(&outcome)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown outcome `{outcome}`")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|_| {
                StoreError::InvalidData(format!("invalid created_at value `{created_at}`"))
            })?
            .with_timezone(&Utc),
    })
}

fn load_services(conn: &Connection, attendance_id: &str) -> StoreResult<Vec<ServiceTag>> {
    let mut stmt = conn.prepare(
        "SELECT label, is_other
         FROM attendance_services
         WHERE attendance_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([attendance_id])?;
    let mut services = Vec::new();
    while let Some(row) = rows.next()? {
        services.push(service_from_row(row)?);
    }
    Ok(services)
}

fn load_all_services(conn: &Connection) -> StoreResult<HashMap<String, Vec<ServiceTag>>> {
    let mut stmt = conn.prepare(
        "SELECT attendance_id, label, is_other
         FROM attendance_services
         ORDER BY attendance_id ASC, position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut services: HashMap<String, Vec<ServiceTag>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let attendance_id: String = row.get("attendance_id")?;
        services
            .entry(attendance_id)
            .or_default()
            .push(service_from_row(row)?);
    }
    Ok(services)
}

fn service_from_row(row: &Row<'_>) -> StoreResult<ServiceTag> {
    let label: String = row.get("label")?;
    let is_other: bool = row.get("is_other")?;
    // Free text that happens to equal a known label still stays `Other`.
    if is_other {
        Ok(ServiceTag::Other(label))
    } else {
        Ok(ServiceTag::from_label(&label))
    }
}

fn parse_date(value: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| StoreError::InvalidData(format!("invalid date value `{value}`")))
}
