use casework_core::config::StoreBackend;
use casework_core::model::attendance::ServiceTag;
use casework_core::seed::{demo_attendances, demo_people, seed_demo};
use casework_core::store::{open_stores, PutOutcome, StoreError};
use casework_core::{AttendanceRecord, Person, RecordStore, SqliteStore};
use chrono::NaiveDate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

#[test]
fn demo_records_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("casework.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        seed_demo(&store, &store, today()).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let persons: Vec<Person> = store.list().unwrap();
    let attendances: Vec<AttendanceRecord> = store.list().unwrap();
    assert_eq!(persons, demo_people(today()).unwrap());
    assert_eq!(attendances, demo_attendances().unwrap());
}

#[test]
fn services_keep_order_and_free_text() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut record = demo_attendances().unwrap().remove(0);
    record.services = vec![
        ServiceTag::Other("Cesta básica".to_string()),
        ServiceTag::AutismCard,
        ServiceTag::ContinuousBenefit,
    ];

    assert_eq!(store.put(&record).unwrap(), PutOutcome::Inserted);
    let loaded: Option<AttendanceRecord> = store.get(&record.id).unwrap();
    assert_eq!(loaded.unwrap().services, record.services);

    record.services.truncate(1);
    assert_eq!(store.put(&record).unwrap(), PutOutcome::Replaced);
    let loaded: Option<AttendanceRecord> = store.get(&record.id).unwrap();
    assert_eq!(loaded.unwrap().services.len(), 1);
}

#[test]
fn deleting_a_person_leaves_attendances() {
    let store = SqliteStore::open_in_memory().unwrap();
    seed_demo(&store, &store, today()).unwrap();

    let removed: Person = store.delete("1").unwrap();
    assert_eq!(removed.full_name, "Maria Silva Santos");
    let attendance: Option<AttendanceRecord> = store.get("1").unwrap();
    assert!(attendance.is_some());

    let missing: Result<Person, StoreError> = store.delete("1");
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[test]
fn open_stores_shares_one_sqlite_connection() {
    let (persons, attendances) = open_stores(&StoreBackend::Sqlite { path: None }).unwrap();
    seed_demo(&persons, &attendances, today()).unwrap();
    assert_eq!(persons.list().unwrap().len(), 3);
    assert_eq!(attendances.list().unwrap().len(), 3);

    let (persons, _) = open_stores(&StoreBackend::Memory).unwrap();
    assert!(persons.list().unwrap().is_empty());
}
