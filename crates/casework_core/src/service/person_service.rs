//! Person registry use-cases.
//!
//! # Responsibility
//! - Register, update, fetch, delete and list registry entries.
//! - Enforce national-id uniqueness across the whole registry.
//!
//! # Invariants
//! - A register/update that would duplicate a national id fails with
//!   `Conflict` and leaves the store unchanged.
//! - Ages are recomputed from the service clock on every write.

use crate::clock::Clock;
use crate::config::PagingConfig;
use crate::model::person::{NewPerson, Person, PersonPatch};
use crate::query::{person_query, run_query, Page, RequestParams};
use crate::service::error::{ServiceError, ServiceResult};
use crate::store::{RecordStore, StoreError};
use std::sync::Arc;
use uuid::Uuid;

pub const PERSON_KIND: &str = "person";

/// Registry facade over a person store.
pub struct PersonService<S: RecordStore<Person>> {
    store: S,
    clock: Arc<dyn Clock>,
    paging: PagingConfig,
}

impl<S: RecordStore<Person>> PersonService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, paging: PagingConfig) -> Self {
        Self {
            store,
            clock,
            paging,
        }
    }

    /// Registers a new person under a fresh UUID.
    pub fn register(&self, input: NewPerson) -> ServiceResult<Person> {
        let person = Person::register(Uuid::new_v4().to_string(), input, self.clock.today())?;
        self.ensure_unique_national_id(&person)?;
        self.store.put(&person)?;
        Ok(person)
    }

    /// Applies a partial update; the id and registration date are kept.
    pub fn update(&self, id: &str, patch: PersonPatch) -> ServiceResult<Person> {
        let current = self.get(id)?;
        let next = current.patched(patch, self.clock.today())?;
        if next.national_id != current.national_id {
            self.ensure_unique_national_id(&next)?;
        }
        self.store.put(&next)?;
        Ok(next)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Person> {
        self.store
            .get(id)?
            .ok_or_else(|| ServiceError::not_found(PERSON_KIND, id))
    }

    /// Removes a person. Attendances that reference it are left as they are.
    pub fn delete(&self, id: &str) -> ServiceResult<Person> {
        self.store.delete(id).map_err(|err| match err {
            StoreError::NotFound(_) => ServiceError::not_found(PERSON_KIND, id),
            other => ServiceError::from(other),
        })
    }

    /// One page of persons selected by request parameters.
    pub fn list(&self, params: &RequestParams) -> ServiceResult<Page<Person>> {
        let config = person_query(params, &self.paging)?;
        let persons = self.store.list()?;
        Ok(run_query(&persons, &config)?)
    }

    /// Every person in store order.
    pub fn all(&self) -> ServiceResult<Vec<Person>> {
        Ok(self.store.list()?)
    }

    fn ensure_unique_national_id(&self, candidate: &Person) -> ServiceResult<()> {
        let taken = self
            .store
            .list()?
            .iter()
            .any(|person| person.national_id == candidate.national_id && person.id != candidate.id);
        if taken {
            return Err(ServiceError::Conflict(format!(
                "national id {} is already registered",
                candidate.national_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PersonService;
    use crate::clock::FixedClock;
    use crate::config::PagingConfig;
    use crate::model::person::{NewPerson, Person, PersonPatch, Sex};
    use crate::service::error::ServiceError;
    use crate::store::{MemoryStore, RecordStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn service() -> PersonService<Arc<MemoryStore<Person>>> {
        let clock = Arc::new(FixedClock::on_date(2024, 1, 15).unwrap());
        PersonService::new(Arc::new(MemoryStore::new()), clock, PagingConfig::default())
    }

    fn input(national_id: &str) -> NewPerson {
        NewPerson {
            full_name: "João Carlos Oliveira".to_string(),
            national_id: national_id.to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 12, 3),
            sex: Some(Sex::Male),
            ..NewPerson::default()
        }
    }

    #[test]
    fn update_to_own_national_id_is_not_a_conflict() {
        let service = service();
        let person = service.register(input("98765432100")).unwrap();
        let updated = service
            .update(
                &person.id,
                PersonPatch {
                    national_id: Some("987.654.321-00".to_string()),
                    phones: Some("(11) 88888-8888".to_string()),
                    ..PersonPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.phones, "(11) 88888-8888");
        assert_eq!(updated.age, 38);
    }

    #[test]
    fn missing_person_is_not_found() {
        assert!(matches!(
            service().delete("ghost"),
            Err(ServiceError::NotFound { kind: "person", .. })
        ));
    }

    #[test]
    fn conflicting_update_leaves_store_unchanged() {
        let service = service();
        let first = service.register(input("11111111111")).unwrap();
        let second = service.register(input("22222222222")).unwrap();
        let err = service
            .update(
                &second.id,
                PersonPatch {
                    national_id: Some(first.national_id.clone()),
                    ..PersonPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(service.get(&second.id).unwrap().national_id, "222.222.222-22");
        assert_eq!(service.store.list().unwrap().len(), 2);
    }
}
