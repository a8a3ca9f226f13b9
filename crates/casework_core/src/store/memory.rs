//! In-process record store.
//!
//! Records live in a `RwLock<Vec<T>>`; readers clone snapshots, writers
//! replace or remove whole records by id.

use crate::model::record::Record;
use crate::store::{PutOutcome, RecordStore, StoreError, StoreResult};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Vector-backed store that keeps insertion order.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Store pre-populated with `records` in the given order.
    ///
    /// Later duplicates of an id replace earlier ones in place.
    pub fn with_records(records: Vec<T>) -> Self {
        let mut unique: Vec<T> = Vec::with_capacity(records.len());
        for record in records {
            match unique
                .iter()
                .position(|existing| existing.record_id() == record.record_id())
            {
                Some(index) => unique[index] = record,
                None => unique.push(record),
            }
        }
        Self {
            records: RwLock::new(unique),
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<T>>> {
        self.records
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<T>>> {
        self.records
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn get(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self
            .read()?
            .iter()
            .find(|record| record.record_id() == id)
            .cloned())
    }

    fn list(&self) -> StoreResult<Vec<T>> {
        Ok(self.read()?.clone())
    }

    fn put(&self, record: &T) -> StoreResult<PutOutcome> {
        let mut records = self.write()?;
        match records
            .iter()
            .position(|existing| existing.record_id() == record.record_id())
        {
            Some(index) => {
                records[index] = record.clone();
                Ok(PutOutcome::Replaced)
            }
            None => {
                records.push(record.clone());
                Ok(PutOutcome::Inserted)
            }
        }
    }

    fn delete(&self, id: &str) -> StoreResult<T> {
        let mut records = self.write()?;
        let index = records
            .iter()
            .position(|record| record.record_id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(records.remove(index))
    }
}
