//! Generic persistence contract and the in-memory datastore shipped with the
//! service. The rest of the crate only ever sees `Repository<T>`, so another
//! backend can be swapped in behind the same five-method surface.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    Allocation, AllocationId, Employment, EmploymentId, EntityKind, Period, PeriodId, Project,
    ProjectId, Student, StudentId,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} record {id} not found")]
    MissingRecord { kind: EntityKind, id: i64 },
    #[error("datastore unavailable: {0}")]
    Unavailable(String),
}

/// Stored record with an id the repository controls.
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn raw_id(&self) -> i64;
    fn with_raw_id(self, id: i64) -> Self;
}

macro_rules! impl_entity {
    ($record:ty, $kind:expr) => {
        impl Entity for $record {
            const KIND: EntityKind = $kind;

            fn raw_id(&self) -> i64 {
                self.id.0
            }

            fn with_raw_id(mut self, id: i64) -> Self {
                self.id.0 = id;
                self
            }
        }
    };
}

impl_entity!(Employment, EntityKind::Employment);
impl_entity!(Student, EntityKind::Student);
impl_entity!(Period, EntityKind::Period);
impl_entity!(Project, EntityKind::Project);
impl_entity!(Allocation, EntityKind::Allocation);

/// The save/find/find-all/delete contract the services are written against.
pub trait Repository<T: Entity>: Send + Sync {
    /// Persist a new record; the repository assigns a fresh id.
    fn insert(&self, record: T) -> Result<T, StoreError>;
    /// Overwrite an existing record; the id must already be present.
    fn update(&self, record: T) -> Result<T, StoreError>;
    fn find(&self, id: i64) -> Result<Option<T>, StoreError>;
    fn find_all(&self) -> Result<Vec<T>, StoreError>;
    fn delete(&self, id: i64) -> Result<(), StoreError>;
}

/// Mutex-guarded map keyed by id. Ids are handed out by a monotonic sequence
/// and never reused, even after deletions.
pub struct InMemoryRepository<T> {
    rows: Mutex<BTreeMap<i64, T>>,
    sequence: AtomicI64,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            sequence: AtomicI64::new(1),
        }
    }
}

impl<T: Entity> InMemoryRepository<T> {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<i64, T>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    fn insert(&self, record: T) -> Result<T, StoreError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let record = record.with_raw_id(id);
        self.lock()?.insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, record: T) -> Result<T, StoreError> {
        let mut rows = self.lock()?;
        let id = record.raw_id();
        if !rows.contains_key(&id) {
            return Err(StoreError::MissingRecord { kind: T::KIND, id });
        }
        rows.insert(id, record.clone());
        Ok(record)
    }

    fn find(&self, id: i64) -> Result<Option<T>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn find_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut rows = self.lock()?;
        if rows.remove(&id).is_none() {
            return Err(StoreError::MissingRecord { kind: T::KIND, id });
        }
        Ok(())
    }
}

/// Bundle of the five repositories the services operate on.
#[derive(Clone)]
pub struct Datastore {
    pub employments: Arc<dyn Repository<Employment>>,
    pub students: Arc<dyn Repository<Student>>,
    pub periods: Arc<dyn Repository<Period>>,
    pub projects: Arc<dyn Repository<Project>>,
    pub allocations: Arc<dyn Repository<Allocation>>,
}

impl Datastore {
    pub fn in_memory() -> Self {
        Self {
            employments: Arc::new(InMemoryRepository::default()),
            students: Arc::new(InMemoryRepository::default()),
            periods: Arc::new(InMemoryRepository::default()),
            projects: Arc::new(InMemoryRepository::default()),
            allocations: Arc::new(InMemoryRepository::default()),
        }
    }
}

// Convenience conversions so service code can pass typed ids straight to the
// raw-id repository surface.
macro_rules! impl_raw_from {
    ($id:ty) => {
        impl From<$id> for i64 {
            fn from(value: $id) -> i64 {
                value.0
            }
        }
    };
}

impl_raw_from!(EmploymentId);
impl_raw_from!(StudentId);
impl_raw_from!(PeriodId);
impl_raw_from!(ProjectId);
impl_raw_from!(AllocationId);
