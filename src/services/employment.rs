use crate::domain::{Employment, EmploymentDraft, EmploymentId, EntityKind, SaveIntent};
use crate::integrity::delete_plan;
use crate::store::Datastore;

use super::ServiceError;

#[derive(Clone)]
pub struct EmploymentService {
    store: Datastore,
}

impl EmploymentService {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<Employment>, ServiceError> {
        Ok(self.store.employments.find_all()?)
    }

    pub fn get(&self, id: EmploymentId) -> Result<Employment, ServiceError> {
        self.store
            .employments
            .find(id.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Employment, id))
    }

    pub fn set(
        &self,
        intent: SaveIntent<EmploymentId>,
        draft: EmploymentDraft,
    ) -> Result<Employment, ServiceError> {
        draft.validate()?;

        let record = Employment {
            id: match intent {
                SaveIntent::Create => EmploymentId(0),
                SaveIntent::Update(id) => id,
            },
            name: draft.name,
        };

        let saved = match intent {
            SaveIntent::Create => self.store.employments.insert(record)?,
            SaveIntent::Update(_) => self.store.employments.update(record)?,
        };
        Ok(saved)
    }

    /// Refuses while any student still carries the employment.
    pub fn delete(&self, id: EmploymentId) -> Result<Employment, ServiceError> {
        let employment = self.get(id)?;

        for blocker in delete_plan(EntityKind::Employment).blockers {
            if blocker == EntityKind::Student
                && self
                    .store
                    .students
                    .find_all()?
                    .iter()
                    .any(|student| student.employment == id)
            {
                return Err(ServiceError::ReferentialConflict {
                    target: EntityKind::Employment,
                    id: id.0,
                    referrer: blocker,
                });
            }
        }

        self.store.employments.delete(id.0)?;
        Ok(employment)
    }
}
