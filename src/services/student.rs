use tracing::debug;

use crate::domain::{EntityKind, SaveIntent, Student, StudentDraft, StudentId};
use crate::integrity::delete_plan;
use crate::store::Datastore;

use super::ServiceError;

#[derive(Clone)]
pub struct StudentService {
    store: Datastore,
}

impl StudentService {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<Student>, ServiceError> {
        Ok(self.store.students.find_all()?)
    }

    pub fn get(&self, id: StudentId) -> Result<Student, ServiceError> {
        self.store
            .students
            .find(id.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Student, id))
    }

    pub fn set(
        &self,
        intent: SaveIntent<StudentId>,
        draft: StudentDraft,
    ) -> Result<Student, ServiceError> {
        draft.validate()?;

        // The employment reference is required and must resolve.
        if self.store.employments.find(draft.employment.0)?.is_none() {
            return Err(ServiceError::not_found(
                EntityKind::Employment,
                draft.employment,
            ));
        }

        let record = Student {
            id: match intent {
                SaveIntent::Create => StudentId(0),
                SaveIntent::Update(id) => id,
            },
            first_name: draft.first_name,
            last_name: draft.last_name,
            employment: draft.employment,
        };

        let saved = match intent {
            SaveIntent::Create => self.store.students.insert(record)?,
            SaveIntent::Update(_) => self.store.students.update(record)?,
        };
        Ok(saved)
    }

    /// Removes the student and every allocation assigned to them. The
    /// cascaded allocations' periods stay behind; only an explicit
    /// allocation delete removes its period.
    pub fn delete(&self, id: StudentId) -> Result<Student, ServiceError> {
        let student = self.get(id)?;

        for cascade in delete_plan(EntityKind::Student).cascades {
            if cascade != EntityKind::Allocation {
                continue;
            }
            for allocation in self.store.allocations.find_all()? {
                if allocation.student == id {
                    debug!(allocation = allocation.id.0, student = id.0, "cascade delete");
                    self.store.allocations.delete(allocation.id.0)?;
                }
            }
        }

        self.store.students.delete(id.0)?;
        Ok(student)
    }
}
