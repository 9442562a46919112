use tracing::debug;

use crate::domain::{EntityKind, Period, PeriodId, Project, ProjectDraft, ProjectId, SaveIntent};
use crate::integrity::delete_plan;
use crate::store::Datastore;

use super::ServiceError;

#[derive(Clone)]
pub struct ProjectService {
    store: Datastore,
}

impl ProjectService {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<Project>, ServiceError> {
        Ok(self.store.projects.find_all()?)
    }

    pub fn get(&self, id: ProjectId) -> Result<Project, ServiceError> {
        self.store
            .projects
            .find(id.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Project, id))
    }

    /// Upserts the owned period first, then the project pointing at it.
    pub fn set(
        &self,
        intent: SaveIntent<ProjectId>,
        draft: ProjectDraft,
    ) -> Result<Project, ServiceError> {
        draft.validate()?;

        let period = Period {
            id: match draft.period.intent {
                SaveIntent::Create => PeriodId(0),
                SaveIntent::Update(id) => id,
            },
            begin: draft.period.span.begin,
            end: draft.period.span.end,
        };
        let period = match draft.period.intent {
            SaveIntent::Create => self.store.periods.insert(period)?,
            SaveIntent::Update(_) => self.store.periods.update(period)?,
        };

        let record = Project {
            id: match intent {
                SaveIntent::Create => ProjectId(0),
                SaveIntent::Update(id) => id,
            },
            name: draft.name,
            period: period.id,
        };

        let saved = match intent {
            SaveIntent::Create => self.store.projects.insert(record)?,
            SaveIntent::Update(_) => self.store.projects.update(record)?,
        };
        Ok(saved)
    }

    /// Removes the project and every allocation assigned to it. The
    /// project's own period stays; deleting it is a separate, guarded call
    /// that succeeds once nothing references it anymore.
    pub fn delete(&self, id: ProjectId) -> Result<Project, ServiceError> {
        let project = self.get(id)?;

        for cascade in delete_plan(EntityKind::Project).cascades {
            if cascade != EntityKind::Allocation {
                continue;
            }
            for allocation in self.store.allocations.find_all()? {
                if allocation.project == id {
                    debug!(allocation = allocation.id.0, project = id.0, "cascade delete");
                    self.store.allocations.delete(allocation.id.0)?;
                }
            }
        }

        self.store.projects.delete(id.0)?;
        Ok(project)
    }
}
