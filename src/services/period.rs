use crate::domain::{EntityKind, Period, PeriodId, PeriodSpan, SaveIntent};
use crate::integrity::delete_plan;
use crate::store::Datastore;

use super::ServiceError;

/// Periods are the one entity two other kinds lean on, so deletes consult
/// the policy table before touching the store.
#[derive(Clone)]
pub struct PeriodService {
    store: Datastore,
}

impl PeriodService {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<Period>, ServiceError> {
        Ok(self.store.periods.find_all()?)
    }

    pub fn get(&self, id: PeriodId) -> Result<Period, ServiceError> {
        self.store
            .periods
            .find(id.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Period, id))
    }

    /// Upsert with the ordering invariant: `begin` strictly before `end`.
    pub fn set(
        &self,
        intent: SaveIntent<PeriodId>,
        span: PeriodSpan,
    ) -> Result<Period, ServiceError> {
        if !span.is_ordered() {
            return Err(ServiceError::InvalidPeriod);
        }

        let record = Period {
            id: match intent {
                SaveIntent::Create => PeriodId(0),
                SaveIntent::Update(id) => id,
            },
            begin: span.begin,
            end: span.end,
        };

        let saved = match intent {
            SaveIntent::Create => self.store.periods.insert(record)?,
            SaveIntent::Update(_) => self.store.periods.update(record)?,
        };
        Ok(saved)
    }

    /// Refuses while any project or allocation still points at the period.
    pub fn delete(&self, id: PeriodId) -> Result<Period, ServiceError> {
        let period = self.get(id)?;

        for blocker in delete_plan(EntityKind::Period).blockers {
            let referenced = match blocker {
                EntityKind::Project => self
                    .store
                    .projects
                    .find_all()?
                    .iter()
                    .any(|project| project.period == id),
                EntityKind::Allocation => self
                    .store
                    .allocations
                    .find_all()?
                    .iter()
                    .any(|allocation| allocation.period == id),
                _ => false,
            };
            if referenced {
                return Err(ServiceError::ReferentialConflict {
                    target: EntityKind::Period,
                    id: id.0,
                    referrer: blocker,
                });
            }
        }

        self.store.periods.delete(id.0)?;
        Ok(period)
    }
}
