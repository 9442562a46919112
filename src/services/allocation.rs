use crate::domain::{
    Allocation, AllocationDraft, AllocationId, EntityKind, Period, PeriodId, PeriodSpan,
    SaveIntent,
};
use crate::integrity::owns_private_period;
use crate::store::{Datastore, StoreError};

use super::ServiceError;

#[derive(Clone)]
pub struct AllocationService {
    store: Datastore,
}

impl AllocationService {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<Allocation>, ServiceError> {
        Ok(self.store.allocations.find_all()?)
    }

    pub fn get(&self, id: AllocationId) -> Result<Allocation, ServiceError> {
        self.store
            .allocations
            .find(id.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Allocation, id))
    }

    /// Clamps the allocation's period into its project's period, rejects a
    /// zero-length result, then persists the period and the allocation.
    pub fn set(
        &self,
        intent: SaveIntent<AllocationId>,
        draft: AllocationDraft,
    ) -> Result<Allocation, ServiceError> {
        let project = self
            .store
            .projects
            .find(draft.project.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Project, draft.project))?;
        let bounds = self
            .store
            .periods
            .find(project.period.0)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Period, project.period))?;

        if self.store.students.find(draft.student.0)?.is_none() {
            return Err(ServiceError::not_found(EntityKind::Student, draft.student));
        }

        let span = clamp_into(draft.period.span, &bounds);
        // A clamped span collapses to nothing when the requested dates sit
        // entirely outside the project window, or started zero-length.
        if !span.is_ordered() {
            return Err(ServiceError::InvalidPeriod);
        }

        let period = Period {
            id: match draft.period.intent {
                SaveIntent::Create => PeriodId(0),
                SaveIntent::Update(id) => id,
            },
            begin: span.begin,
            end: span.end,
        };
        let period = match draft.period.intent {
            SaveIntent::Create => self.store.periods.insert(period)?,
            SaveIntent::Update(_) => self.store.periods.update(period)?,
        };

        let record = Allocation {
            id: match intent {
                SaveIntent::Create => AllocationId(0),
                SaveIntent::Update(id) => id,
            },
            project: draft.project,
            period: period.id,
            student: draft.student,
        };

        let saved = match intent {
            SaveIntent::Create => self.store.allocations.insert(record)?,
            SaveIntent::Update(_) => self.store.allocations.update(record)?,
        };
        Ok(saved)
    }

    /// Deletes the allocation and its privately owned period.
    pub fn delete(&self, id: AllocationId) -> Result<Allocation, ServiceError> {
        let allocation = self.get(id)?;

        self.store.allocations.delete(id.0)?;

        if owns_private_period(EntityKind::Allocation) {
            match self.store.periods.delete(allocation.period.0) {
                Ok(()) | Err(StoreError::MissingRecord { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(allocation)
    }
}

fn clamp_into(span: PeriodSpan, bounds: &Period) -> PeriodSpan {
    let begin = if span.begin < bounds.begin {
        bounds.begin
    } else {
        span.begin
    };
    let end = if span.end > bounds.end {
        bounds.end
    } else {
        span.end
    };
    PeriodSpan::new(begin, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn bounds() -> Period {
        Period {
            id: PeriodId(1),
            begin: date(2024, 1, 1),
            end: date(2024, 1, 31),
        }
    }

    #[test]
    fn clamp_raises_early_begin_and_lowers_late_end() {
        let clamped = clamp_into(
            PeriodSpan::new(date(2023, 12, 1), date(2024, 2, 15)),
            &bounds(),
        );
        assert_eq!(clamped.begin, date(2024, 1, 1));
        assert_eq!(clamped.end, date(2024, 1, 31));
    }

    #[test]
    fn clamp_leaves_inner_span_alone() {
        let span = PeriodSpan::new(date(2024, 1, 5), date(2024, 1, 20));
        assert_eq!(clamp_into(span, &bounds()), span);
    }

    #[test]
    fn span_after_project_window_collapses() {
        let clamped = clamp_into(
            PeriodSpan::new(date(2024, 3, 1), date(2024, 3, 15)),
            &bounds(),
        );
        assert!(!clamped.is_ordered());
    }
}
