//! Service layer sitting between the HTTP handlers and the repositories.
//! Carries the validation and referential-integrity rules that must hold no
//! matter which boundary (REST or file import) initiated the write.

mod allocation;
mod employment;
mod period;
mod project;
mod student;

pub use allocation::AllocationService;
pub use employment::EmploymentService;
pub use period::PeriodService;
pub use project::ProjectService;
pub use student::StudentService;

use crate::domain::{EntityKind, ValidationError};
use crate::store::StoreError;

/// Outcome of a service operation that did not go through. All variants are
/// synchronous, single-attempt results; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a period must begin before it ends")]
    InvalidPeriod,
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    #[error("{target} {id} is still referenced by {referrer} records")]
    ReferentialConflict {
        target: EntityKind,
        id: i64,
        referrer: EntityKind,
    },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::MissingRecord { kind, id } => ServiceError::NotFound { kind, id },
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
