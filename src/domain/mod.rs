use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper per entity so references cannot be crossed by accident.
macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(EmploymentId);
entity_id!(StudentId);
entity_id!(PeriodId);
entity_id!(ProjectId);
entity_id!(AllocationId);

/// The five record kinds handled by the service, used by the deletion policy
/// table and in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Employment,
    Student,
    Period,
    Project,
    Allocation,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Employment => "employment",
            EntityKind::Student => "student",
            EntityKind::Period => "period",
            EntityKind::Project => "project",
            EntityKind::Allocation => "allocation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explicit write intent: a create never carries an id, an update always
/// does. Rules out the ambiguous upsert-by-missing-id middle ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveIntent<I> {
    Create,
    Update(I),
}

/// A category label for a student (e.g. intern, working student).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employment {
    pub id: EmploymentId,
    pub name: String,
}

/// A student, always employed under exactly one employment category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub employment: EmploymentId,
}

/// A begin/end date range. Owned either by a project (shared) or by an
/// allocation (private, deleted with it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

/// A project owning exactly one period that bounds all of its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub period: PeriodId,
}

/// A time-bounded assignment of one student to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub project: ProjectId,
    pub period: PeriodId,
    pub student: StudentId,
}

/// Raw begin/end pair before it becomes a stored period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpan {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodSpan {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Self {
        Self { begin, end }
    }

    /// Strict ordering check: equal dates are as invalid as reversed ones.
    pub fn is_ordered(&self) -> bool {
        self.begin < self.end
    }
}

/// Write payload for a period owned by a project or an allocation: carries
/// its own intent because the owner may be created while the period is
/// updated, or vice versa.
#[derive(Debug, Clone, Copy)]
pub struct OwnedPeriodDraft {
    pub intent: SaveIntent<PeriodId>,
    pub span: PeriodSpan,
}

impl OwnedPeriodDraft {
    pub fn create(span: PeriodSpan) -> Self {
        Self {
            intent: SaveIntent::Create,
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmploymentDraft {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub employment: EmploymentId,
}

#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub name: String,
    pub period: OwnedPeriodDraft,
}

#[derive(Debug, Clone)]
pub struct AllocationDraft {
    pub project: ProjectId,
    pub student: StudentId,
    pub period: OwnedPeriodDraft,
}

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 32;

/// Field constraint violations, checked before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: a name cannot be blank")]
    Blank { field: &'static str },
    #[error("{field}: a name must have between 2 and 32 characters")]
    Length { field: &'static str },
    #[error("{field}: the name includes invalid letters")]
    Characters { field: &'static str },
}

fn check_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    let length = value.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&length) {
        return Err(ValidationError::Length { field });
    }
    Ok(())
}

fn check_characters(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
    {
        Ok(())
    } else {
        Err(ValidationError::Characters { field })
    }
}

impl EmploymentDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("name", &self.name)
    }
}

impl StudentDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("first_name", &self.first_name)?;
        check_characters("first_name", &self.first_name)?;
        check_name("last_name", &self.last_name)?;
        check_characters("last_name", &self.last_name)
    }
}

impl ProjectDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name("name", &self.name)?;
        check_characters("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn span_ordering_is_strict() {
        assert!(PeriodSpan::new(date(2024, 1, 1), date(2024, 1, 31)).is_ordered());
        assert!(!PeriodSpan::new(date(2024, 1, 1), date(2024, 1, 1)).is_ordered());
        assert!(!PeriodSpan::new(date(2024, 2, 1), date(2024, 1, 1)).is_ordered());
    }

    #[test]
    fn employment_name_bounds() {
        let too_short = EmploymentDraft {
            name: "x".to_string(),
        };
        assert_eq!(
            too_short.validate(),
            Err(ValidationError::Length { field: "name" })
        );

        let blank = EmploymentDraft {
            name: "   ".to_string(),
        };
        assert_eq!(blank.validate(), Err(ValidationError::Blank { field: "name" }));

        let ok = EmploymentDraft {
            name: "Working Student".to_string(),
        };
        assert_eq!(ok.validate(), Ok(()));
    }

    #[test]
    fn employment_name_allows_punctuation() {
        // Only student and project names carry the character class rule.
        let draft = EmploymentDraft {
            name: "Intern (paid)".to_string(),
        };
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn student_names_reject_special_characters() {
        let draft = StudentDraft {
            first_name: "Ann".to_string(),
            last_name: "O'Hara".to_string(),
            employment: EmploymentId(1),
        };
        assert_eq!(
            draft.validate(),
            Err(ValidationError::Characters { field: "last_name" })
        );
    }

    #[test]
    fn project_name_accepts_alphanumerics_and_spaces() {
        let draft = ProjectDraft {
            name: "Alpha 2024".to_string(),
            period: OwnedPeriodDraft::create(PeriodSpan::new(
                date(2024, 1, 1),
                date(2024, 1, 31),
            )),
        };
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        let draft = EmploymentDraft {
            name: "ab".to_string(),
        };
        assert_eq!(draft.validate(), Ok(()));

        let over = EmploymentDraft {
            name: "a".repeat(NAME_MAX + 1),
        };
        assert_eq!(over.validate(), Err(ValidationError::Length { field: "name" }));
    }
}
