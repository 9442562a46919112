//! Spreadsheet reconciliation importer: reads a tabular export row by row,
//! matches each row against the existing records by natural keys, and
//! creates only what is missing. Bad rows produce diagnostics; the import
//! itself always runs to the end of the file.

mod parser;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::domain::{
    AllocationDraft, EmploymentDraft, EmploymentId, OwnedPeriodDraft, Period, PeriodId,
    PeriodSpan, ProjectDraft, SaveIntent, StudentDraft,
};
use crate::services::{
    AllocationService, EmploymentService, ProjectService, StudentService,
};
use crate::store::Datastore;

use parser::{extract_row, CompleteRow};

const OPEN_FAILURE_REPORT: &str = "The file could not be opened or read.";
const SUCCESS_MARKER: &str = "Upload Success!";

pub struct FileImporter {
    store: Datastore,
    employments: EmploymentService,
    students: StudentService,
    projects: ProjectService,
    allocations: AllocationService,
}

impl FileImporter {
    pub fn new(store: Datastore) -> Self {
        Self {
            employments: EmploymentService::new(store.clone()),
            students: StudentService::new(store.clone()),
            projects: ProjectService::new(store.clone()),
            allocations: AllocationService::new(store.clone()),
            store,
        }
    }

    /// Imports a file from disk. An unreadable file yields the fixed failure
    /// report instead of an error; callers always get a report string.
    pub fn import_path(&self, path: &Path) -> String {
        match std::fs::File::open(path) {
            Ok(file) => self.import_reader(file),
            Err(_) => OPEN_FAILURE_REPORT.to_string(),
        }
    }

    /// Runs the import over CSV data with a header row. Returns the
    /// diagnostic report: one line per row/column issue, then the trailing
    /// success marker.
    pub fn import_reader<R: Read>(&self, reader: R) -> String {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut issues: Vec<String> = Vec::new();
        let mut imported = 0usize;
        let mut skipped = 0usize;

        for (index, result) in csv_reader.records().enumerate() {
            let row_number = index + 1;
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    issues.push(format!("Server issue: {err}"));
                    continue;
                }
            };

            let (draft, mut cell_issues) = extract_row(row_number, &record);
            if !cell_issues.is_empty() {
                issues.append(&mut cell_issues);
                skipped += 1;
                continue;
            }

            let Some(row) = draft.into_complete() else {
                skipped += 1;
                continue;
            };

            match self.reconcile_row(&row) {
                Ok(()) => imported += 1,
                Err(message) => issues.push(format!("Server issue: {message}")),
            }
        }

        info!(imported, skipped, issues = issues.len(), "file import finished");

        let mut report = String::new();
        for issue in &issues {
            report.push_str(issue);
            report.push('\n');
        }
        report.push('\n');
        report.push_str(SUCCESS_MARKER);
        report
    }

    /// Resolves one row into the entity graph: employment, then student,
    /// then project, then allocation, creating whichever is absent.
    fn reconcile_row(&self, row: &CompleteRow) -> Result<(), String> {
        let employments = self
            .employments
            .all()
            .map_err(|err| format!("could not list employments: {err}"))?;

        let employment = match employments
            .iter()
            .find(|employment| employment.name == row.employment_name)
        {
            Some(existing) => existing.clone(),
            None => self
                .employments
                .set(
                    SaveIntent::Create,
                    EmploymentDraft {
                        name: row.employment_name.clone(),
                    },
                )
                .map_err(|err| {
                    format!("could not save employment {}: {err}", row.employment_name)
                })?,
        };

        // Students match on first name, last name, and employment *name*,
        // not employment id.
        let employment_names: HashMap<EmploymentId, String> = employments
            .into_iter()
            .map(|employment| (employment.id, employment.name))
            .collect();

        let students = self
            .students
            .all()
            .map_err(|err| format!("could not list students: {err}"))?;
        let student = match students.into_iter().find(|student| {
            student.first_name == row.first_name
                && student.last_name == row.last_name
                && employment_names.get(&student.employment).map(String::as_str)
                    == Some(row.employment_name.as_str())
        }) {
            Some(existing) => existing,
            None => self
                .students
                .set(
                    SaveIntent::Create,
                    StudentDraft {
                        first_name: row.first_name.clone(),
                        last_name: row.last_name.clone(),
                        employment: employment.id,
                    },
                )
                .map_err(|err| {
                    format!(
                        "could not save student {} {}: {err}",
                        row.first_name, row.last_name
                    )
                })?,
        };

        let project_name = row.project_name.as_deref().ok_or_else(|| {
            format!(
                "row for {} {} is missing a project name",
                row.first_name, row.last_name
            )
        })?;

        let projects = self
            .projects
            .all()
            .map_err(|err| format!("could not list projects: {err}"))?;
        // First writer wins: an existing project keeps its stored period
        // even when this row carries different project dates.
        let project = match projects
            .into_iter()
            .find(|project| project.name == project_name)
        {
            Some(existing) => existing,
            None => self
                .projects
                .set(
                    SaveIntent::Create,
                    ProjectDraft {
                        name: project_name.to_string(),
                        period: OwnedPeriodDraft::create(PeriodSpan::new(
                            row.project_begin,
                            row.project_end,
                        )),
                    },
                )
                .map_err(|err| format!("could not save project {project_name}: {err}"))?,
        };

        // An imported allocation carries the project columns' span, not the
        // row's allocation columns. The duplicate match uses the same
        // substituted span, so re-uploads and rows differing only in their
        // allocation dates collapse into one record.
        let candidate = PeriodSpan::new(row.project_begin, row.project_end);

        let periods: HashMap<PeriodId, Period> = self
            .store
            .periods
            .find_all()
            .map_err(|err| format!("could not list periods: {err}"))?
            .into_iter()
            .map(|period| (period.id, period))
            .collect();

        let allocations = self
            .allocations
            .all()
            .map_err(|err| format!("could not list allocations: {err}"))?;
        let duplicate = allocations.iter().any(|allocation| {
            allocation.project == project.id
                && allocation.student == student.id
                && periods.get(&allocation.period).is_some_and(|period| {
                    period.begin == candidate.begin && period.end == candidate.end
                })
        });

        if !duplicate {
            self.allocations
                .set(
                    SaveIntent::Create,
                    AllocationDraft {
                        project: project.id,
                        student: student.id,
                        period: OwnedPeriodDraft::create(candidate),
                    },
                )
                .map_err(|err| {
                    format!(
                        "could not allocate {} {} to {project_name}: {err}",
                        row.first_name, row.last_name
                    )
                })?;
        }

        Ok(())
    }
}
