use chrono::NaiveDate;
use csv::StringRecord;

// Fixed column order of the upload format:
// first name, last name, employment, allocation begin/end, project name,
// project begin/end.
const COL_FIRST_NAME: usize = 0;
const COL_LAST_NAME: usize = 1;
const COL_EMPLOYMENT: usize = 2;
const COL_ALLOCATION_BEGIN: usize = 3;
const COL_ALLOCATION_END: usize = 4;
const COL_PROJECT_NAME: usize = 5;
const COL_PROJECT_BEGIN: usize = 6;
const COL_PROJECT_END: usize = 7;

/// One row's extracted fields. Built fresh per row; nothing carries over
/// between iterations.
#[derive(Debug, Default, Clone)]
pub(crate) struct RowDraft {
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) employment_name: Option<String>,
    pub(crate) allocation_begin: Option<NaiveDate>,
    pub(crate) allocation_end: Option<NaiveDate>,
    pub(crate) project_name: Option<String>,
    pub(crate) project_begin: Option<NaiveDate>,
    pub(crate) project_end: Option<NaiveDate>,
}

/// A row that passed the completeness gate and may be reconciled.
/// The project name is not part of the gate; resolving it can still fail
/// later with a per-row diagnostic.
#[derive(Debug, Clone)]
pub(crate) struct CompleteRow {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) employment_name: String,
    pub(crate) project_name: Option<String>,
    pub(crate) project_begin: NaiveDate,
    pub(crate) project_end: NaiveDate,
}

impl RowDraft {
    /// Rows missing a name or any date are dropped without a diagnostic;
    /// partially filled exports are expected dirty data, not an error.
    /// The allocation dates gate completeness even though the stored
    /// allocation ends up carrying the project span.
    pub(crate) fn into_complete(self) -> Option<CompleteRow> {
        self.allocation_begin?;
        self.allocation_end?;
        Some(CompleteRow {
            first_name: self.first_name?,
            last_name: self.last_name?,
            employment_name: self.employment_name?,
            project_name: self.project_name,
            project_begin: self.project_begin?,
            project_end: self.project_end?,
        })
    }
}

/// Extracts the positional fields of one record. Unparseable date cells stay
/// unset and are reported by row and column.
pub(crate) fn extract_row(row_number: usize, record: &StringRecord) -> (RowDraft, Vec<String>) {
    let mut issues = Vec::new();
    let mut draft = RowDraft::default();

    draft.first_name = text_cell(record, COL_FIRST_NAME);
    draft.last_name = text_cell(record, COL_LAST_NAME);
    draft.employment_name = text_cell(record, COL_EMPLOYMENT);
    draft.project_name = text_cell(record, COL_PROJECT_NAME);

    for (column, slot) in [
        (COL_ALLOCATION_BEGIN, &mut draft.allocation_begin),
        (COL_ALLOCATION_END, &mut draft.allocation_end),
        (COL_PROJECT_BEGIN, &mut draft.project_begin),
        (COL_PROJECT_END, &mut draft.project_end),
    ] {
        match date_cell(record, column) {
            Ok(value) => *slot = value,
            Err(message) => {
                issues.push(format!("Row: {row_number}, Column: {column}: {message}"));
            }
        }
    }

    (draft, issues)
}

fn text_cell(record: &StringRecord, column: usize) -> Option<String> {
    record
        .get(column)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn date_cell(record: &StringRecord, column: usize) -> Result<Option<NaiveDate>, String> {
    let Some(raw) = record.get(column).map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    parse_date(raw)
        .map(Some)
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}
