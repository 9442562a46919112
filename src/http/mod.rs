//! HTTP boundary: thin handlers mapping verbs onto the service operations
//! and service outcomes onto status codes. PUT creates (any id in the body
//! is discarded), PATCH updates an existing record, DELETE returns the
//! removed record.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{
    AllocationDraft, AllocationId, EmploymentDraft, EmploymentId, OwnedPeriodDraft, PeriodId,
    PeriodSpan, ProjectDraft, ProjectId, SaveIntent, StudentDraft, StudentId,
};
use crate::import::FileImporter;
use crate::services::{
    AllocationService, EmploymentService, PeriodService, ProjectService, ServiceError,
    StudentService,
};
use crate::store::Datastore;

/// All services the handlers reach, cloned into the router state.
#[derive(Clone)]
pub struct AppServices {
    pub periods: PeriodService,
    pub employments: EmploymentService,
    pub students: StudentService,
    pub projects: ProjectService,
    pub allocations: AllocationService,
    pub importer: Arc<FileImporter>,
}

impl AppServices {
    pub fn new(store: Datastore) -> Self {
        Self {
            periods: PeriodService::new(store.clone()),
            employments: EmploymentService::new(store.clone()),
            students: StudentService::new(store.clone()),
            projects: ProjectService::new(store.clone()),
            allocations: AllocationService::new(store.clone()),
            importer: Arc::new(FileImporter::new(store)),
        }
    }
}

pub fn api_router(services: AppServices) -> Router {
    Router::new()
        .route(
            "/api/period",
            get(list_periods).put(create_period).patch(update_period),
        )
        .route("/api/period/:id", get(get_period).delete(delete_period))
        .route(
            "/api/employment",
            get(list_employments)
                .put(create_employment)
                .patch(update_employment),
        )
        .route(
            "/api/employment/:id",
            get(get_employment).delete(delete_employment),
        )
        .route(
            "/api/student",
            get(list_students).put(create_student).patch(update_student),
        )
        .route("/api/student/:id", get(get_student).delete(delete_student))
        .route(
            "/api/project",
            get(list_projects).put(create_project).patch(update_project),
        )
        .route("/api/project/:id", get(get_project).delete(delete_project))
        .route(
            "/api/allocation",
            get(list_allocations)
                .put(create_allocation)
                .patch(update_allocation),
        )
        .route(
            "/api/allocation/:id",
            get(get_allocation).delete(delete_allocation),
        )
        .route("/api/file", post(import_file))
        .with_state(services)
}

fn error_response(err: &ServiceError) -> Response {
    let status = match err {
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::CONFLICT,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn missing_id_response() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({ "error": "an update requires an id" })),
    )
        .into_response()
}

fn respond<T: serde::Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// Writes answer 409 for every rejection, including unresolved references;
/// 404 is reserved for lookups and deletes of absent records.
fn write_respond<T: serde::Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(ServiceError::Store(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

/// Wire shape shared by the standalone period endpoints and the periods
/// embedded in project and allocation payloads. An id means "update that
/// period", its absence means "create one".
#[derive(Debug, Deserialize)]
struct PeriodPayload {
    #[serde(default)]
    id: Option<PeriodId>,
    begin: NaiveDate,
    end: NaiveDate,
}

impl PeriodPayload {
    fn span(&self) -> PeriodSpan {
        PeriodSpan::new(self.begin, self.end)
    }

    fn owned_draft(&self) -> OwnedPeriodDraft {
        OwnedPeriodDraft {
            intent: match self.id {
                Some(id) => SaveIntent::Update(id),
                None => SaveIntent::Create,
            },
            span: self.span(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmploymentPayload {
    #[serde(default)]
    id: Option<EmploymentId>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct StudentPayload {
    #[serde(default)]
    id: Option<StudentId>,
    first_name: String,
    last_name: String,
    employment: EmploymentId,
}

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    #[serde(default)]
    id: Option<ProjectId>,
    name: String,
    period: PeriodPayload,
}

#[derive(Debug, Deserialize)]
struct AllocationPayload {
    #[serde(default)]
    id: Option<AllocationId>,
    project: ProjectId,
    student: StudentId,
    period: PeriodPayload,
}

// Period

async fn list_periods(State(services): State<AppServices>) -> Response {
    respond(services.periods.all())
}

async fn get_period(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.periods.get(PeriodId(id)))
}

async fn create_period(
    State(services): State<AppServices>,
    Json(payload): Json<PeriodPayload>,
) -> Response {
    write_respond(services.periods.set(SaveIntent::Create, payload.span()))
}

async fn update_period(
    State(services): State<AppServices>,
    Json(payload): Json<PeriodPayload>,
) -> Response {
    let Some(id) = payload.id else {
        return missing_id_response();
    };
    write_respond(services.periods.set(SaveIntent::Update(id), payload.span()))
}

async fn delete_period(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    // Blocked period deletes answer 400, unlike every other entity.
    match services.periods.delete(PeriodId(id)) {
        Ok(period) => (StatusCode::OK, Json(period)).into_response(),
        Err(err @ ServiceError::ReferentialConflict { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

// Employment

async fn list_employments(State(services): State<AppServices>) -> Response {
    respond(services.employments.all())
}

async fn get_employment(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.employments.get(EmploymentId(id)))
}

async fn create_employment(
    State(services): State<AppServices>,
    Json(payload): Json<EmploymentPayload>,
) -> Response {
    let draft = EmploymentDraft { name: payload.name };
    write_respond(services.employments.set(SaveIntent::Create, draft))
}

async fn update_employment(
    State(services): State<AppServices>,
    Json(payload): Json<EmploymentPayload>,
) -> Response {
    let Some(id) = payload.id else {
        return missing_id_response();
    };
    let draft = EmploymentDraft { name: payload.name };
    write_respond(services.employments.set(SaveIntent::Update(id), draft))
}

async fn delete_employment(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.employments.delete(EmploymentId(id)))
}

// Student

async fn list_students(State(services): State<AppServices>) -> Response {
    respond(services.students.all())
}

async fn get_student(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.students.get(StudentId(id)))
}

async fn create_student(
    State(services): State<AppServices>,
    Json(payload): Json<StudentPayload>,
) -> Response {
    let draft = StudentDraft {
        first_name: payload.first_name,
        last_name: payload.last_name,
        employment: payload.employment,
    };
    write_respond(services.students.set(SaveIntent::Create, draft))
}

async fn update_student(
    State(services): State<AppServices>,
    Json(payload): Json<StudentPayload>,
) -> Response {
    let Some(id) = payload.id else {
        return missing_id_response();
    };
    let draft = StudentDraft {
        first_name: payload.first_name,
        last_name: payload.last_name,
        employment: payload.employment,
    };
    write_respond(services.students.set(SaveIntent::Update(id), draft))
}

async fn delete_student(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.students.delete(StudentId(id)))
}

// Project

async fn list_projects(State(services): State<AppServices>) -> Response {
    respond(services.projects.all())
}

async fn get_project(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.projects.get(ProjectId(id)))
}

async fn create_project(
    State(services): State<AppServices>,
    Json(payload): Json<ProjectPayload>,
) -> Response {
    let draft = ProjectDraft {
        name: payload.name,
        period: payload.period.owned_draft(),
    };
    write_respond(services.projects.set(SaveIntent::Create, draft))
}

async fn update_project(
    State(services): State<AppServices>,
    Json(payload): Json<ProjectPayload>,
) -> Response {
    let Some(id) = payload.id else {
        return missing_id_response();
    };
    let draft = ProjectDraft {
        name: payload.name,
        period: payload.period.owned_draft(),
    };
    write_respond(services.projects.set(SaveIntent::Update(id), draft))
}

async fn delete_project(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.projects.delete(ProjectId(id)))
}

// Allocation

async fn list_allocations(State(services): State<AppServices>) -> Response {
    respond(services.allocations.all())
}

async fn get_allocation(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.allocations.get(AllocationId(id)))
}

async fn create_allocation(
    State(services): State<AppServices>,
    Json(payload): Json<AllocationPayload>,
) -> Response {
    let draft = AllocationDraft {
        project: payload.project,
        student: payload.student,
        period: payload.period.owned_draft(),
    };
    write_respond(services.allocations.set(SaveIntent::Create, draft))
}

async fn update_allocation(
    State(services): State<AppServices>,
    Json(payload): Json<AllocationPayload>,
) -> Response {
    let Some(id) = payload.id else {
        return missing_id_response();
    };
    let draft = AllocationDraft {
        project: payload.project,
        student: payload.student,
        period: payload.period.owned_draft(),
    };
    write_respond(services.allocations.set(SaveIntent::Update(id), draft))
}

async fn delete_allocation(State(services): State<AppServices>, Path(id): Path<i64>) -> Response {
    respond(services.allocations.delete(AllocationId(id)))
}

// File import

async fn import_file(
    State(services): State<AppServices>,
    mut multipart: Multipart,
) -> Response {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                return match field.bytes().await {
                    Ok(bytes) => {
                        let report = services.importer.import_reader(bytes.as_ref());
                        (StatusCode::OK, Json(report)).into_response()
                    }
                    Err(_) => upload_failed(),
                };
            }
            Ok(None) => return upload_failed(),
            Err(_) => return upload_failed(),
        }
    }
}

fn upload_failed() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({ "error": "Upload failed" })),
    )
        .into_response()
}
