//! Router-level specifications: verb semantics (PUT creates, PATCH updates)
//! and the status mapping for not-found, validation, and blocked deletes.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use student_manager::http::{api_router, AppServices};
use student_manager::store::Datastore;

fn build_router() -> Router {
    api_router(AppServices::new(Datastore::in_memory()))
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn dispatch(router: &Router, request: Request<Body>) -> axum::response::Response {
    router.clone().oneshot(request).await.expect("dispatch")
}

#[tokio::test]
async fn put_period_creates_and_get_returns_it() {
    let router = build_router();

    let response = dispatch(
        &router,
        json_request(
            "PUT",
            "/api/period",
            json!({ "begin": "2024-01-01", "end": "2024-01-31" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let id = created.get("id").and_then(Value::as_i64).expect("id");
    assert!(id > 0);

    let response = dispatch(&router, empty_request("GET", &format!("/api/period/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched.get("begin"), Some(&json!("2024-01-01")));
}

#[tokio::test]
async fn put_rejects_a_reversed_period() {
    let router = build_router();
    let response = dispatch(
        &router,
        json_request(
            "PUT",
            "/api/period",
            json!({ "begin": "2024-02-01", "end": "2024-01-01" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn get_of_a_missing_record_is_not_found() {
    let router = build_router();
    let response = dispatch(&router, empty_request("GET", "/api/period/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_requires_an_id() {
    let router = build_router();
    let response = dispatch(
        &router,
        json_request(
            "PATCH",
            "/api/period",
            json!({ "begin": "2024-01-01", "end": "2024-01-31" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn patch_updates_an_existing_record() {
    let router = build_router();
    let created = body_json(
        dispatch(
            &router,
            json_request(
                "PUT",
                "/api/period",
                json!({ "begin": "2024-01-01", "end": "2024-01-31" }),
            ),
        )
        .await,
    )
    .await;
    let id = created.get("id").and_then(Value::as_i64).expect("id");

    let response = dispatch(
        &router,
        json_request(
            "PATCH",
            "/api/period",
            json!({ "id": id, "begin": "2024-01-01", "end": "2024-03-31" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated.get("end"), Some(&json!("2024-03-31")));
    assert_eq!(updated.get("id"), Some(&json!(id)));
}

#[tokio::test]
async fn patch_of_a_missing_record_conflicts() {
    let router = build_router();
    let response = dispatch(
        &router,
        json_request(
            "PATCH",
            "/api/period",
            json!({ "id": 99, "begin": "2024-01-01", "end": "2024-03-31" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn put_ignores_an_id_in_the_body() {
    let router = build_router();
    let created = body_json(
        dispatch(
            &router,
            json_request(
                "PUT",
                "/api/period",
                json!({ "id": 777, "begin": "2024-01-01", "end": "2024-01-31" }),
            ),
        )
        .await,
    )
    .await;
    assert_ne!(created.get("id"), Some(&json!(777)));
}

#[tokio::test]
async fn blocked_period_delete_answers_bad_request() {
    let router = build_router();
    let project = body_json(
        dispatch(
            &router,
            json_request(
                "PUT",
                "/api/project",
                json!({
                    "name": "Alpha",
                    "period": { "begin": "2024-01-01", "end": "2024-01-31" }
                }),
            ),
        )
        .await,
    )
    .await;
    let period_id = project.get("period").and_then(Value::as_i64).expect("id");

    let response = dispatch(
        &router,
        empty_request("DELETE", &format!("/api/period/{period_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The period is still there.
    let response = dispatch(
        &router,
        empty_request("GET", &format!("/api/period/{period_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocked_employment_delete_conflicts() {
    let router = build_router();
    let employment = body_json(
        dispatch(
            &router,
            json_request("PUT", "/api/employment", json!({ "name": "Intern" })),
        )
        .await,
    )
    .await;
    let employment_id = employment.get("id").and_then(Value::as_i64).expect("id");

    let response = dispatch(
        &router,
        json_request(
            "PUT",
            "/api/student",
            json!({
                "first_name": "Ann",
                "last_name": "Lee",
                "employment": employment_id
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = dispatch(
        &router,
        empty_request("DELETE", &format!("/api/employment/{employment_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_of_a_missing_record_is_not_found() {
    let router = build_router();
    let response = dispatch(&router, empty_request("DELETE", "/api/student/9")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_write_with_unknown_employment_conflicts() {
    let router = build_router();
    let response = dispatch(
        &router,
        json_request(
            "PUT",
            "/api/student",
            json!({
                "first_name": "Ann",
                "last_name": "Lee",
                "employment": 1234
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn allocation_is_clamped_on_the_way_in() {
    let router = build_router();
    let employment = body_json(
        dispatch(
            &router,
            json_request("PUT", "/api/employment", json!({ "name": "Intern" })),
        )
        .await,
    )
    .await;
    let student = body_json(
        dispatch(
            &router,
            json_request(
                "PUT",
                "/api/student",
                json!({
                    "first_name": "Ann",
                    "last_name": "Lee",
                    "employment": employment.get("id").and_then(Value::as_i64).expect("id")
                }),
            ),
        )
        .await,
    )
    .await;
    let project = body_json(
        dispatch(
            &router,
            json_request(
                "PUT",
                "/api/project",
                json!({
                    "name": "Alpha",
                    "period": { "begin": "2024-01-01", "end": "2024-01-31" }
                }),
            ),
        )
        .await,
    )
    .await;

    let response = dispatch(
        &router,
        json_request(
            "PUT",
            "/api/allocation",
            json!({
                "project": project.get("id").and_then(Value::as_i64).expect("id"),
                "student": student.get("id").and_then(Value::as_i64).expect("id"),
                "period": { "begin": "2023-12-01", "end": "2024-02-15" }
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let allocation = body_json(response).await;
    let period_id = allocation
        .get("period")
        .and_then(Value::as_i64)
        .expect("period id");

    let period = body_json(
        dispatch(
            &router,
            empty_request("GET", &format!("/api/period/{period_id}")),
        )
        .await,
    )
    .await;
    assert_eq!(period.get("begin"), Some(&json!("2024-01-01")));
    assert_eq!(period.get("end"), Some(&json!("2024-01-31")));
}

#[tokio::test]
async fn upload_returns_a_quoted_report() {
    let router = build_router();
    let boundary = "import-test-boundary";
    let csv = "first_name,last_name,employment,allocation_begin,allocation_end,project_name,project_begin,project_end\n\
               Ann,Lee,Working Student,2024-01-05,2024-01-20,Alpha,2024-01-01,2024-01-31\n";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"export.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/file")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");

    let response = dispatch(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    // The handler answers with a JSON-quoted report string.
    let report: String = serde_json::from_slice(&bytes).expect("quoted report");
    assert!(report.ends_with("Upload Success!"), "report: {report}");

    // The imported student is now served by the regular endpoints.
    let students = body_json(dispatch(&router, empty_request("GET", "/api/student")).await).await;
    assert_eq!(students.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn upload_without_a_file_field_conflicts() {
    let router = build_router();
    let boundary = "import-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"notes\"\r\n\r\n\
         hello\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/file")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");

    let response = dispatch(&router, request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
