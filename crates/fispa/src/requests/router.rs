use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::access::{AccessPolicy, ADMIN_TOKEN_HEADER};
use super::domain::{RequestId, RequestSubmission};
use super::export::EXPORT_FILE_NAME;
use super::reporting::RequestReporting;
use super::service::{IntakeServiceError, RequestIntakeService, DEFAULT_TOP_SUBMITTERS};
use super::store::{RequestStore, StoreError};

/// Largest request body accepted. Photos arrive base64 encoded inside the JSON
/// submission, so this covers raw images of roughly 18 MB.
pub const MAX_SUBMISSION_BYTES: usize = 25 * 1024 * 1024;

/// Shared handler state: the service plus the staff access check.
pub struct IntakeState<S, P> {
    pub service: Arc<RequestIntakeService<S>>,
    pub access: Arc<P>,
}

impl<S, P> Clone for IntakeState<S, P> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            access: self.access.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub top: Option<usize>,
}

/// Router builder exposing the public intake form and the staff endpoints.
pub fn request_router<S, P>(service: Arc<RequestIntakeService<S>>, access: Arc<P>) -> Router
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    Router::new()
        .route(
            "/api/v1/requests",
            post(submit_handler::<S, P>).get(listing_handler::<S, P>),
        )
        .route("/api/v1/requests/:request_id", get(detail_handler::<S, P>))
        .route(
            "/api/v1/requests/:request_id/photo",
            get(photo_handler::<S, P>),
        )
        .route(
            "/api/v1/requests/:request_id/status",
            patch(status_handler::<S, P>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<S, P>))
        .route("/api/v1/exports/requests.csv", get(export_handler::<S, P>))
        .layer(DefaultBodyLimit::max(MAX_SUBMISSION_BYTES))
        .with_state(IntakeState { service, access })
}

pub(crate) async fn submit_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    Json(submission): Json<RequestSubmission>,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    // Photo decoding and the insert both block.
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || service.submit(submission)).await {
        Ok(Ok(request)) => (StatusCode::CREATED, Json(request.view())).into_response(),
        Ok(Err(other)) => error_response(other),
        Err(join_error) => {
            tracing::error!(error = %join_error, "submission task failed");
            let payload = json!({ "error": "submission could not be processed" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn listing_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(denied) = authorize(state.access.as_ref(), &headers) {
        return denied;
    }

    match state.service.listing() {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(other) => error_response(other),
    }
}

pub(crate) async fn detail_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    headers: HeaderMap,
    Path(request_id): Path<i64>,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(denied) = authorize(state.access.as_ref(), &headers) {
        return denied;
    }

    match state.service.get(RequestId(request_id)) {
        Ok(request) => (StatusCode::OK, Json(request.view())).into_response(),
        Err(other) => error_response(other),
    }
}

pub(crate) async fn photo_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    headers: HeaderMap,
    Path(request_id): Path<i64>,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(denied) = authorize(state.access.as_ref(), &headers) {
        return denied;
    }

    match state.service.get(RequestId(request_id)) {
        Ok(request) => match request.photo {
            Some(photo) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "image/jpeg")],
                photo,
            )
                .into_response(),
            None => {
                let payload = json!({
                    "error": format!("request {request_id} has no photo"),
                });
                (StatusCode::NOT_FOUND, Json(payload)).into_response()
            }
        },
        Err(other) => error_response(other),
    }
}

pub(crate) async fn status_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    headers: HeaderMap,
    Path(request_id): Path<i64>,
    Json(change): Json<StatusChange>,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(denied) = authorize(state.access.as_ref(), &headers) {
        return denied;
    }

    match state
        .service
        .update_status(RequestId(request_id), &change.status)
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(other) => error_response(other),
    }
}

pub(crate) async fn dashboard_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    Query(query): Query<DashboardQuery>,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    let top = query.top.unwrap_or(DEFAULT_TOP_SUBMITTERS);
    match state.service.dashboard(top) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(other) => error_response(other),
    }
}

pub(crate) async fn export_handler<S, P>(
    State(state): State<IntakeState<S, P>>,
    headers: HeaderMap,
) -> Response
where
    S: RequestStore + RequestReporting + 'static,
    P: AccessPolicy + 'static,
{
    if let Err(denied) = authorize(state.access.as_ref(), &headers) {
        return denied;
    }

    match state.service.export_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(other) => error_response(other),
    }
}

fn authorize<P: AccessPolicy + ?Sized>(access: &P, headers: &HeaderMap) -> Result<(), Response> {
    let credential = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if access.allows(credential) {
        Ok(())
    } else {
        let payload = json!({ "error": "staff credential required" });
        Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
    }
}

fn error_response(error: IntakeServiceError) -> Response {
    match error {
        IntakeServiceError::Validation(errors) => {
            let violations: Vec<_> = errors
                .iter()
                .map(|violation| {
                    json!({
                        "field": violation.field(),
                        "message": violation.to_string(),
                    })
                })
                .collect();
            let payload = json!({
                "error": "submission rejected",
                "violations": violations,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        IntakeServiceError::InvalidStatus(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        IntakeServiceError::Store(StoreError::NotFound(id)) => {
            let payload = json!({ "error": format!("request {id} not found") });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        other => {
            tracing::error!(error = %other, "request desk operation failed");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
