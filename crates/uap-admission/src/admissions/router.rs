use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, ApplicationSubmission, Department, FileSlot};
use super::lifecycle::AdmissionService;
use super::merit::{self, MeritWeights};
use super::repository::ApplicationStatusView;
use super::staging::StagingError;
use crate::error::AppError;
use crate::storage::KeyValueStore;
use crate::tuition::{TuitionQuote, TuitionRequest};

/// Router builder exposing the admission portal over HTTP.
pub fn admission_router<S>(service: Arc<AdmissionService<S>>) -> Router
where
    S: KeyValueStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(submit_handler::<S>).get(list_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<S>).delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/accept",
            post(accept_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/payment",
            post(payment_handler::<S>).get(payment_status_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/receipt",
            get(receipt_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/files/:slot",
            get(file_handler::<S>),
        )
        .route(
            "/api/v1/departments/:department/applications",
            get(department_handler::<S>),
        )
        .route("/api/v1/seats", get(seats_handler::<S>))
        .route("/api/v1/merit", get(merit_handler::<S>))
        .route("/api/v1/merit.csv", get(merit_csv_handler::<S>))
        .route("/api/v1/tuition/quote", post(tuition_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .with_state(service)
}

/// Request body cap: every document slot at its size limit in base64, plus the form fields.
pub const MAX_REQUEST_BODY: usize = (FileSlot::Photo.max_size()
    + FileSlot::Signature.max_size()
    + FileSlot::Transcript.max_size()) as usize
    * 4
    / 3
    + 1024 * 1024;

/// Optional weight overrides; missing values fall back to the configured weights.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MeritQuery {
    pub gpa: Option<f64>,
    pub exam: Option<f64>,
}

/// Run a service call on the blocking pool; the store does synchronous file I/O.
async fn blocking<S, T, F>(service: Arc<AdmissionService<S>>, work: F) -> Result<T, AppError>
where
    S: KeyValueStore + 'static,
    T: Send + 'static,
    F: FnOnce(&AdmissionService<S>) -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(service.as_ref())).await?
}

fn not_found(id: &ApplicationId) -> Response {
    let payload = json!({
        "error": format!("application {id} not found"),
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Json(submission): Json<ApplicationSubmission>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let record = blocking(service, move |service| Ok(service.submit(submission)?)).await?;
    Ok((StatusCode::CREATED, Json(record.status_view())).into_response())
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let records = blocking(service, |service| Ok(service.list()?)).await?;
    let views: Vec<ApplicationStatusView> =
        records.iter().map(|record| record.status_view()).collect();
    Ok(Json(views).into_response())
}

pub(crate) async fn status_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let lookup = id.clone();
    match blocking(service, move |service| Ok(service.get(&lookup)?)).await? {
        Some(record) => Ok(Json(record.status_view()).into_response()),
        None => Ok(not_found(&id)),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let target = id.clone();
    match blocking(service, move |service| Ok(service.delete(&target)?)).await? {
        Some(record) => Ok(Json(json!({ "deleted": record.status_view() })).into_response()),
        None => Ok(not_found(&id)),
    }
}

pub(crate) async fn accept_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let target = id.clone();
    match blocking(service, move |service| Ok(service.accept(&target)?)).await? {
        Some(acceptance) => {
            let payload = json!({
                "application": acceptance.record.status_view(),
                "seats_left": acceptance.seats_left,
            });
            Ok(Json(payload).into_response())
        }
        None => Ok(not_found(&id)),
    }
}

pub(crate) async fn reject_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let target = id.clone();
    match blocking(service, move |service| Ok(service.reject(&target)?)).await? {
        Some(record) => Ok(Json(record.status_view()).into_response()),
        None => Ok(not_found(&id)),
    }
}

pub(crate) async fn payment_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let target = id.clone();
    match blocking(service, move |service| Ok(service.begin_payment(&target)?)).await? {
        Some(record) => Ok((StatusCode::ACCEPTED, Json(record.status_view())).into_response()),
        None => Ok(not_found(&id)),
    }
}

pub(crate) async fn payment_status_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let lookup = id.clone();
    let found = blocking(service, move |service| {
        let Some(record) = service.get(&lookup)? else {
            return Ok(None);
        };
        let progress = service
            .payments()
            .active()
            .into_iter()
            .find(|session| session.application_id == lookup)
            .map(|session| session.progress);
        Ok(Some((record, progress)))
    })
    .await?;
    let Some((record, progress)) = found else {
        return Ok(not_found(&id));
    };

    let payload = json!({
        "application_id": id,
        "status": record.status().label(),
        "progress": progress,
        "paid_at": record.paid_at(),
    });
    Ok(Json(payload).into_response())
}

pub(crate) async fn receipt_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let lookup = id.clone();
    let Some(record) = blocking(service, move |service| Ok(service.get(&lookup)?)).await? else {
        return Ok(not_found(&id));
    };

    match record.receipt() {
        Some(receipt) => Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{id}_receipt.txt\""),
                ),
            ],
            receipt.to_string(),
        )
            .into_response()),
        None => {
            let payload = json!({
                "error": format!("application {id} has no receipt yet"),
                "status": record.status().label(),
            });
            Ok((StatusCode::NOT_FOUND, Json(payload)).into_response())
        }
    }
}

pub(crate) async fn file_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path((application_id, slot)): Path<(String, String)>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let id = ApplicationId(application_id);
    let slot: FileSlot = match slot.parse() {
        Ok(slot) => slot,
        Err(message) => {
            return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response())
        }
    };

    let lookup = id.clone();
    let Some(record) = blocking(service, move |service| Ok(service.get(&lookup)?)).await? else {
        return Ok(not_found(&id));
    };
    let Some(file) = record.files.get(slot) else {
        let payload = json!({
            "error": format!("application {id} has no {} on file", slot.label()),
        });
        return Ok((StatusCode::NOT_FOUND, Json(payload)).into_response());
    };

    let bytes = file
        .decode()
        .map_err(|source| StagingError::Encoding { slot, source })?;
    Ok((
        [
            (header::CONTENT_TYPE, file.media_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", header_safe(&file.name)),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '"' || c == '\\' || !(c.is_ascii_graphic() || c == ' ') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

pub(crate) async fn department_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Path(department): Path<String>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let department: Department = match department.parse() {
        Ok(department) => department,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return Ok((StatusCode::NOT_FOUND, Json(payload)).into_response());
        }
    };

    let (records, seats_left) = blocking(service, move |service| {
        Ok((
            service.list_by_department(department)?,
            service.remaining_seats(department)?,
        ))
    })
    .await?;
    let views: Vec<ApplicationStatusView> =
        records.iter().map(|record| record.status_view()).collect();
    Ok(Json(json!({
        "department": department,
        "seats_left": seats_left,
        "applications": views,
    }))
    .into_response())
}

pub(crate) async fn seats_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let seats = blocking(service, |service| Ok(service.seats()?)).await?;
    Ok(Json(seats).into_response())
}

fn resolve_weights<S>(
    service: &AdmissionService<S>,
    query: MeritQuery,
) -> Result<MeritWeights, AppError>
where
    S: KeyValueStore + 'static,
{
    let configured = service.merit_weights();
    Ok(MeritWeights::new(
        query.gpa.unwrap_or(configured.gpa()),
        query.exam.unwrap_or(configured.exam()),
    )?)
}

pub(crate) async fn merit_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Query(query): Query<MeritQuery>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let weights = resolve_weights(service.as_ref(), query)?;
    let rows = blocking(service, move |service| Ok(service.merit(Some(weights))?)).await?;
    Ok(Json(json!({ "weights": weights, "rows": rows })).into_response())
}

pub(crate) async fn merit_csv_handler<S>(
    State(service): State<Arc<AdmissionService<S>>>,
    Query(query): Query<MeritQuery>,
) -> Result<Response, AppError>
where
    S: KeyValueStore + 'static,
{
    let weights = resolve_weights(service.as_ref(), query)?;
    let rows = blocking(service, move |service| Ok(service.merit(Some(weights))?)).await?;

    let mut body = Vec::new();
    merit::write_csv(&rows, &mut body)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"merit_list.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

pub(crate) async fn tuition_handler(
    Json(request): Json<TuitionRequest>,
) -> Result<Response, AppError> {
    let quote = TuitionQuote::try_from(request)?;
    Ok(Json(quote).into_response())
}
