use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::attachment::AttachmentError;
use super::domain::ComparisonOperator;
use super::engine::{AdjudicationError, RowEdit};
use super::registry::{CriteriaRegistry, RegistryError};
use super::service::{AdjudicationService, CurationServiceError};

/// Acknowledgement body required before an irreversible transition.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateOptionRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentSelectionRequest {
    pub value_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentValueRequest {
    pub operator: ComparisonOperator,
    pub value_string: String,
    pub unit_id: i64,
}

/// Router builder exposing the adjudication surface.
pub fn adjudication_router<R>(service: Arc<AdjudicationService<R>>) -> Router
where
    R: CriteriaRegistry + 'static,
{
    Router::new()
        .route("/api/v1/adjudication/load", post(load_handler::<R>))
        .route("/api/v1/adjudication/studies", get(studies_handler::<R>))
        .route(
            "/api/v1/adjudication/studies/:eligibility_criteria_id/select",
            post(select_study_handler::<R>),
        )
        .route("/api/v1/adjudication/criteria", get(grouped_handler::<R>))
        .route(
            "/api/v1/adjudication/criteria/unassigned",
            get(unassigned_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/edit",
            post(edit_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/save",
            post(save_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/publish",
            post(publish_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/accept",
            post(accept_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/values",
            post(create_option_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/attachment",
            get(attachment_view_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/attachment/selection",
            post(attachment_selection_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/attachment/save",
            post(attachment_save_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/attachment/publish",
            post(attachment_publish_handler::<R>),
        )
        .route(
            "/api/v1/adjudication/criteria/:id/attachment/values",
            post(attachment_value_handler::<R>),
        )
        .with_state(service)
}

async fn load_handler<R>(State(service): State<Arc<AdjudicationService<R>>>) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.load().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "loaded" }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn studies_handler<R>(State(service): State<Arc<AdjudicationService<R>>>) -> Response
where
    R: CriteriaRegistry + 'static,
{
    (StatusCode::OK, Json(service.studies())).into_response()
}

async fn select_study_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(eligibility_criteria_id): Path<i64>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.select_study(eligibility_criteria_id).await {
        Ok(grouped) => (StatusCode::OK, Json(grouped)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn grouped_handler<R>(State(service): State<Arc<AdjudicationService<R>>>) -> Response
where
    R: CriteriaRegistry + 'static,
{
    (StatusCode::OK, Json(service.grouped().await)).into_response()
}

async fn unassigned_handler<R>(State(service): State<Arc<AdjudicationService<R>>>) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.unassigned_criteria().await {
        Ok(criteria) => (StatusCode::OK, Json(criteria)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn edit_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    Json(edit): Json<RowEdit>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.edit(id, edit).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn save_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.save(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn publish_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    body: Option<Json<ConfirmRequest>>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    let confirm = body.map(|Json(body)| body.confirm).unwrap_or_default();
    match service.publish(id, confirm).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn accept_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    body: Option<Json<ConfirmRequest>>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    let confirm = body.map(|Json(body)| body.confirm).unwrap_or_default();
    match service.accept(id, confirm).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_option_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    Json(body): Json<CreateOptionRequest>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.create_option(id, &body.label).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn attachment_view_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.attachment_view(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn attachment_selection_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    Json(body): Json<AttachmentSelectionRequest>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.attachment_set(id, body.value_ids).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn attachment_save_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service.attachment_save(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn attachment_publish_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    body: Option<Json<ConfirmRequest>>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    let confirm = body.map(|Json(body)| body.confirm).unwrap_or_default();
    match service.attachment_publish(id, confirm).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn attachment_value_handler<R>(
    State(service): State<Arc<AdjudicationService<R>>>,
    Path(id): Path<i64>,
    Json(body): Json<AttachmentValueRequest>,
) -> Response
where
    R: CriteriaRegistry + 'static,
{
    match service
        .attachment_add_value(id, body.operator, &body.value_string, body.unit_id)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Map workflow errors onto the HTTP taxonomy: guard violations are 422,
/// conflicts are 409 with their distinct messages, registry failures are
/// 502, and only the initial bulk load earns a page-level 503 with a retry
/// hint.
fn error_response(err: CurationServiceError) -> Response {
    let status = match &err {
        CurationServiceError::RowNotFound(_) => StatusCode::NOT_FOUND,
        CurationServiceError::UnknownUnit(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CurationServiceError::Load(_) => StatusCode::SERVICE_UNAVAILABLE,
        CurationServiceError::Adjudication(err) => adjudication_status(err),
        CurationServiceError::Attachment(err) => attachment_status(err),
        CurationServiceError::Registry(err) => registry_status(err),
    };

    let body = if status == StatusCode::SERVICE_UNAVAILABLE {
        json!({ "error": err.to_string(), "retry": true })
    } else {
        json!({ "error": err.to_string() })
    };
    (status, Json(body)).into_response()
}

fn adjudication_status(err: &AdjudicationError) -> StatusCode {
    match err {
        AdjudicationError::CodeConflict
        | AdjudicationError::ValueConflict
        | AdjudicationError::RequestInFlight => StatusCode::CONFLICT,
        AdjudicationError::Registry(err) => registry_status(err),
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn attachment_status(err: &AttachmentError) -> StatusCode {
    match err {
        AttachmentError::ValueConflict | AttachmentError::RequestInFlight => StatusCode::CONFLICT,
        AttachmentError::Registry(err) => registry_status(err),
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn registry_status(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::Conflict => StatusCode::CONFLICT,
        RegistryError::NotFound => StatusCode::NOT_FOUND,
        RegistryError::Rejected(_) | RegistryError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}
