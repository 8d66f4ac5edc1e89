//! Approval request route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use domain::models::{
    ActionCommentBody, ApprovalRequest, ApproveRequestBody, ListRequestsQuery, RequestPage,
    SubmitRequestBody, SYSTEM_USER_ID,
};
use shared::error::AppError;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ActingUser;
use crate::middleware::record_transition;

fn record_outcome<T>(action: &'static str, result: &Result<T, AppError>) {
    record_transition(action, if result.is_ok() { "ok" } else { "error" });
}

/// Decisions are made by people. The system identity drives revocation and
/// cancellation, never approval, so it is refused before the engine runs.
fn reject_system_identity(user: &ActingUser) -> Result<(), ApiError> {
    if user.id == SYSTEM_USER_ID {
        return Err(ApiError(AppError::forbidden(
            "The system identity cannot approve or reject requests",
        )));
    }
    Ok(())
}

/// Submit a new approval request against a flow.
///
/// POST /api/v1/catalogs/:catalog_id/flows/:approval_flow_id/requests
#[axum::debug_handler]
pub async fn submit_request(
    State(state): State<AppState>,
    Path((catalog_id, approval_flow_id)): Path<(String, String)>,
    user: ActingUser,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<ApprovalRequest>), ApiError> {
    let result = state
        .engine
        .submit(&catalog_id, &approval_flow_id, &user.id, body)
        .await;
    record_outcome("submit", &result);
    let request = result?;

    info!(
        request_id = %request.request_id,
        catalog_id = %catalog_id,
        approval_flow_id = %approval_flow_id,
        request_user_id = %user.id,
        "Approval request submitted"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

/// Run the validation stage of a submitted request.
///
/// POST /api/v1/requests/:request_id/validate
#[axum::debug_handler]
pub async fn validate_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    _user: ActingUser,
) -> Result<Json<ApprovalRequest>, ApiError> {
    let result = state.engine.validate(request_id).await;
    record_outcome("validate", &result);
    let request = result?;

    info!(
        request_id = %request_id,
        status = %request.status,
        "Approval request validated"
    );
    Ok(Json(request))
}

/// Approve a pending request.
///
/// POST /api/v1/requests/:request_id/approve
#[axum::debug_handler]
pub async fn approve_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    user: ActingUser,
    Json(body): Json<ApproveRequestBody>,
) -> Result<Json<ApprovalRequest>, ApiError> {
    reject_system_identity(&user)?;
    let result = state.engine.approve(request_id, &user.id, body).await;
    record_outcome("approve", &result);
    let request = result?;

    info!(
        request_id = %request_id,
        approved_by = %user.id,
        status = %request.status,
        "Approval request approved"
    );
    Ok(Json(request))
}

/// Reject a pending request.
///
/// POST /api/v1/requests/:request_id/reject
#[axum::debug_handler]
pub async fn reject_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    user: ActingUser,
    Json(body): Json<ActionCommentBody>,
) -> Result<Json<ApprovalRequest>, ApiError> {
    reject_system_identity(&user)?;
    let result = state.engine.reject(request_id, &user.id, body).await;
    record_outcome("reject", &result);
    let request = result?;

    info!(
        request_id = %request_id,
        rejected_by = %user.id,
        "Approval request rejected"
    );
    Ok(Json(request))
}

/// Revoke a granted request.
///
/// POST /api/v1/requests/:request_id/revoke
#[axum::debug_handler]
pub async fn revoke_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    user: ActingUser,
    Json(body): Json<ActionCommentBody>,
) -> Result<Json<ApprovalRequest>, ApiError> {
    let result = state.engine.revoke(request_id, &user.id, body).await;
    record_outcome("revoke", &result);
    let request = result?;

    info!(
        request_id = %request_id,
        revoked_by = %user.id,
        status = %request.status,
        "Approval request revoked"
    );
    Ok(Json(request))
}

/// Cancel a request. Only the system identity may cancel.
///
/// POST /api/v1/requests/:request_id/cancel
#[axum::debug_handler]
pub async fn cancel_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    user: ActingUser,
    Json(body): Json<ActionCommentBody>,
) -> Result<Json<ApprovalRequest>, ApiError> {
    let result = state.engine.cancel(request_id, &user.id, body).await;
    record_outcome("cancel", &result);
    let request = result?;

    info!(
        request_id = %request_id,
        "Approval request canceled"
    );
    Ok(Json(request))
}

/// Fetch one approval request.
///
/// GET /api/v1/requests/:request_id
#[axum::debug_handler]
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    _user: ActingUser,
) -> Result<Json<ApprovalRequest>, ApiError> {
    let request = state.engine.get_request(request_id).await?;
    Ok(Json(request))
}

/// List requests submitted against a flow, newest first.
///
/// GET /api/v1/catalogs/:catalog_id/flows/:approval_flow_id/requests
#[axum::debug_handler]
pub async fn list_requests_by_flow(
    State(state): State<AppState>,
    Path((catalog_id, approval_flow_id)): Path<(String, String)>,
    Query(query): Query<ListRequestsQuery>,
    _user: ActingUser,
) -> Result<Json<RequestPage>, ApiError> {
    let page = state
        .engine
        .list_requests_by_flow(&catalog_id, &approval_flow_id, &query)
        .await?;
    Ok(Json(page))
}

/// List the caller's own requests, newest first.
///
/// GET /api/v1/my/requests
#[axum::debug_handler]
pub async fn list_my_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
    user: ActingUser,
) -> Result<Json<RequestPage>, ApiError> {
    let page = state
        .engine
        .list_requests_by_requester(&user.id, &query)
        .await?;
    Ok(Json(page))
}
