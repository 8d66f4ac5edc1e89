//! Approval flow catalog route handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use domain::models::{FlowView, SetFlowInfoBody};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ActingUser;

/// Fetch a flow definition merged with its stored operator settings.
///
/// GET /api/v1/catalogs/:catalog_id/flows/:approval_flow_id
#[axum::debug_handler]
pub async fn get_flow(
    State(state): State<AppState>,
    Path((catalog_id, approval_flow_id)): Path<(String, String)>,
    _user: ActingUser,
) -> Result<Json<FlowView>, ApiError> {
    let view = state
        .engine
        .flow_view(&catalog_id, &approval_flow_id)
        .await?;
    Ok(Json(view))
}

/// Replace the operator settings of a flow.
///
/// PUT /api/v1/catalogs/:catalog_id/flows/:approval_flow_id
#[axum::debug_handler]
pub async fn set_flow_info(
    State(state): State<AppState>,
    Path((catalog_id, approval_flow_id)): Path<(String, String)>,
    user: ActingUser,
    Json(body): Json<SetFlowInfoBody>,
) -> Result<Json<FlowView>, ApiError> {
    let view = state
        .engine
        .set_flow_info(&catalog_id, &approval_flow_id, body)
        .await?;

    info!(
        catalog_id = %catalog_id,
        approval_flow_id = %approval_flow_id,
        updated_by = %user.id,
        "Approval flow info updated"
    );
    Ok(Json(view))
}
