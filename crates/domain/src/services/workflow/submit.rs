//! Submit: create a new request in `Submitted` state.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use shared::error::AppError;
use shared::validation::validate_identifier;

use crate::models::{
    ApprovalRequest, ApproverModel, ApproverType, RequestStatus, SubmitRequestBody,
};
use crate::services::catalog::{resolve_flow, ResolvedFlow};
use crate::services::notification::ApprovalEventKind;

use super::ApprovalEngine;

impl ApprovalEngine {
    /// Creates a request against a flow. Anyone may submit; policy is
    /// enforced at approve/reject time.
    pub async fn submit(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
        request_user_id: &str,
        body: SubmitRequestBody,
    ) -> Result<ApprovalRequest, AppError> {
        validate_identifier(request_user_id).map_err(validation_error)?;
        body.validate()?;

        let flow = resolve_flow(
            &self.registry,
            self.flow_infos.as_ref(),
            catalog_id,
            approval_flow_id,
        )
        .await?;
        check_against_schema(&flow, &body)?;

        // The approver group named by the caller only means something under
        // the request-specified model; elsewhere it is dropped.
        let approver_id = match &flow.approver {
            ApproverModel::RequestSpecified => match body.approver_id {
                Some(approver_id) => Some(approver_id),
                None => {
                    return Err(AppError::bad_request(
                        "Approver group is required for this approval flow",
                    ))
                }
            },
            ApproverModel::Flow | ApproverModel::Resource { .. } => None,
        };

        let request = ApprovalRequest {
            request_id: Uuid::now_v7(),
            catalog_id: catalog_id.to_string(),
            approval_flow_id: approval_flow_id.to_string(),
            request_user_id: request_user_id.to_string(),
            approver_type: ApproverType::Group,
            approver_id,
            input_params: body.input_params,
            input_resources: body.input_resources,
            request_comment: body.request_comment,
            status: RequestStatus::Submitted,
            request_date: Utc::now(),
            validated_date: None,
            validation_handler_result: None,
            approved_date: None,
            approved_comment: None,
            approved_by_user_id: None,
            approved_handler_result: None,
            rejected_date: None,
            reject_comment: None,
            rejected_by_user_id: None,
            revoked_date: None,
            revoked_comment: None,
            revoked_by_user_id: None,
            revoked_handler_result: None,
            canceled_date: None,
            cancel_comment: None,
            canceled_by_user_id: None,
            auto_revoke_duration: None,
        };

        self.requests.put(&request).await?;
        tracing::info!(
            request_id = %request.request_id,
            catalog_id = %catalog_id,
            approval_flow_id = %approval_flow_id,
            request_user_id = %request_user_id,
            "Approval request submitted"
        );
        self.emit(
            ApprovalEventKind::Submitted,
            &request,
            None,
            request.request_comment.as_deref(),
        )
        .await;
        Ok(request)
    }
}

fn validation_error(err: validator::ValidationError) -> AppError {
    AppError::bad_request(
        err.message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid request user id".to_string()),
    )
}

/// Submitted inputs must stay inside the flow's declared schema.
fn check_against_schema(flow: &ResolvedFlow, body: &SubmitRequestBody) -> Result<(), AppError> {
    for param in &body.input_params {
        if !flow.params.iter().any(|schema| schema.id == param.id) {
            return Err(AppError::bad_request(format!(
                "Unknown input parameter {}",
                param.id
            )));
        }
    }
    for schema in &flow.params {
        if schema.required && !body.input_params.iter().any(|p| p.id == schema.id) {
            return Err(AppError::bad_request(format!(
                "Missing required input parameter {}",
                schema.id
            )));
        }
    }

    for resource in &body.input_resources {
        if !flow
            .resources
            .iter()
            .any(|schema| schema.resource_type_id == resource.resource_type_id)
        {
            return Err(AppError::bad_request(format!(
                "Unknown input resource type {}",
                resource.resource_type_id
            )));
        }
    }
    for schema in &flow.resources {
        if schema.required
            && !body
                .input_resources
                .iter()
                .any(|r| r.resource_type_id == schema.resource_type_id)
        {
            return Err(AppError::bad_request(format!(
                "Missing required input resource of type {}",
                schema.resource_type_id
            )));
        }
    }
    Ok(())
}
