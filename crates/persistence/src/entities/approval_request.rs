//! Approval request entity (database row mapping).
//!
//! Status is stored as text rather than a Postgres enum so older records
//! written before the split outcome statuses existed keep decoding; the
//! engine's revoke carve-out for such records depends on that.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{
    ApprovalRequest, ApproverType, HandlerResult, InputParam, InputResource, RequestStatus,
};
use shared::error::AppError;

/// Decodes a stored status string. `RequestStatus::to_string` is the inverse.
pub fn request_status_from_db(value: &str) -> Result<RequestStatus, AppError> {
    let status = match value {
        "submitted" => RequestStatus::Submitted,
        "validation_failed" => RequestStatus::ValidationFailed,
        "pending" => RequestStatus::Pending,
        "approved" => RequestStatus::Approved,
        "approved_action_succeeded" => RequestStatus::ApprovedActionSucceeded,
        "approved_action_failed" => RequestStatus::ApprovedActionFailed,
        "rejected" => RequestStatus::Rejected,
        "revoked" => RequestStatus::Revoked,
        "revoked_action_succeeded" => RequestStatus::RevokedActionSucceeded,
        "revoked_action_failed" => RequestStatus::RevokedActionFailed,
        "canceled" => RequestStatus::Canceled,
        other => {
            return Err(AppError::internal(format!(
                "Unknown approval request status {other} in storage"
            )))
        }
    };
    Ok(status)
}

pub fn approver_type_from_db(value: &str) -> Result<ApproverType, AppError> {
    match value {
        "group" => Ok(ApproverType::Group),
        other => Err(AppError::internal(format!(
            "Unknown approver type {other} in storage"
        ))),
    }
}

/// Database row mapping for the approval_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalRequestEntity {
    pub request_id: Uuid,
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub request_user_id: String,
    pub approver_type: String,
    pub approver_id: Option<String>,
    pub input_params: Json<Vec<InputParam>>,
    pub input_resources: Json<Vec<InputResource>>,
    pub request_comment: Option<String>,
    pub status: String,
    pub request_date: DateTime<Utc>,
    pub validated_date: Option<DateTime<Utc>>,
    pub validation_handler_result: Option<Json<HandlerResult>>,
    pub approved_date: Option<DateTime<Utc>>,
    pub approved_comment: Option<String>,
    pub approved_by_user_id: Option<String>,
    pub approved_handler_result: Option<Json<HandlerResult>>,
    pub rejected_date: Option<DateTime<Utc>>,
    pub reject_comment: Option<String>,
    pub rejected_by_user_id: Option<String>,
    pub revoked_date: Option<DateTime<Utc>>,
    pub revoked_comment: Option<String>,
    pub revoked_by_user_id: Option<String>,
    pub revoked_handler_result: Option<Json<HandlerResult>>,
    pub canceled_date: Option<DateTime<Utc>>,
    pub cancel_comment: Option<String>,
    pub canceled_by_user_id: Option<String>,
    pub auto_revoke_duration: Option<String>,
}

impl TryFrom<ApprovalRequestEntity> for ApprovalRequest {
    type Error = AppError;

    fn try_from(entity: ApprovalRequestEntity) -> Result<Self, Self::Error> {
        Ok(ApprovalRequest {
            request_id: entity.request_id,
            catalog_id: entity.catalog_id,
            approval_flow_id: entity.approval_flow_id,
            request_user_id: entity.request_user_id,
            approver_type: approver_type_from_db(&entity.approver_type)?,
            approver_id: entity.approver_id,
            input_params: entity.input_params.0,
            input_resources: entity.input_resources.0,
            request_comment: entity.request_comment,
            status: request_status_from_db(&entity.status)?,
            request_date: entity.request_date,
            validated_date: entity.validated_date,
            validation_handler_result: entity.validation_handler_result.map(|j| j.0),
            approved_date: entity.approved_date,
            approved_comment: entity.approved_comment,
            approved_by_user_id: entity.approved_by_user_id,
            approved_handler_result: entity.approved_handler_result.map(|j| j.0),
            rejected_date: entity.rejected_date,
            reject_comment: entity.reject_comment,
            rejected_by_user_id: entity.rejected_by_user_id,
            revoked_date: entity.revoked_date,
            revoked_comment: entity.revoked_comment,
            revoked_by_user_id: entity.revoked_by_user_id,
            revoked_handler_result: entity.revoked_handler_result.map(|j| j.0),
            canceled_date: entity.canceled_date,
            cancel_comment: entity.cancel_comment,
            canceled_by_user_id: entity.canceled_by_user_id,
            auto_revoke_duration: entity.auto_revoke_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ParamValue;

    #[test]
    fn test_status_mapping_is_display_inverse() {
        let statuses = [
            RequestStatus::Submitted,
            RequestStatus::ValidationFailed,
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::ApprovedActionSucceeded,
            RequestStatus::ApprovedActionFailed,
            RequestStatus::Rejected,
            RequestStatus::Revoked,
            RequestStatus::RevokedActionSucceeded,
            RequestStatus::RevokedActionFailed,
            RequestStatus::Canceled,
        ];
        for status in statuses {
            assert_eq!(request_status_from_db(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_internal_error() {
        let err = request_status_from_db("granted").unwrap_err();
        assert!(err.is_internal());
        assert!(err.system_message().contains("granted"));
    }

    #[test]
    fn test_entity_conversion() {
        let entity = ApprovalRequestEntity {
            request_id: Uuid::now_v7(),
            catalog_id: "analytics".into(),
            approval_flow_id: "storage-read".into(),
            request_user_id: "alice".into(),
            approver_type: "group".into(),
            approver_id: None,
            input_params: Json(vec![InputParam {
                id: "region".into(),
                value: ParamValue::String("eu-west-1".into()),
            }]),
            input_resources: Json(vec![]),
            request_comment: None,
            status: "approved".into(),
            request_date: Utc::now(),
            validated_date: Some(Utc::now()),
            validation_handler_result: Some(Json(HandlerResult::success("ok"))),
            approved_date: Some(Utc::now()),
            approved_comment: None,
            approved_by_user_id: Some("bob".into()),
            approved_handler_result: Some(Json(HandlerResult::success("granted"))),
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
            auto_revoke_duration: Some("P5D".into()),
        };

        let request = ApprovalRequest::try_from(entity).unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.input_params.len(), 1);
        assert!(request.is_revocable());
    }

    #[test]
    fn test_unknown_approver_type_is_internal_error() {
        assert!(approver_type_from_db("role").is_err());
        assert_eq!(approver_type_from_db("group").unwrap(), ApproverType::Group);
    }
}
