//! Approve and reject: the two decisions available on a pending request.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use shared::error::AppError;
use shared::validation::validate_identifier;

use crate::models::{
    ActionCommentBody, ApprovalRequest, ApproveRequestBody, RequestStatus,
};
use crate::services::authorization::ApprovalAction;
use crate::services::duration::{ensure_within_limit, RevokeDuration};
use crate::services::handler::{HandlerInput, HandlerStage};
use crate::services::notification::ApprovalEventKind;
use crate::services::stores::{AutoRevokeEvent, MarkApprovedInput, MarkRejectedInput};

use super::{ApprovalEngine, StatusChecked};

impl ApprovalEngine {
    /// Approves a pending request: authorization, conditional write to
    /// `Approved`, the `approved` handler, then optional auto-revoke
    /// scheduling.
    pub async fn approve(
        &self,
        request_id: Uuid,
        acting_user: &str,
        body: ApproveRequestBody,
    ) -> Result<ApprovalRequest, AppError> {
        validate_identifier(acting_user).map_err(invalid_acting_user)?;
        body.validate()?;

        let loaded = self.load_request(request_id).await?;
        if loaded.request.status != RequestStatus::Pending {
            return Err(AppError::bad_request(format!(
                "Approval request status is {}, not pending",
                loaded.request.status
            )));
        }
        let resolved = self.resolve_for(StatusChecked { loaded }).await?;

        // The duration is checked before anything is written, and a missing
        // scheduler backend fails here for the same reason.
        let revoke_after: Option<RevokeDuration> = match body.auto_revoke_duration.as_deref() {
            Some(duration) => {
                let policy = resolved.flow.auto_revoke.as_ref().ok_or_else(|| {
                    AppError::bad_request(format!(
                        "Approval flow {} does not allow auto revoke",
                        resolved.flow.approval_flow_id
                    ))
                })?;
                let parsed = ensure_within_limit(duration, &policy.max_duration)?;
                if self.scheduler.is_none() {
                    return Err(AppError::bad_request(
                        "Request has autoRevokeDuration property but scheduler service is not available",
                    ));
                }
                Some(parsed)
            }
            None => None,
        };

        let context = self.gather_context(resolved).await?;
        let authorized = self
            .authorize_stage(context, ApprovalAction::Approve, acting_user)
            .await?;

        let updated = self
            .requests
            .mark_approved(MarkApprovedInput {
                request_id,
                approved_date: Utc::now(),
                approved_comment: body.comment.clone(),
                approved_by_user_id: acting_user.to_string(),
                auto_revoke_duration: body.auto_revoke_duration.clone(),
            })
            .await?;
        let Some(mut updated) = updated else {
            return Err(self.stale_status_error(request_id, "not pending").await);
        };

        // From here the record is `Approved`; a failure below leaves it
        // there and the conditional write bars re-entry.
        let input = HandlerInput::from_request(HandlerStage::Approved, &updated);
        let result = authorized
            .flow()
            .handler
            .approved(input)
            .await
            .map_err(|err| AppError::dependency("approved handler", err))?;

        updated.status = if result.is_success {
            RequestStatus::ApprovedActionSucceeded
        } else {
            RequestStatus::ApprovedActionFailed
        };
        updated.approved_handler_result = Some(result);
        self.requests.put(&updated).await?;

        if let (Some(duration), Some(scheduler)) = (revoke_after, self.scheduler.as_ref()) {
            let fire_at = duration.fire_time(Utc::now());
            let event_id = scheduler
                .schedule_revoke(AutoRevokeEvent {
                    catalog_id: updated.catalog_id.clone(),
                    approval_flow_id: updated.approval_flow_id.clone(),
                    request_id,
                    fire_at,
                })
                .await?;
            tracing::info!(
                request_id = %request_id,
                event_id = %event_id,
                fire_at = %fire_at,
                "Auto-revoke scheduled"
            );
        }

        tracing::info!(
            request_id = %request_id,
            status = %updated.status,
            approved_by = %acting_user,
            "Approval request approved"
        );
        self.emit(
            ApprovalEventKind::Approved,
            &updated,
            Some(acting_user),
            body.comment.as_deref(),
        )
        .await;
        Ok(updated)
    }

    /// Rejects a pending request. Same preconditions and authorization as
    /// approve; a single conditional write and no handler, since rejection
    /// has no side effect to perform.
    pub async fn reject(
        &self,
        request_id: Uuid,
        acting_user: &str,
        body: ActionCommentBody,
    ) -> Result<ApprovalRequest, AppError> {
        validate_identifier(acting_user).map_err(invalid_acting_user)?;
        body.validate()?;

        let loaded = self.load_request(request_id).await?;
        if loaded.request.status != RequestStatus::Pending {
            return Err(AppError::bad_request(format!(
                "Approval request status is {}, not pending",
                loaded.request.status
            )));
        }
        let resolved = self.resolve_for(StatusChecked { loaded }).await?;
        let context = self.gather_context(resolved).await?;
        let _authorized = self
            .authorize_stage(context, ApprovalAction::Reject, acting_user)
            .await?;

        let updated = self
            .requests
            .mark_rejected(MarkRejectedInput {
                request_id,
                rejected_date: Utc::now(),
                reject_comment: body.comment.clone(),
                rejected_by_user_id: acting_user.to_string(),
            })
            .await?;
        let Some(updated) = updated else {
            return Err(self.stale_status_error(request_id, "not pending").await);
        };

        tracing::info!(
            request_id = %request_id,
            rejected_by = %acting_user,
            "Approval request rejected"
        );
        self.emit(
            ApprovalEventKind::Rejected,
            &updated,
            Some(acting_user),
            body.comment.as_deref(),
        )
        .await;
        Ok(updated)
    }
}

fn invalid_acting_user(err: validator::ValidationError) -> AppError {
    AppError::bad_request(
        err.message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid acting user id".to_string()),
    )
}
