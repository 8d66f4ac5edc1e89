//! Revoke: tear down a previously granted request.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use shared::error::AppError;
use shared::validation::validate_identifier;

use crate::models::{ActionCommentBody, ApprovalRequest, RequestStatus};
use crate::services::authorization::ApprovalAction;
use crate::services::handler::{HandlerInput, HandlerStage};
use crate::services::notification::ApprovalEventKind;
use crate::services::stores::MarkRevokedInput;

use super::{ApprovalEngine, StatusChecked};

impl ApprovalEngine {
    /// Revokes a granted request. Starts from `ApprovedActionSucceeded`, or
    /// from the legacy `Approved` status when an approved handler result was
    /// recorded (records persisted before the action-outcome statuses
    /// existed).
    pub async fn revoke(
        &self,
        request_id: Uuid,
        acting_user: &str,
        body: ActionCommentBody,
    ) -> Result<ApprovalRequest, AppError> {
        validate_identifier(acting_user).map_err(|err| {
            AppError::bad_request(
                err.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid acting user id".to_string()),
            )
        })?;
        body.validate()?;

        let loaded = self.load_request(request_id).await?;
        if !loaded.request.is_revocable() {
            return Err(AppError::bad_request(format!(
                "Approval request status is {} and cannot be revoked",
                loaded.request.status
            )));
        }
        let resolved = self.resolve_for(StatusChecked { loaded }).await?;
        if !resolved.flow.enable_revoke {
            return Err(AppError::bad_request(format!(
                "Revoke is not enabled for approval flow {}",
                resolved.flow.approval_flow_id
            )));
        }

        let context = self.gather_context(resolved).await?;
        let authorized = self
            .authorize_stage(context, ApprovalAction::Revoke, acting_user)
            .await?;

        let updated = self
            .requests
            .mark_revoked(MarkRevokedInput {
                request_id,
                revoked_date: Utc::now(),
                revoked_comment: body.comment.clone(),
                revoked_by_user_id: acting_user.to_string(),
            })
            .await?;
        let Some(mut updated) = updated else {
            return Err(self.stale_status_error(request_id, "not revocable").await);
        };

        // The record is `Revoked` from here; a handler error leaves it
        // there and the conditional write bars re-entry.
        let input = HandlerInput::from_request(HandlerStage::Revoked, &updated);
        let result = authorized
            .flow()
            .handler
            .revoked(input)
            .await
            .map_err(|err| AppError::dependency("revoked handler", err))?;

        updated.status = if result.is_success {
            RequestStatus::RevokedActionSucceeded
        } else {
            RequestStatus::RevokedActionFailed
        };
        updated.revoked_handler_result = Some(result);
        self.requests.put(&updated).await?;

        tracing::info!(
            request_id = %request_id,
            status = %updated.status,
            revoked_by = %acting_user,
            "Approval request revoked"
        );
        self.emit(
            ApprovalEventKind::Revoked,
            &updated,
            Some(acting_user),
            body.comment.as_deref(),
        )
        .await;
        Ok(updated)
    }
}
