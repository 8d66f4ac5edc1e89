//! Cancel: system-initiated rollback of an in-flight request.
//!
//! Used by resource-update-with-approval workflows to clear a change request
//! that was superseded. Only the sentinel system identity may cancel,
//! regardless of the request's state.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use shared::error::AppError;

use crate::models::{ActionCommentBody, ApprovalRequest, SYSTEM_USER_ID};
use crate::services::notification::ApprovalEventKind;
use crate::services::stores::MarkCanceledInput;

use super::ApprovalEngine;

impl ApprovalEngine {
    /// Cancels a request from `Pending`, `ApprovedActionFailed` or
    /// `Rejected`. No flow resolution, no handler.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        acting_user: &str,
        body: ActionCommentBody,
    ) -> Result<ApprovalRequest, AppError> {
        if acting_user != SYSTEM_USER_ID {
            return Err(AppError::bad_request(
                "Invalid User ID for Canceling Approval Request",
            ));
        }
        body.validate()?;

        let loaded = self.load_request(request_id).await?;
        if !loaded.request.status.can_cancel_from() {
            return Err(AppError::bad_request(format!(
                "Approval request status is {} and cannot be canceled",
                loaded.request.status
            )));
        }

        let updated = self
            .requests
            .mark_canceled(MarkCanceledInput {
                request_id,
                canceled_date: Utc::now(),
                cancel_comment: body.comment.clone(),
                canceled_by_user_id: acting_user.to_string(),
            })
            .await?;
        let Some(updated) = updated else {
            return Err(self.stale_status_error(request_id, "not cancelable").await);
        };

        tracing::info!(
            request_id = %request_id,
            "Approval request canceled"
        );
        self.emit(
            ApprovalEventKind::Canceled,
            &updated,
            Some(acting_user),
            body.comment.as_deref(),
        )
        .await;
        Ok(updated)
    }
}
