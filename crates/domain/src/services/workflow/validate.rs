//! Validate: run the flow's validation handler against a submitted request.

use chrono::Utc;
use uuid::Uuid;

use shared::error::AppError;

use crate::models::{ApprovalRequest, RequestStatus};
use crate::services::handler::{HandlerInput, HandlerStage};
use crate::services::notification::ApprovalEventKind;
use crate::services::stores::MarkValidatedInput;

use super::{ApprovalEngine, StatusChecked};

impl ApprovalEngine {
    /// Moves a `Submitted` request to `Pending` or `ValidationFailed`
    /// depending on what the validation handler reports.
    ///
    /// A handler-reported failure is a business outcome and still advances
    /// the record; a handler error is an infrastructure failure and leaves
    /// the record untouched.
    pub async fn validate(&self, request_id: Uuid) -> Result<ApprovalRequest, AppError> {
        let loaded = self.load_request(request_id).await?;
        if loaded.request.status != RequestStatus::Submitted {
            return Err(AppError::bad_request(format!(
                "Approval request status is {}, not submitted",
                loaded.request.status
            )));
        }
        let resolved = self.resolve_for(StatusChecked { loaded }).await?;

        let input = HandlerInput::from_request(HandlerStage::Validation, resolved.request());
        let result = resolved
            .flow
            .handler
            .validation(input)
            .await
            .map_err(|err| AppError::dependency("validation handler", err))?;

        let passed = result.is_success;
        let updated = self
            .requests
            .mark_validated(MarkValidatedInput {
                request_id,
                validated_date: Utc::now(),
                handler_result: result,
                passed,
            })
            .await?;

        let Some(updated) = updated else {
            return Err(self.stale_status_error(request_id, "not submitted").await);
        };

        tracing::info!(
            request_id = %request_id,
            status = %updated.status,
            "Approval request validated"
        );
        self.emit(ApprovalEventKind::Validated, &updated, None, None)
            .await;
        Ok(updated)
    }

    /// Error for a conditional-write miss: a concurrent transition won
    /// between the status check and the write. Re-reads the record so the
    /// message names the status that actually won.
    pub(crate) async fn stale_status_error(&self, request_id: Uuid, wanted: &str) -> AppError {
        match self.requests.get(request_id).await {
            Ok(Some(current)) => AppError::conflict(format!(
                "Approval request status is {}, {wanted}",
                current.status
            )),
            Ok(None) => AppError::bad_request("Approval request not found"),
            Err(err) => err,
        }
    }
}
