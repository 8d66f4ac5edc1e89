//! Auto-revoke dispatcher job.
//!
//! Approvals granted for a bounded duration leave a scheduled event behind.
//! This job claims events whose fire time has passed and drives each one
//! through the ordinary revoke transition as the system identity, so the
//! revoked handler, notification and audit fields behave exactly as they
//! would for a manual revoke.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use domain::models::{ActionCommentBody, SYSTEM_USER_ID};
use domain::services::ApprovalEngine;
use persistence::repositories::ScheduledEventRepository;

use super::scheduler::{Job, JobFrequency};

/// Comment recorded on requests revoked by the dispatcher.
const AUTO_REVOKE_COMMENT: &str = "Access automatically revoked after the approved duration elapsed";

/// Background job that dispatches due auto-revoke events.
pub struct AutoRevokeJob {
    engine: Arc<ApprovalEngine>,
    events: ScheduledEventRepository,
    poll_secs: u64,
    batch_size: i64,
}

impl AutoRevokeJob {
    pub fn new(
        engine: Arc<ApprovalEngine>,
        events: ScheduledEventRepository,
        poll_secs: u64,
        batch_size: i64,
    ) -> Self {
        Self {
            engine,
            events,
            poll_secs,
            batch_size,
        }
    }
}

#[async_trait::async_trait]
impl Job for AutoRevokeJob {
    fn name(&self) -> &'static str {
        "auto_revoke_dispatcher"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.poll_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let due = self
            .events
            .claim_due(Utc::now(), self.batch_size)
            .await
            .map_err(|e| format!("Failed to claim due events: {}", e))?;

        if due.is_empty() {
            return Ok(());
        }

        let total = due.len();
        let mut failed = 0usize;

        for event in due {
            let body = ActionCommentBody {
                comment: Some(AUTO_REVOKE_COMMENT.to_string()),
            };
            match self.engine.revoke(event.request_id, SYSTEM_USER_ID, body).await {
                Ok(_) => {
                    self.events
                        .mark_completed(event.event_id, Utc::now())
                        .await
                        .map_err(|e| format!("Failed to mark event completed: {}", e))?;
                }
                Err(e) => {
                    // A request already revoked or canceled by hand lands
                    // here too; the row keeps the reason.
                    failed += 1;
                    warn!(
                        event_id = %event.event_id,
                        request_id = %event.request_id,
                        error = %e,
                        "Auto-revoke dispatch failed"
                    );
                    self.events
                        .mark_failed(event.event_id, Utc::now(), e.system_message())
                        .await
                        .map_err(|e| format!("Failed to mark event failed: {}", e))?;
                }
            }
        }

        info!(
            total = total,
            failed = failed,
            "Dispatched due auto-revoke events"
        );

        if failed > 0 {
            Err(format!("{} of {} due events failed", failed, total))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_poll_cadence_follows_config() {
        let freq = JobFrequency::Seconds(30);
        assert_eq!(freq.duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_dispatch_comment_names_the_cause() {
        assert!(AUTO_REVOKE_COMMENT.contains("duration elapsed"));
    }
}
