//! Outbound notifications for request lifecycle events.
//!
//! Notification delivery is fire-and-forget: the engine emits after the state
//! change is persisted and a failed send is logged, never surfaced to the
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ApprovalRequest, RequestStatus};

/// Lifecycle event kinds that produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalEventKind {
    Submitted,
    Validated,
    Approved,
    Rejected,
    Revoked,
    Canceled,
}

impl std::fmt::Display for ApprovalEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalEventKind::Submitted => write!(f, "submitted"),
            ApprovalEventKind::Validated => write!(f, "validated"),
            ApprovalEventKind::Approved => write!(f, "approved"),
            ApprovalEventKind::Rejected => write!(f, "rejected"),
            ApprovalEventKind::Revoked => write!(f, "revoked"),
            ApprovalEventKind::Canceled => write!(f, "canceled"),
        }
    }
}

/// Payload describing one lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalEventPayload {
    #[serde(rename = "type")]
    pub kind: ApprovalEventKind,
    pub request_id: Uuid,
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub request_user_id: String,
    /// Status after the transition this event reports.
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acting_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApprovalEventPayload {
    pub fn from_request(
        kind: ApprovalEventKind,
        request: &ApprovalRequest,
        acting_user_id: Option<&str>,
        comment: Option<&str>,
    ) -> Self {
        Self {
            kind,
            request_id: request.request_id,
            catalog_id: request.catalog_id.clone(),
            approval_flow_id: request.approval_flow_id.clone(),
            request_user_id: request.request_user_id.clone(),
            status: request.status,
            acting_user_id: acting_user_id.map(Into::into),
            comment: comment.map(Into::into),
            timestamp: Utc::now(),
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone)]
pub enum NotificationResult {
    /// Notification was delivered.
    Sent,
    /// Delivery failed (non-blocking).
    Failed(String),
    /// No sink configured for this event.
    Skipped,
}

/// Notification sink for lifecycle events.
#[async_trait::async_trait]
pub trait ApprovalNotifier: Send + Sync {
    async fn notify(&self, payload: ApprovalEventPayload) -> NotificationResult;
}

/// Recording notifier for development and tests.
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Whether to simulate delivery failures.
    pub simulate_failure: bool,
    sent: RwLock<Vec<ApprovalEventPayload>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<ApprovalEventPayload> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ApprovalNotifier for MockNotifier {
    async fn notify(&self, payload: ApprovalEventPayload) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                request_id = %payload.request_id,
                kind = %payload.kind,
                "Mock notifier simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            request_id = %payload.request_id,
            kind = %payload.kind,
            status = %payload.status,
            "Mock: would deliver approval event"
        );
        self.sent.write().await.push(payload);
        NotificationResult::Sent
    }
}
