//! Collaborator interfaces consumed by the approval engine.
//!
//! The engine owns no storage. It reads and writes through these traits and
//! relies on one primitive for all cross-process safety: the `mark_*` methods
//! are conditional writes that succeed only when the record still carries the
//! expected prior status, returning `None` on a precondition miss. The
//! in-memory implementations below back the engine test-suite and local
//! development; `persistence` provides the PostgreSQL ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::error::AppError;

use crate::models::{
    ApprovalFlowInfo, ApprovalRequest, GroupMembership, RequestStatus, ResourceRecord,
};

/// Scheduler event type registered for auto-revocation.
pub const AUTO_REVOKE_EVENT_TYPE: &str = "approval_request_auto_revoke";

/// One-shot event registered when an approval carries an auto-revoke
/// duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoRevokeEvent {
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub request_id: Uuid,
    pub fire_at: DateTime<Utc>,
}

/// Conditional input for `Pending -> Approved`.
#[derive(Debug, Clone)]
pub struct MarkApprovedInput {
    pub request_id: Uuid,
    pub approved_date: DateTime<Utc>,
    pub approved_comment: Option<String>,
    pub approved_by_user_id: String,
    pub auto_revoke_duration: Option<String>,
}

/// Conditional input for `Pending -> Rejected`.
#[derive(Debug, Clone)]
pub struct MarkRejectedInput {
    pub request_id: Uuid,
    pub rejected_date: DateTime<Utc>,
    pub reject_comment: Option<String>,
    pub rejected_by_user_id: String,
}

/// Conditional input for the revoke pre-update.
#[derive(Debug, Clone)]
pub struct MarkRevokedInput {
    pub request_id: Uuid,
    pub revoked_date: DateTime<Utc>,
    pub revoked_comment: Option<String>,
    pub revoked_by_user_id: String,
}

/// Conditional input for `-> Canceled`.
#[derive(Debug, Clone)]
pub struct MarkCanceledInput {
    pub request_id: Uuid,
    pub canceled_date: DateTime<Utc>,
    pub cancel_comment: Option<String>,
    pub canceled_by_user_id: String,
}

/// Conditional input for `Submitted -> Pending | ValidationFailed`.
#[derive(Debug, Clone)]
pub struct MarkValidatedInput {
    pub request_id: Uuid,
    pub validated_date: DateTime<Utc>,
    pub handler_result: crate::models::HandlerResult,
    /// `true` advances to `Pending`, `false` to `ValidationFailed`.
    pub passed: bool,
}

/// One storage page of requests plus the continuation key.
#[derive(Debug, Clone)]
pub struct RequestSlice {
    pub items: Vec<ApprovalRequest>,
    pub next: Option<(DateTime<Utc>, Uuid)>,
}

/// Approval request storage.
#[async_trait::async_trait]
pub trait ApprovalRequestStore: Send + Sync {
    async fn get(&self, request_id: Uuid) -> Result<Option<ApprovalRequest>, AppError>;

    /// Unconditional full write, used for the initial record and for
    /// recording handler outcomes on a record this process just advanced.
    async fn put(&self, request: &ApprovalRequest) -> Result<(), AppError>;

    /// `None` means the record was missing or no longer `Pending`.
    async fn mark_approved(
        &self,
        input: MarkApprovedInput,
    ) -> Result<Option<ApprovalRequest>, AppError>;

    async fn mark_rejected(
        &self,
        input: MarkRejectedInput,
    ) -> Result<Option<ApprovalRequest>, AppError>;

    /// Precondition: `ApprovedActionSucceeded`, or `Approved` with a
    /// populated approved handler result.
    async fn mark_revoked(
        &self,
        input: MarkRevokedInput,
    ) -> Result<Option<ApprovalRequest>, AppError>;

    /// Precondition: `Pending`, `ApprovedActionFailed` or `Rejected`.
    async fn mark_canceled(
        &self,
        input: MarkCanceledInput,
    ) -> Result<Option<ApprovalRequest>, AppError>;

    /// Precondition: `Submitted`.
    async fn mark_validated(
        &self,
        input: MarkValidatedInput,
    ) -> Result<Option<ApprovalRequest>, AppError>;

    async fn list_by_flow(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<RequestSlice, AppError>;

    async fn list_by_requester(
        &self,
        request_user_id: &str,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<RequestSlice, AppError>;
}

/// Mutable per-flow info storage.
#[async_trait::async_trait]
pub trait FlowInfoStore: Send + Sync {
    async fn get(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
    ) -> Result<Option<ApprovalFlowInfo>, AppError>;

    async fn set(&self, info: ApprovalFlowInfo) -> Result<ApprovalFlowInfo, AppError>;
}

/// Registered resource lookup.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(
        &self,
        catalog_id: &str,
        resource_type_id: &str,
        resource_id: &str,
    ) -> Result<Option<ResourceRecord>, AppError>;
}

/// Identity backend answering group membership queries.
#[async_trait::async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMembership>, AppError>;
}

/// Scheduler backend registering one-shot auto-revoke events.
#[async_trait::async_trait]
pub trait RevokeScheduler: Send + Sync {
    async fn schedule_revoke(&self, event: AutoRevokeEvent) -> Result<Uuid, AppError>;
}

fn clamp_limit(limit: i64) -> usize {
    limit.clamp(1, 100) as usize
}

fn page_after(
    mut items: Vec<ApprovalRequest>,
    cursor: Option<(DateTime<Utc>, Uuid)>,
    limit: i64,
) -> RequestSlice {
    // Newest first; v7 request ids tiebreak records sharing a timestamp.
    items.sort_by(|a, b| {
        (b.request_date, b.request_id).cmp(&(a.request_date, a.request_id))
    });
    if let Some((ts, id)) = cursor {
        items.retain(|r| (r.request_date, r.request_id) < (ts, id));
    }
    let limit = clamp_limit(limit);
    let has_more = items.len() > limit;
    items.truncate(limit);
    let next = if has_more {
        items.last().map(|r| (r.request_date, r.request_id))
    } else {
        None
    };
    RequestSlice { items, next }
}

/// In-memory request store. Conditional writes are atomic under one write
/// lock, which is what the engine's at-most-once guarantee needs from any
/// backend.
#[derive(Debug, Default)]
pub struct InMemoryApprovalRequestStore {
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
    mark_approved_calls: AtomicU64,
    mark_rejected_calls: AtomicU64,
    mark_revoked_calls: AtomicU64,
    mark_canceled_calls: AtomicU64,
    mark_validated_calls: AtomicU64,
}

impl InMemoryApprovalRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_approved_calls(&self) -> u64 {
        self.mark_approved_calls.load(Ordering::SeqCst)
    }

    pub fn mark_rejected_calls(&self) -> u64 {
        self.mark_rejected_calls.load(Ordering::SeqCst)
    }

    pub fn mark_revoked_calls(&self) -> u64 {
        self.mark_revoked_calls.load(Ordering::SeqCst)
    }

    pub fn mark_canceled_calls(&self) -> u64 {
        self.mark_canceled_calls.load(Ordering::SeqCst)
    }

    pub fn mark_validated_calls(&self) -> u64 {
        self.mark_validated_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ApprovalRequestStore for InMemoryApprovalRequestStore {
    async fn get(&self, request_id: Uuid) -> Result<Option<ApprovalRequest>, AppError> {
        Ok(self.requests.read().await.get(&request_id).cloned())
    }

    async fn put(&self, request: &ApprovalRequest) -> Result<(), AppError> {
        self.requests
            .write()
            .await
            .insert(request.request_id, request.clone());
        Ok(())
    }

    async fn mark_approved(
        &self,
        input: MarkApprovedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        self.mark_approved_calls.fetch_add(1, Ordering::SeqCst);
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&input.request_id) else {
            return Ok(None);
        };
        if request.status != RequestStatus::Pending {
            return Ok(None);
        }
        request.status = RequestStatus::Approved;
        request.approved_date = Some(input.approved_date);
        request.approved_comment = input.approved_comment;
        request.approved_by_user_id = Some(input.approved_by_user_id);
        request.auto_revoke_duration = input.auto_revoke_duration;
        Ok(Some(request.clone()))
    }

    async fn mark_rejected(
        &self,
        input: MarkRejectedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        self.mark_rejected_calls.fetch_add(1, Ordering::SeqCst);
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&input.request_id) else {
            return Ok(None);
        };
        if request.status != RequestStatus::Pending {
            return Ok(None);
        }
        request.status = RequestStatus::Rejected;
        request.rejected_date = Some(input.rejected_date);
        request.reject_comment = input.reject_comment;
        request.rejected_by_user_id = Some(input.rejected_by_user_id);
        Ok(Some(request.clone()))
    }

    async fn mark_revoked(
        &self,
        input: MarkRevokedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        self.mark_revoked_calls.fetch_add(1, Ordering::SeqCst);
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&input.request_id) else {
            return Ok(None);
        };
        if !request.is_revocable() {
            return Ok(None);
        }
        request.status = RequestStatus::Revoked;
        request.revoked_date = Some(input.revoked_date);
        request.revoked_comment = input.revoked_comment;
        request.revoked_by_user_id = Some(input.revoked_by_user_id);
        Ok(Some(request.clone()))
    }

    async fn mark_canceled(
        &self,
        input: MarkCanceledInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        self.mark_canceled_calls.fetch_add(1, Ordering::SeqCst);
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&input.request_id) else {
            return Ok(None);
        };
        if !request.status.can_cancel_from() {
            return Ok(None);
        }
        request.status = RequestStatus::Canceled;
        request.canceled_date = Some(input.canceled_date);
        request.cancel_comment = input.cancel_comment;
        request.canceled_by_user_id = Some(input.canceled_by_user_id);
        Ok(Some(request.clone()))
    }

    async fn mark_validated(
        &self,
        input: MarkValidatedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        self.mark_validated_calls.fetch_add(1, Ordering::SeqCst);
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&input.request_id) else {
            return Ok(None);
        };
        if request.status != RequestStatus::Submitted {
            return Ok(None);
        }
        request.status = if input.passed {
            RequestStatus::Pending
        } else {
            RequestStatus::ValidationFailed
        };
        request.validated_date = Some(input.validated_date);
        request.validation_handler_result = Some(input.handler_result);
        Ok(Some(request.clone()))
    }

    async fn list_by_flow(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<RequestSlice, AppError> {
        let items: Vec<ApprovalRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.catalog_id == catalog_id && r.approval_flow_id == approval_flow_id)
            .cloned()
            .collect();
        Ok(page_after(items, cursor, limit))
    }

    async fn list_by_requester(
        &self,
        request_user_id: &str,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<RequestSlice, AppError> {
        let items: Vec<ApprovalRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.request_user_id == request_user_id)
            .cloned()
            .collect();
        Ok(page_after(items, cursor, limit))
    }
}

/// In-memory flow info store.
#[derive(Debug, Default)]
pub struct InMemoryFlowInfoStore {
    infos: RwLock<HashMap<(String, String), ApprovalFlowInfo>>,
}

impl InMemoryFlowInfoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FlowInfoStore for InMemoryFlowInfoStore {
    async fn get(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
    ) -> Result<Option<ApprovalFlowInfo>, AppError> {
        Ok(self
            .infos
            .read()
            .await
            .get(&(catalog_id.to_string(), approval_flow_id.to_string()))
            .cloned())
    }

    async fn set(&self, info: ApprovalFlowInfo) -> Result<ApprovalFlowInfo, AppError> {
        self.infos.write().await.insert(
            (info.catalog_id.clone(), info.approval_flow_id.clone()),
            info.clone(),
        );
        Ok(info)
    }
}

/// In-memory resource store with a registration helper for tests and local
/// development.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    resources: RwLock<HashMap<(String, String, String), ResourceRecord>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, record: ResourceRecord) {
        self.resources.write().await.insert(
            (
                record.catalog_id.clone(),
                record.resource_type_id.clone(),
                record.resource_id.clone(),
            ),
            record,
        );
    }
}

#[async_trait::async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(
        &self,
        catalog_id: &str,
        resource_type_id: &str,
        resource_id: &str,
    ) -> Result<Option<ResourceRecord>, AppError> {
        Ok(self
            .resources
            .read()
            .await
            .get(&(
                catalog_id.to_string(),
                resource_type_id.to_string(),
                resource_id.to_string(),
            ))
            .cloned())
    }
}

/// In-memory group directory.
#[derive(Debug, Default)]
pub struct InMemoryGroupDirectory {
    members: RwLock<HashMap<(String, String), GroupMembership>>,
}

impl InMemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, group_id: &str, user_id: &str) {
        self.members.write().await.insert(
            (group_id.to_string(), user_id.to_string()),
            GroupMembership {
                group_id: group_id.to_string(),
                user_id: user_id.to_string(),
                added_date: Utc::now(),
            },
        );
    }
}

#[async_trait::async_trait]
impl GroupDirectory for InMemoryGroupDirectory {
    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMembership>, AppError> {
        Ok(self
            .members
            .read()
            .await
            .get(&(group_id.to_string(), user_id.to_string()))
            .cloned())
    }
}

/// In-memory scheduler recording registered events; can simulate an
/// unavailable backend.
#[derive(Debug, Default)]
pub struct InMemoryRevokeScheduler {
    pub simulate_unavailable: bool,
    events: RwLock<Vec<(Uuid, AutoRevokeEvent)>>,
}

impl InMemoryRevokeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            simulate_unavailable: true,
            ..Self::default()
        }
    }

    pub async fn events(&self) -> Vec<AutoRevokeEvent> {
        self.events
            .read()
            .await
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl RevokeScheduler for InMemoryRevokeScheduler {
    async fn schedule_revoke(&self, event: AutoRevokeEvent) -> Result<Uuid, AppError> {
        if self.simulate_unavailable {
            return Err(AppError::dependency("scheduler", "backend unavailable"));
        }
        let event_id = Uuid::new_v4();
        tracing::debug!(
            event_id = %event_id,
            request_id = %event.request_id,
            fire_at = %event.fire_at,
            "Registered auto-revoke event"
        );
        self.events.write().await.push((event_id, event));
        Ok(event_id)
    }
}
