//! The approval request state machine.
//!
//! [`ApprovalEngine`] composes the collaborator interfaces into the six
//! workflow transitions plus reads and flow administration. The engine never
//! mutates a record in place: every transition reads state, performs a
//! conditional store write, persists a new record and returns it. All
//! cross-process safety rests on those conditional writes; a handler with
//! side effects only runs after this process won the conditional pre-update
//! to the in-flight status, which bounds it to at most one execution per
//! request.

mod cancel;
mod decision;
mod revoke;
mod submit;
mod validate;


use std::sync::Arc;

use uuid::Uuid;

use shared::error::AppError;
use shared::pagination::{decode_cursor, encode_cursor};

use crate::models::{
    ApprovalFlowInfo, ApprovalRequest, ApproverModel, FlowView, ListRequestsQuery, RequestPage,
    ResourceRecord, SetFlowInfoBody,
};
use crate::services::authorization::{authorize, ApprovalAction, AuthorizationContext};
use crate::services::catalog::{resolve_flow, CatalogRegistry, ResolvedFlow};
use crate::services::notification::{ApprovalEventKind, ApprovalEventPayload, ApprovalNotifier, NotificationResult};
use crate::services::stores::{
    ApprovalRequestStore, FlowInfoStore, GroupDirectory, ResourceStore, RevokeScheduler,
};

/// The approval engine over injected collaborators.
pub struct ApprovalEngine {
    registry: Arc<CatalogRegistry>,
    requests: Arc<dyn ApprovalRequestStore>,
    flow_infos: Arc<dyn FlowInfoStore>,
    resources: Arc<dyn ResourceStore>,
    directory: Arc<dyn GroupDirectory>,
    scheduler: Option<Arc<dyn RevokeScheduler>>,
    notifier: Option<Arc<dyn ApprovalNotifier>>,
}

impl ApprovalEngine {
    pub fn new(
        registry: Arc<CatalogRegistry>,
        requests: Arc<dyn ApprovalRequestStore>,
        flow_infos: Arc<dyn FlowInfoStore>,
        resources: Arc<dyn ResourceStore>,
        directory: Arc<dyn GroupDirectory>,
    ) -> Self {
        Self {
            registry,
            requests,
            flow_infos,
            resources,
            directory,
            scheduler: None,
            notifier: None,
        }
    }

    /// Attach the scheduler backend. Without one, approvals carrying an
    /// auto-revoke duration fail.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn RevokeScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Attach a notification sink for lifecycle events.
    pub fn with_notifier(mut self, notifier: Arc<dyn ApprovalNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }
}

/// Stage 1: the request exists in storage.
pub(crate) struct Loaded {
    pub request: ApprovalRequest,
}

/// Stage 2: the transition's status precondition held at read time. The
/// conditional store write re-checks it; this stage exists to fail fast with
/// an error naming the actual status.
pub(crate) struct StatusChecked {
    pub loaded: Loaded,
}

/// Stage 3: the flow definition is resolved and merged with its info record.
pub(crate) struct FlowResolved {
    pub checked: StatusChecked,
    pub flow: ResolvedFlow,
}

/// Stage 4: approver-model context gathered (the resource record for
/// resource-model flows).
pub(crate) struct ContextGathered {
    pub resolved: FlowResolved,
    pub resource: Option<ResourceRecord>,
}

/// Stage 5: the acting user passed authorization.
pub(crate) struct Authorized {
    pub context: ContextGathered,
}

impl FlowResolved {
    pub fn request(&self) -> &ApprovalRequest {
        &self.checked.loaded.request
    }
}

impl Authorized {
    pub fn request(&self) -> &ApprovalRequest {
        self.context.resolved.request()
    }

    pub fn flow(&self) -> &ResolvedFlow {
        &self.context.resolved.flow
    }
}

impl ApprovalEngine {
    pub(crate) async fn load_request(&self, request_id: Uuid) -> Result<Loaded, AppError> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::bad_request("Approval request not found"))?;
        Ok(Loaded { request })
    }

    pub(crate) async fn resolve_for(&self, checked: StatusChecked) -> Result<FlowResolved, AppError> {
        let flow = resolve_flow(
            &self.registry,
            self.flow_infos.as_ref(),
            &checked.loaded.request.catalog_id,
            &checked.loaded.request.approval_flow_id,
        )
        .await?;
        Ok(FlowResolved { checked, flow })
    }

    /// Looks up the resource record backing resource-model authorization.
    /// An attachment naming an unregistered resource is a configuration
    /// inconsistency.
    pub(crate) async fn gather_context(
        &self,
        resolved: FlowResolved,
    ) -> Result<ContextGathered, AppError> {
        let resource = match &resolved.flow.approver {
            ApproverModel::Resource { resource_type_id } => {
                let request = resolved.request();
                let attachment = request
                    .input_resources
                    .iter()
                    .find(|r| &r.resource_type_id == resource_type_id);
                match attachment {
                    Some(attachment) => {
                        let record = self
                            .resources
                            .get(
                                &request.catalog_id,
                                &attachment.resource_type_id,
                                &attachment.resource_id,
                            )
                            .await?;
                        match record {
                            Some(record) => Some(record),
                            None => {
                                return Err(AppError::internal(format!(
                                    "Resource {} of type {} is not registered in catalog {}",
                                    attachment.resource_id,
                                    attachment.resource_type_id,
                                    request.catalog_id
                                )))
                            }
                        }
                    }
                    None => None,
                }
            }
            ApproverModel::Flow | ApproverModel::RequestSpecified => None,
        };
        Ok(ContextGathered { resolved, resource })
    }

    pub(crate) async fn authorize_stage(
        &self,
        context: ContextGathered,
        action: ApprovalAction,
        acting_user: &str,
    ) -> Result<Authorized, AppError> {
        authorize(
            self.directory.as_ref(),
            AuthorizationContext {
                action,
                request: context.resolved.request(),
                flow: &context.resolved.flow,
                resource: context.resource.as_ref(),
                acting_user,
            },
        )
        .await?;
        Ok(Authorized { context })
    }

    /// Emits a lifecycle event when a notifier is attached. Failures are
    /// logged, never surfaced.
    pub(crate) async fn emit(
        &self,
        kind: ApprovalEventKind,
        request: &ApprovalRequest,
        acting_user: Option<&str>,
        comment: Option<&str>,
    ) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let payload = ApprovalEventPayload::from_request(kind, request, acting_user, comment);
        if let NotificationResult::Failed(reason) = notifier.notify(payload).await {
            tracing::warn!(
                request_id = %request.request_id,
                kind = %kind,
                reason = %reason,
                "Approval event notification failed"
            );
        }
    }
}

// Reads and flow administration.
impl ApprovalEngine {
    pub async fn get_request(&self, request_id: Uuid) -> Result<ApprovalRequest, AppError> {
        self.requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Approval request not found"))
    }

    pub async fn list_requests_by_flow(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
        query: &ListRequestsQuery,
    ) -> Result<RequestPage, AppError> {
        self.registry.flow(catalog_id, approval_flow_id)?;
        let cursor = decode_query_cursor(query)?;
        let slice = self
            .requests
            .list_by_flow(catalog_id, approval_flow_id, cursor, query.limit)
            .await?;
        Ok(RequestPage {
            requests: slice.items,
            next_cursor: slice.next.map(|(ts, id)| encode_cursor(ts, id)),
        })
    }

    pub async fn list_requests_by_requester(
        &self,
        request_user_id: &str,
        query: &ListRequestsQuery,
    ) -> Result<RequestPage, AppError> {
        let cursor = decode_query_cursor(query)?;
        let slice = self
            .requests
            .list_by_requester(request_user_id, cursor, query.limit)
            .await?;
        Ok(RequestPage {
            requests: slice.items,
            next_cursor: slice.next.map(|(ts, id)| encode_cursor(ts, id)),
        })
    }

    /// Resolved flow definition as shown to administrators.
    pub async fn flow_view(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
    ) -> Result<FlowView, AppError> {
        let resolved = resolve_flow(
            &self.registry,
            self.flow_infos.as_ref(),
            catalog_id,
            approval_flow_id,
        )
        .await?;
        Ok(resolved.view())
    }

    /// Replaces the flow's info record. Unset fields clear their stored
    /// counterparts.
    pub async fn set_flow_info(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
        body: SetFlowInfoBody,
    ) -> Result<FlowView, AppError> {
        validator::Validate::validate(&body)?;
        self.registry.flow(catalog_id, approval_flow_id)?;
        self.flow_infos
            .set(ApprovalFlowInfo {
                catalog_id: catalog_id.to_string(),
                approval_flow_id: approval_flow_id.to_string(),
                approver_group_id: body.approver_group_id,
                enable_revoke_override: body.enable_revoke_override,
                updated_date: chrono::Utc::now(),
            })
            .await?;
        self.flow_view(catalog_id, approval_flow_id).await
    }
}

fn decode_query_cursor(
    query: &ListRequestsQuery,
) -> Result<Option<(chrono::DateTime<chrono::Utc>, Uuid)>, AppError> {
    match &query.cursor {
        Some(cursor) => decode_cursor(cursor)
            .map(Some)
            .map_err(|_| AppError::bad_request("Invalid cursor")),
        None => Ok(None),
    }
}
