//! Authorization decisions for approve, reject and revoke.
//!
//! The approver model on the flow decides where the approver group comes
//! from; each source has its own decision function so they stay individually
//! testable. Revoke additionally grants the original requester and the
//! sentinel system identity, checked before any group lookup.

use shared::error::AppError;

use crate::models::{ApprovalRequest, ApproverModel, ApproverType, ResourceRecord, SYSTEM_USER_ID};
use crate::services::catalog::ResolvedFlow;
use crate::services::stores::GroupDirectory;

/// Action being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
    Revoke,
}

impl std::fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalAction::Approve => write!(f, "approve"),
            ApprovalAction::Reject => write!(f, "reject"),
            ApprovalAction::Revoke => write!(f, "revoke"),
        }
    }
}

/// Everything the dispatcher needs for one decision.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationContext<'a> {
    pub action: ApprovalAction,
    pub request: &'a ApprovalRequest,
    pub flow: &'a ResolvedFlow,
    /// Resource record looked up for resource-model flows; `None` when the
    /// request carries no matching attachment.
    pub resource: Option<&'a ResourceRecord>,
    pub acting_user: &'a str,
}

fn denial(action: ApprovalAction, user_id: &str) -> AppError {
    AppError::forbidden(format!(
        "User {user_id} is not authorized to {action} this request"
    ))
}

async fn check_membership(
    directory: &dyn GroupDirectory,
    group_id: &str,
    user_id: &str,
    action: ApprovalAction,
) -> Result<(), AppError> {
    match directory.membership(group_id, user_id).await? {
        Some(_) => Ok(()),
        None => Err(denial(action, user_id)),
    }
}

/// Flow model: the group is attached to the flow itself. An unset group
/// denies everyone.
pub async fn authorize_flow_group(
    directory: &dyn GroupDirectory,
    approver_group_id: Option<&str>,
    user_id: &str,
    action: ApprovalAction,
) -> Result<(), AppError> {
    match approver_group_id {
        Some(group_id) => check_membership(directory, group_id, user_id, action).await,
        None => Err(denial(action, user_id)),
    }
}

/// Resource model: the group comes off the registered resource record. A
/// request without the matching attachment is a configuration inconsistency,
/// not a caller mistake.
pub async fn authorize_resource_group(
    directory: &dyn GroupDirectory,
    resource_type_id: &str,
    resource: Option<&ResourceRecord>,
    user_id: &str,
    action: ApprovalAction,
) -> Result<(), AppError> {
    let Some(resource) = resource else {
        return Err(AppError::internal(format!(
            "No input resource of type {resource_type_id} attached to the request"
        )));
    };
    match resource.approver_group_id.as_deref() {
        Some(group_id) => check_membership(directory, group_id, user_id, action).await,
        None => Err(denial(action, user_id)),
    }
}

/// Request-specified model: the group was named on the request at submit
/// time.
pub async fn authorize_request_group(
    directory: &dyn GroupDirectory,
    approver_type: ApproverType,
    approver_id: Option<&str>,
    user_id: &str,
    action: ApprovalAction,
) -> Result<(), AppError> {
    match approver_type {
        ApproverType::Group => match approver_id {
            Some(group_id) => check_membership(directory, group_id, user_id, action).await,
            None => Err(denial(action, user_id)),
        },
    }
}

/// Revoke-only override: the original requester and the system identity may
/// revoke regardless of group membership.
pub fn may_revoke_without_group(request_user_id: &str, acting_user: &str) -> bool {
    acting_user == request_user_id || acting_user == SYSTEM_USER_ID
}

/// Dispatches to the decision function selected by the flow's approver
/// model. For revoke the override runs first and short-circuits the group
/// lookup entirely.
pub async fn authorize(
    directory: &dyn GroupDirectory,
    ctx: AuthorizationContext<'_>,
) -> Result<(), AppError> {
    if ctx.action == ApprovalAction::Revoke
        && may_revoke_without_group(&ctx.request.request_user_id, ctx.acting_user)
    {
        return Ok(());
    }

    match &ctx.flow.approver {
        ApproverModel::Flow => {
            authorize_flow_group(
                directory,
                ctx.flow.approver_group_id.as_deref(),
                ctx.acting_user,
                ctx.action,
            )
            .await
        }
        ApproverModel::Resource { resource_type_id } => {
            authorize_resource_group(
                directory,
                resource_type_id,
                ctx.resource,
                ctx.acting_user,
                ctx.action,
            )
            .await
        }
        ApproverModel::RequestSpecified => {
            authorize_request_group(
                directory,
                ctx.request.approver_type,
                ctx.request.approver_id.as_deref(),
                ctx.acting_user,
                ctx.action,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AutoRevokePolicy, InputResource, RequestStatus};
    use crate::services::handler::AcceptHandler;
    use crate::services::stores::InMemoryGroupDirectory;
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    fn resolved_flow(approver: ApproverModel, group: Option<&str>) -> ResolvedFlow {
        ResolvedFlow {
            catalog_id: "analytics".into(),
            approval_flow_id: "storage-read".into(),
            name: "Storage read".into(),
            description: None,
            params: vec![],
            resources: vec![],
            approver,
            enable_revoke: true,
            auto_revoke: Some(AutoRevokePolicy {
                max_duration: "P30D".into(),
            }),
            approver_group_id: group.map(Into::into),
            handler: Arc::new(AcceptHandler),
        }
    }

    fn request(requester: &str, approver_id: Option<&str>) -> ApprovalRequest {
        ApprovalRequest {
            request_id: Uuid::now_v7(),
            catalog_id: "analytics".into(),
            approval_flow_id: "storage-read".into(),
            request_user_id: requester.into(),
            approver_type: ApproverType::Group,
            approver_id: approver_id.map(Into::into),
            input_params: vec![],
            input_resources: vec![InputResource {
                resource_type_id: "bucket".into(),
                resource_id: "reports".into(),
            }],
            request_comment: None,
            status: RequestStatus::Pending,
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
        }
    }

    fn resource(group: Option<&str>) -> ResourceRecord {
        ResourceRecord {
            catalog_id: "analytics".into(),
            resource_type_id: "bucket".into(),
            resource_id: "reports".into(),
            name: None,
            approver_group_id: group.map(Into::into),
            registered_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_flow_group_member_allowed() {
        let directory = InMemoryGroupDirectory::new();
        directory.add_member("data-owners", "bob").await;

        let result = authorize_flow_group(
            &directory,
            Some("data-owners"),
            "bob",
            ApprovalAction::Approve,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_flow_group_non_member_forbidden() {
        let directory = InMemoryGroupDirectory::new();
        directory.add_member("data-owners", "bob").await;

        let err = authorize_flow_group(
            &directory,
            Some("data-owners"),
            "mallory",
            ApprovalAction::Approve,
        )
        .await
        .unwrap_err();
        assert!(err.is_forbidden());
        assert!(err.user_message().contains("approve"));
    }

    #[tokio::test]
    async fn test_flow_group_unset_forbidden() {
        let directory = InMemoryGroupDirectory::new();
        let err = authorize_flow_group(&directory, None, "bob", ApprovalAction::Reject)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_resource_missing_attachment_is_internal() {
        let directory = InMemoryGroupDirectory::new();
        let err = authorize_resource_group(&directory, "bucket", None, "bob", ApprovalAction::Approve)
            .await
            .unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.user_message(), shared::error::GENERIC_USER_MESSAGE);
    }

    #[tokio::test]
    async fn test_resource_without_group_forbidden() {
        let directory = InMemoryGroupDirectory::new();
        let record = resource(None);
        let err = authorize_resource_group(
            &directory,
            "bucket",
            Some(&record),
            "bob",
            ApprovalAction::Approve,
        )
        .await
        .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_resource_group_member_allowed() {
        let directory = InMemoryGroupDirectory::new();
        directory.add_member("bucket-owners", "bob").await;
        let record = resource(Some("bucket-owners"));

        let result = authorize_resource_group(
            &directory,
            "bucket",
            Some(&record),
            "bob",
            ApprovalAction::Approve,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_request_specified_group() {
        let directory = InMemoryGroupDirectory::new();
        directory.add_member("chosen-approvers", "bob").await;

        assert!(authorize_request_group(
            &directory,
            ApproverType::Group,
            Some("chosen-approvers"),
            "bob",
            ApprovalAction::Approve,
        )
        .await
        .is_ok());

        let err = authorize_request_group(
            &directory,
            ApproverType::Group,
            None,
            "bob",
            ApprovalAction::Approve,
        )
        .await
        .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_revoke_override_predicate() {
        assert!(may_revoke_without_group("alice", "alice"));
        assert!(may_revoke_without_group("alice", "system"));
        assert!(!may_revoke_without_group("alice", "bob"));
    }

    #[tokio::test]
    async fn test_requester_may_revoke_without_membership() {
        let directory = InMemoryGroupDirectory::new();
        let flow = resolved_flow(ApproverModel::Flow, Some("data-owners"));
        let req = request("alice", None);

        let result = authorize(
            &directory,
            AuthorizationContext {
                action: ApprovalAction::Revoke,
                request: &req,
                flow: &flow,
                resource: None,
                acting_user: "alice",
            },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_system_may_revoke() {
        let directory = InMemoryGroupDirectory::new();
        let flow = resolved_flow(ApproverModel::Flow, Some("data-owners"));
        let req = request("alice", None);

        let result = authorize(
            &directory,
            AuthorizationContext {
                action: ApprovalAction::Revoke,
                request: &req,
                flow: &flow,
                resource: None,
                acting_user: SYSTEM_USER_ID,
            },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_override_does_not_apply_to_approve() {
        let directory = InMemoryGroupDirectory::new();
        let flow = resolved_flow(ApproverModel::Flow, Some("data-owners"));
        let req = request("alice", None);

        let err = authorize(
            &directory,
            AuthorizationContext {
                action: ApprovalAction::Approve,
                request: &req,
                flow: &flow,
                resource: None,
                acting_user: "alice",
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_dispatch_by_model() {
        let directory = InMemoryGroupDirectory::new();
        directory.add_member("chosen-approvers", "bob").await;

        let flow = resolved_flow(ApproverModel::RequestSpecified, None);
        let req = request("alice", Some("chosen-approvers"));

        let result = authorize(
            &directory,
            AuthorizationContext {
                action: ApprovalAction::Approve,
                request: &req,
                flow: &flow,
                resource: None,
                acting_user: "bob",
            },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_by_non_requester_needs_membership() {
        let directory = InMemoryGroupDirectory::new();
        let flow = resolved_flow(ApproverModel::Flow, Some("data-owners"));
        let req = request("alice", None);

        let err = authorize(
            &directory,
            AuthorizationContext {
                action: ApprovalAction::Revoke,
                request: &req,
                flow: &flow,
                resource: None,
                acting_user: "bob",
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_forbidden());
    }
}
