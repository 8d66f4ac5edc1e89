//! Approval request domain models and per-transition payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::validation::{validate_comment, validate_identifier, validate_param_value};

/// Sentinel identity for engine-internal actors such as the auto-revoke
/// dispatcher. May always revoke; the only identity allowed to cancel.
pub const SYSTEM_USER_ID: &str = "system";

/// Status of an approval request, the state-machine discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Submitted,
    ValidationFailed,
    Pending,
    /// In-flight: the conditional write succeeded but the approved handler
    /// outcome has not been recorded yet. Also the terminal status of records
    /// written by earlier schema versions.
    Approved,
    ApprovedActionSucceeded,
    ApprovedActionFailed,
    Rejected,
    /// In-flight counterpart of `Approved` for the revoke path.
    Revoked,
    RevokedActionSucceeded,
    RevokedActionFailed,
    Canceled,
}

impl RequestStatus {
    /// Whether a revoke may start from this status. Records stuck on the
    /// legacy `Approved` status qualify only when an approved handler result
    /// was recorded.
    pub fn can_revoke_from(&self, has_approved_handler_result: bool) -> bool {
        match self {
            RequestStatus::ApprovedActionSucceeded => true,
            RequestStatus::Approved => has_approved_handler_result,
            _ => false,
        }
    }

    /// Whether a cancel may start from this status. Pending change requests
    /// are the primary case; abandoned failed/rejected requests may also be
    /// cleared.
    pub fn can_cancel_from(&self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::ApprovedActionFailed | RequestStatus::Rejected
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Submitted => write!(f, "submitted"),
            RequestStatus::ValidationFailed => write!(f, "validation_failed"),
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Approved => write!(f, "approved"),
            RequestStatus::ApprovedActionSucceeded => write!(f, "approved_action_succeeded"),
            RequestStatus::ApprovedActionFailed => write!(f, "approved_action_failed"),
            RequestStatus::Rejected => write!(f, "rejected"),
            RequestStatus::Revoked => write!(f, "revoked"),
            RequestStatus::RevokedActionSucceeded => write!(f, "revoked_action_succeeded"),
            RequestStatus::RevokedActionFailed => write!(f, "revoked_action_failed"),
            RequestStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// How the approver id on a request is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverType {
    Group,
}

impl std::fmt::Display for ApproverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApproverType::Group => write!(f, "group"),
        }
    }
}

/// A single input parameter value: string, number or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl ParamValue {
    /// Renders the value the way handlers receive it.
    pub fn as_display_string(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::String(s) => s.clone(),
        }
    }
}

/// An ordered input parameter `{id, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct InputParam {
    #[validate(custom(function = validate_identifier))]
    pub id: String,
    #[validate(custom(function = validate_param_value_field))]
    pub value: ParamValue,
}

fn validate_param_value_field(value: &ParamValue) -> Result<(), validator::ValidationError> {
    match value {
        ParamValue::String(s) => validate_param_value(s),
        _ => Ok(()),
    }
}

/// An ordered input resource `{resource_type_id, resource_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct InputResource {
    #[validate(custom(function = validate_identifier))]
    pub resource_type_id: String,
    #[validate(custom(function = validate_identifier))]
    pub resource_id: String,
}

/// Outcome reported by a flow handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HandlerResult {
    pub is_success: bool,
    pub message: String,
}

impl HandlerResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            is_success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: message.into(),
        }
    }
}

/// The approval request aggregate.
///
/// Owned by storage; the engine holds it only as a value during a transition
/// and persists a new record state before returning it. Each timestamped
/// sub-result block is populated exactly when its status has been reached, and
/// handler-result fields only once the handler actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalRequest {
    pub request_id: Uuid,
    pub catalog_id: String,
    pub approval_flow_id: String,

    pub request_user_id: String,
    pub approver_type: ApproverType,
    /// Group consulted for authorization under the request-specified model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<String>,

    pub input_params: Vec<InputParam>,
    pub input_resources: Vec<InputResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_comment: Option<String>,

    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_handler_result: Option<HandlerResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_handler_result: Option<HandlerResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by_user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_handler_result: Option<HandlerResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_by_user_id: Option<String>,

    /// Bounded duration string, set at approval time; triggers scheduled
    /// auto-revocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_revoke_duration: Option<String>,
}

impl ApprovalRequest {
    /// Whether this record satisfies the revoke precondition, including the
    /// legacy `approved`-with-handler-result carve-out.
    pub fn is_revocable(&self) -> bool {
        self.status
            .can_revoke_from(self.approved_handler_result.is_some())
    }
}

/// Body for submitting a new approval request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SubmitRequestBody {
    /// Approver group, consulted only when the flow uses the
    /// request-specified model.
    #[validate(custom(function = validate_optional_identifier))]
    #[serde(default)]
    pub approver_id: Option<String>,

    #[validate(length(max = 64, message = "Too many input parameters"))]
    #[validate(nested)]
    #[serde(default)]
    pub input_params: Vec<InputParam>,

    #[validate(length(max = 32, message = "Too many input resources"))]
    #[validate(nested)]
    #[serde(default)]
    pub input_resources: Vec<InputResource>,

    #[validate(custom(function = validate_optional_comment))]
    #[serde(default)]
    pub request_comment: Option<String>,
}

/// Body for the approve transition.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ApproveRequestBody {
    #[validate(custom(function = validate_optional_comment))]
    #[serde(default)]
    pub comment: Option<String>,

    /// Optional bounded duration (`P{days}D`, `PT{hours}H`, `P{days}DT{hours}H`)
    /// after which the grant is revoked automatically.
    #[serde(default)]
    pub auto_revoke_duration: Option<String>,
}

/// Comment-only body shared by reject, revoke and cancel.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ActionCommentBody {
    #[validate(custom(function = validate_optional_comment))]
    #[serde(default)]
    pub comment: Option<String>,
}

/// Query parameters for request listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListRequestsQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    25
}

/// One page of approval requests plus the continuation token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestPage {
    pub requests: Vec<ApprovalRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

fn validate_optional_identifier(id: &str) -> Result<(), validator::ValidationError> {
    validate_identifier(id)
}

fn validate_optional_comment(comment: &str) -> Result<(), validator::ValidationError> {
    validate_comment(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status_display() {
        assert_eq!(RequestStatus::Submitted.to_string(), "submitted");
        assert_eq!(
            RequestStatus::ValidationFailed.to_string(),
            "validation_failed"
        );
        assert_eq!(RequestStatus::Pending.to_string(), "pending");
        assert_eq!(RequestStatus::Approved.to_string(), "approved");
        assert_eq!(
            RequestStatus::ApprovedActionSucceeded.to_string(),
            "approved_action_succeeded"
        );
        assert_eq!(
            RequestStatus::RevokedActionFailed.to_string(),
            "revoked_action_failed"
        );
        assert_eq!(RequestStatus::Canceled.to_string(), "canceled");
    }

    #[test]
    fn test_can_revoke_from() {
        assert!(RequestStatus::ApprovedActionSucceeded.can_revoke_from(true));
        assert!(RequestStatus::ApprovedActionSucceeded.can_revoke_from(false));
        // Legacy carve-out: literal `approved` only with a recorded result.
        assert!(RequestStatus::Approved.can_revoke_from(true));
        assert!(!RequestStatus::Approved.can_revoke_from(false));
        assert!(!RequestStatus::Pending.can_revoke_from(true));
        assert!(!RequestStatus::RevokedActionSucceeded.can_revoke_from(true));
    }

    #[test]
    fn test_can_cancel_from() {
        assert!(RequestStatus::Pending.can_cancel_from());
        assert!(RequestStatus::ApprovedActionFailed.can_cancel_from());
        assert!(RequestStatus::Rejected.can_cancel_from());
        assert!(!RequestStatus::Submitted.can_cancel_from());
        assert!(!RequestStatus::ApprovedActionSucceeded.can_cancel_from());
        assert!(!RequestStatus::Canceled.can_cancel_from());
    }

    #[test]
    fn test_param_value_untagged_serde() {
        let params: Vec<InputParam> = serde_json::from_str(
            r#"[{"id":"region","value":"eu-west-1"},{"id":"ttl_days","value":7},{"id":"read_only","value":true}]"#,
        )
        .unwrap();
        assert_eq!(params[0].value, ParamValue::String("eu-west-1".into()));
        assert_eq!(params[1].value, ParamValue::Number(7.0));
        assert_eq!(params[2].value, ParamValue::Bool(true));
    }

    #[test]
    fn test_param_value_display_string() {
        assert_eq!(ParamValue::Bool(false).as_display_string(), "false");
        assert_eq!(ParamValue::Number(7.0).as_display_string(), "7");
        assert_eq!(
            ParamValue::String("bucket-a".into()).as_display_string(),
            "bucket-a"
        );
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&RequestStatus::ApprovedActionSucceeded).unwrap();
        assert_eq!(json, "\"approved_action_succeeded\"");
        let status: RequestStatus = serde_json::from_str("\"validation_failed\"").unwrap();
        assert_eq!(status, RequestStatus::ValidationFailed);
    }

    #[test]
    fn test_submit_body_validation() {
        let body = SubmitRequestBody {
            approver_id: None,
            input_params: vec![InputParam {
                id: "region".into(),
                value: ParamValue::String("eu-west-1".into()),
            }],
            input_resources: vec![InputResource {
                resource_type_id: "bucket".into(),
                resource_id: "reports".into(),
            }],
            request_comment: Some("quarterly report access".into()),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_submit_body_rejects_bad_param_id() {
        let body = SubmitRequestBody {
            approver_id: None,
            input_params: vec![InputParam {
                id: "has space".into(),
                value: ParamValue::Bool(true),
            }],
            input_resources: vec![],
            request_comment: None,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_approve_body_deserialize() {
        let body: ApproveRequestBody =
            serde_json::from_str(r#"{"comment":"ok","auto_revoke_duration":"P5D"}"#).unwrap();
        assert_eq!(body.comment.as_deref(), Some("ok"));
        assert_eq!(body.auto_revoke_duration.as_deref(), Some("P5D"));
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListRequestsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 25);
        assert!(query.cursor.is_none());
    }

    #[test]
    fn test_is_revocable_legacy_record() {
        let mut request = fixture_request();
        request.status = RequestStatus::Approved;
        request.approved_handler_result = Some(HandlerResult::success("granted"));
        assert!(request.is_revocable());

        request.approved_handler_result = None;
        assert!(!request.is_revocable());
    }

    fn fixture_request() -> ApprovalRequest {
        ApprovalRequest {
            request_id: Uuid::now_v7(),
            catalog_id: "analytics".into(),
            approval_flow_id: "storage-read".into(),
            request_user_id: "alice".into(),
            approver_type: ApproverType::Group,
            approver_id: None,
            input_params: vec![],
            input_resources: vec![],
            request_comment: None,
            status: RequestStatus::Submitted,
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
}
