//! Flow-level metadata: approver models, auto-revoke policy, schemas and the
//! store-backed per-flow info record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::validation::validate_identifier;

/// How approvers are determined for a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "approver_type", rename_all = "snake_case")]
pub enum ApproverModel {
    /// One approver group is attached to the flow itself, managed through the
    /// flow info store.
    #[serde(rename = "approval_flow")]
    Flow,
    /// The approver group is read off the requested resource record; the
    /// request must carry exactly one resource of `resource_type_id`.
    Resource { resource_type_id: String },
    /// The requester names the approver group at submit time.
    RequestSpecified,
}

/// Auto-revocation policy attached to a flow. A flow without one rejects
/// requested durations outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AutoRevokePolicy {
    /// Upper bound on requested durations, in the same `P{d}DT{h}H` grammar.
    pub max_duration: String,
}

/// Declared input parameter of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParamSchema {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Declared input resource type of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceSchema {
    pub resource_type_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Mutable per-flow record kept in storage alongside the static catalog
/// definition. Holds what operators manage at runtime rather than at deploy
/// time: the approver group for flow-model flows and an optional override of
/// the static revoke switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalFlowInfo {
    pub catalog_id: String,
    pub approval_flow_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_revoke_override: Option<bool>,
    pub updated_date: DateTime<Utc>,
}

/// Serializable projection of a resolved flow, as returned by the admin API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FlowView {
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub approver_model: ApproverModel,
    pub enable_revoke: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_auto_revoke_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_group_id: Option<String>,
    pub params: Vec<ParamSchema>,
    pub resources: Vec<ResourceSchema>,
}

/// Body for updating the flow info record.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SetFlowInfoBody {
    #[validate(custom(function = validate_group_id))]
    #[serde(default)]
    pub approver_group_id: Option<String>,
    #[serde(default)]
    pub enable_revoke_override: Option<bool>,
}

fn validate_group_id(id: &str) -> Result<(), validator::ValidationError> {
    validate_identifier(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approver_model_serde_tags() {
        let json = serde_json::to_string(&ApproverModel::Flow).unwrap();
        assert_eq!(json, r#"{"approver_type":"approval_flow"}"#);

        let json = serde_json::to_string(&ApproverModel::Resource {
            resource_type_id: "bucket".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"approver_type":"resource","resource_type_id":"bucket"}"#
        );

        let model: ApproverModel =
            serde_json::from_str(r#"{"approver_type":"request_specified"}"#).unwrap();
        assert_eq!(model, ApproverModel::RequestSpecified);
    }

    #[test]
    fn test_auto_revoke_policy_serde() {
        let policy: AutoRevokePolicy =
            serde_json::from_str(r#"{"max_duration":"P30D"}"#).unwrap();
        assert_eq!(policy.max_duration, "P30D");
    }

    #[test]
    fn test_set_flow_info_body_validation() {
        let body = SetFlowInfoBody {
            approver_group_id: Some("data-platform-admins".into()),
            enable_revoke_override: Some(false),
        };
        assert!(body.validate().is_ok());

        let body = SetFlowInfoBody {
            approver_group_id: Some("bad group".into()),
            enable_revoke_override: None,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_flow_view_flattens_approver_model() {
        let view = FlowView {
            catalog_id: "analytics".into(),
            approval_flow_id: "storage-read".into(),
            name: "Storage read access".into(),
            description: None,
            approver_model: ApproverModel::Resource {
                resource_type_id: "bucket".into(),
            },
            enable_revoke: true,
            max_auto_revoke_duration: Some("P30D".into()),
            approver_group_id: None,
            params: vec![],
            resources: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["approver_type"], "resource");
        assert_eq!(json["resource_type_id"], "bucket");
        assert_eq!(json["max_auto_revoke_duration"], "P30D");
    }
}
