//! Approval flow info entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::ApprovalFlowInfo;

/// Database row mapping for the approval_flow_info table.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalFlowInfoEntity {
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub approver_group_id: Option<String>,
    pub enable_revoke_override: Option<bool>,
    pub updated_date: DateTime<Utc>,
}

impl From<ApprovalFlowInfoEntity> for ApprovalFlowInfo {
    fn from(entity: ApprovalFlowInfoEntity) -> Self {
        ApprovalFlowInfo {
            catalog_id: entity.catalog_id,
            approval_flow_id: entity.approval_flow_id,
            approver_group_id: entity.approver_group_id,
            enable_revoke_override: entity.enable_revoke_override,
            updated_date: entity.updated_date,
        }
    }
}
