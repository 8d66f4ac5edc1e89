//! Approval flow info repository for database operations.

use sqlx::PgPool;

use domain::models::ApprovalFlowInfo;
use domain::services::stores::FlowInfoStore;
use shared::error::AppError;

use crate::entities::ApprovalFlowInfoEntity;
use crate::metrics::QueryTimer;
use crate::repositories::db_error;

/// Repository for mutable per-flow operational settings.
#[derive(Clone)]
pub struct FlowInfoRepository {
    pool: PgPool,
}

impl FlowInfoRepository {
    /// Creates a new FlowInfoRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FlowInfoStore for FlowInfoRepository {
    async fn get(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
    ) -> Result<Option<ApprovalFlowInfo>, AppError> {
        let timer = QueryTimer::new("find_approval_flow_info");
        let result = sqlx::query_as::<_, ApprovalFlowInfoEntity>(
            r#"
            SELECT catalog_id, approval_flow_id, approver_group_id,
                   enable_revoke_override, updated_date
            FROM approval_flow_info
            WHERE catalog_id = $1 AND approval_flow_id = $2
            "#,
        )
        .bind(catalog_id)
        .bind(approval_flow_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(db_error)?.map(Into::into))
    }

    async fn set(&self, info: ApprovalFlowInfo) -> Result<ApprovalFlowInfo, AppError> {
        let timer = QueryTimer::new("upsert_approval_flow_info");
        let result = sqlx::query_as::<_, ApprovalFlowInfoEntity>(
            r#"
            INSERT INTO approval_flow_info (
                catalog_id, approval_flow_id, approver_group_id,
                enable_revoke_override, updated_date
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (catalog_id, approval_flow_id) DO UPDATE SET
                approver_group_id = EXCLUDED.approver_group_id,
                enable_revoke_override = EXCLUDED.enable_revoke_override,
                updated_date = EXCLUDED.updated_date
            RETURNING catalog_id, approval_flow_id, approver_group_id,
                      enable_revoke_override, updated_date
            "#,
        )
        .bind(&info.catalog_id)
        .bind(&info.approval_flow_id)
        .bind(&info.approver_group_id)
        .bind(info.enable_revoke_override)
        .bind(info.updated_date)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(db_error)?.into())
    }
}
