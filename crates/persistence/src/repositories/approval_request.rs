//! Approval request repository for database operations.
//!
//! Implements [`ApprovalRequestStore`]: the `mark_*` methods are single
//! conditional `UPDATE ... WHERE status = ... RETURNING` statements, so the
//! status precondition and the write are one atomic step. A returned `None`
//! means another writer got there first.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::ApprovalRequest;
use domain::services::stores::{
    ApprovalRequestStore, MarkApprovedInput, MarkCanceledInput, MarkRejectedInput,
    MarkRevokedInput, MarkValidatedInput, RequestSlice,
};
use shared::error::AppError;

use crate::entities::ApprovalRequestEntity;
use crate::metrics::QueryTimer;
use crate::repositories::db_error;

const REQUEST_COLUMNS: &str = "request_id, catalog_id, approval_flow_id, request_user_id, \
     approver_type, approver_id, input_params, input_resources, request_comment, status, \
     request_date, validated_date, validation_handler_result, approved_date, approved_comment, \
     approved_by_user_id, approved_handler_result, rejected_date, reject_comment, \
     rejected_by_user_id, revoked_date, revoked_comment, revoked_by_user_id, \
     revoked_handler_result, canceled_date, cancel_comment, canceled_by_user_id, \
     auto_revoke_duration";

/// Repository for approval request database operations.
#[derive(Clone)]
pub struct ApprovalRequestRepository {
    pool: PgPool,
}

impl ApprovalRequestRepository {
    /// Creates a new ApprovalRequestRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn slice_from(
        entities: Vec<ApprovalRequestEntity>,
        limit: i64,
    ) -> Result<RequestSlice, AppError> {
        let mut items = entities
            .into_iter()
            .map(ApprovalRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // One extra row was fetched to detect a further page.
        let next = if items.len() as i64 > limit {
            items.truncate(limit as usize);
            items.last().map(|r| (r.request_date, r.request_id))
        } else {
            None
        };
        Ok(RequestSlice { items, next })
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 100)
}

#[async_trait::async_trait]
impl ApprovalRequestStore for ApprovalRequestRepository {
    async fn get(&self, request_id: Uuid) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = QueryTimer::new("find_approval_request_by_id");
        let sql =
            format!("SELECT {REQUEST_COLUMNS} FROM approval_requests WHERE request_id = $1");
        let result = sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(db_error)?.map(TryInto::try_into).transpose()
    }

    async fn put(&self, request: &ApprovalRequest) -> Result<(), AppError> {
        let timer = QueryTimer::new("put_approval_request");
        let result = sqlx::query(
            r#"
            INSERT INTO approval_requests (
                request_id, catalog_id, approval_flow_id, request_user_id,
                approver_type, approver_id, input_params, input_resources,
                request_comment, status, request_date, validated_date,
                validation_handler_result, approved_date, approved_comment,
                approved_by_user_id, approved_handler_result, rejected_date,
                reject_comment, rejected_by_user_id, revoked_date, revoked_comment,
                revoked_by_user_id, revoked_handler_result, canceled_date,
                cancel_comment, canceled_by_user_id, auto_revoke_duration
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                    $27, $28)
            ON CONFLICT (request_id) DO UPDATE SET
                status = EXCLUDED.status,
                validated_date = EXCLUDED.validated_date,
                validation_handler_result = EXCLUDED.validation_handler_result,
                approved_date = EXCLUDED.approved_date,
                approved_comment = EXCLUDED.approved_comment,
                approved_by_user_id = EXCLUDED.approved_by_user_id,
                approved_handler_result = EXCLUDED.approved_handler_result,
                rejected_date = EXCLUDED.rejected_date,
                reject_comment = EXCLUDED.reject_comment,
                rejected_by_user_id = EXCLUDED.rejected_by_user_id,
                revoked_date = EXCLUDED.revoked_date,
                revoked_comment = EXCLUDED.revoked_comment,
                revoked_by_user_id = EXCLUDED.revoked_by_user_id,
                revoked_handler_result = EXCLUDED.revoked_handler_result,
                canceled_date = EXCLUDED.canceled_date,
                cancel_comment = EXCLUDED.cancel_comment,
                canceled_by_user_id = EXCLUDED.canceled_by_user_id,
                auto_revoke_duration = EXCLUDED.auto_revoke_duration
            "#,
        )
        .bind(request.request_id)
        .bind(&request.catalog_id)
        .bind(&request.approval_flow_id)
        .bind(&request.request_user_id)
        .bind(request.approver_type.to_string())
        .bind(&request.approver_id)
        .bind(Json(&request.input_params))
        .bind(Json(&request.input_resources))
        .bind(&request.request_comment)
        .bind(request.status.to_string())
        .bind(request.request_date)
        .bind(request.validated_date)
        .bind(request.validation_handler_result.as_ref().map(Json))
        .bind(request.approved_date)
        .bind(&request.approved_comment)
        .bind(&request.approved_by_user_id)
        .bind(request.approved_handler_result.as_ref().map(Json))
        .bind(request.rejected_date)
        .bind(&request.reject_comment)
        .bind(&request.rejected_by_user_id)
        .bind(request.revoked_date)
        .bind(&request.revoked_comment)
        .bind(&request.revoked_by_user_id)
        .bind(request.revoked_handler_result.as_ref().map(Json))
        .bind(request.canceled_date)
        .bind(&request.cancel_comment)
        .bind(&request.canceled_by_user_id)
        .bind(&request.auto_revoke_duration)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(db_error)?;
        Ok(())
    }

    async fn mark_approved(
        &self,
        input: MarkApprovedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = QueryTimer::new("mark_approval_request_approved");
        let sql = format!(
            r#"
            UPDATE approval_requests
            SET status = 'approved', approved_date = $2, approved_comment = $3,
                approved_by_user_id = $4, auto_revoke_duration = $5
            WHERE request_id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
            .bind(input.request_id)
            .bind(input.approved_date)
            .bind(&input.approved_comment)
            .bind(&input.approved_by_user_id)
            .bind(&input.auto_revoke_duration)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(db_error)?.map(TryInto::try_into).transpose()
    }

    async fn mark_rejected(
        &self,
        input: MarkRejectedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = QueryTimer::new("mark_approval_request_rejected");
        let sql = format!(
            r#"
            UPDATE approval_requests
            SET status = 'rejected', rejected_date = $2, reject_comment = $3,
                rejected_by_user_id = $4
            WHERE request_id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
            .bind(input.request_id)
            .bind(input.rejected_date)
            .bind(&input.reject_comment)
            .bind(&input.rejected_by_user_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(db_error)?.map(TryInto::try_into).transpose()
    }

    async fn mark_revoked(
        &self,
        input: MarkRevokedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = QueryTimer::new("mark_approval_request_revoked");
        // Records written under an earlier schema stop at 'approved'; those
        // qualify only when the handler outcome was recorded.
        let sql = format!(
            r#"
            UPDATE approval_requests
            SET status = 'revoked', revoked_date = $2, revoked_comment = $3,
                revoked_by_user_id = $4
            WHERE request_id = $1
              AND (status = 'approved_action_succeeded'
                   OR (status = 'approved' AND approved_handler_result IS NOT NULL))
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
            .bind(input.request_id)
            .bind(input.revoked_date)
            .bind(&input.revoked_comment)
            .bind(&input.revoked_by_user_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(db_error)?.map(TryInto::try_into).transpose()
    }

    async fn mark_canceled(
        &self,
        input: MarkCanceledInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = QueryTimer::new("mark_approval_request_canceled");
        let sql = format!(
            r#"
            UPDATE approval_requests
            SET status = 'canceled', canceled_date = $2, cancel_comment = $3,
                canceled_by_user_id = $4
            WHERE request_id = $1
              AND status IN ('pending', 'approved_action_failed', 'rejected')
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
            .bind(input.request_id)
            .bind(input.canceled_date)
            .bind(&input.cancel_comment)
            .bind(&input.canceled_by_user_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(db_error)?.map(TryInto::try_into).transpose()
    }

    async fn mark_validated(
        &self,
        input: MarkValidatedInput,
    ) -> Result<Option<ApprovalRequest>, AppError> {
        let timer = QueryTimer::new("mark_approval_request_validated");
        let sql = format!(
            r#"
            UPDATE approval_requests
            SET status = CASE WHEN $4 THEN 'pending' ELSE 'validation_failed' END,
                validated_date = $2, validation_handler_result = $3
            WHERE request_id = $1 AND status = 'submitted'
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
            .bind(input.request_id)
            .bind(input.validated_date)
            .bind(Json(&input.handler_result))
            .bind(input.passed)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result.map_err(db_error)?.map(TryInto::try_into).transpose()
    }

    async fn list_by_flow(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<RequestSlice, AppError> {
        let limit = clamp_limit(limit);
        let timer = QueryTimer::new("list_approval_requests_by_flow");
        let result = if let Some((cursor_date, cursor_id)) = cursor {
            let sql = format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM approval_requests
                WHERE catalog_id = $1 AND approval_flow_id = $2
                  AND (request_date, request_id) < ($3, $4)
                ORDER BY request_date DESC, request_id DESC
                LIMIT $5
                "#
            );
            sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
                .bind(catalog_id)
                .bind(approval_flow_id)
                .bind(cursor_date)
                .bind(cursor_id)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await
        } else {
            let sql = format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM approval_requests
                WHERE catalog_id = $1 AND approval_flow_id = $2
                ORDER BY request_date DESC, request_id DESC
                LIMIT $3
                "#
            );
            sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
                .bind(catalog_id)
                .bind(approval_flow_id)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await
        };
        timer.record();
        Self::slice_from(result.map_err(db_error)?, limit)
    }

    async fn list_by_requester(
        &self,
        request_user_id: &str,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<RequestSlice, AppError> {
        let limit = clamp_limit(limit);
        let timer = QueryTimer::new("list_approval_requests_by_requester");
        let result = if let Some((cursor_date, cursor_id)) = cursor {
            let sql = format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM approval_requests
                WHERE request_user_id = $1
                  AND (request_date, request_id) < ($2, $3)
                ORDER BY request_date DESC, request_id DESC
                LIMIT $4
                "#
            );
            sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
                .bind(request_user_id)
                .bind(cursor_date)
                .bind(cursor_id)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await
        } else {
            let sql = format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM approval_requests
                WHERE request_user_id = $1
                ORDER BY request_date DESC, request_id DESC
                LIMIT $2
                "#
            );
            sqlx::query_as::<_, ApprovalRequestEntity>(&sql)
                .bind(request_user_id)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await
        };
        timer.record();
        Self::slice_from(result.map_err(db_error)?, limit)
    }
}
