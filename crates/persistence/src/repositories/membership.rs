//! Group membership repository for database operations.
//!
//! Memberships mirror the company directory and are refreshed by an external
//! sync job; approval checks treat this table as read-only.

use sqlx::PgPool;

use domain::models::GroupMembership;
use domain::services::stores::GroupDirectory;
use shared::error::AppError;

use crate::entities::GroupMembershipEntity;
use crate::metrics::QueryTimer;
use crate::repositories::db_error;

/// Repository answering group membership queries.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GroupDirectory for MembershipRepository {
    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMembership>, AppError> {
        let timer = QueryTimer::new("find_group_membership");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(
            r#"
            SELECT group_id, user_id, added_date
            FROM group_memberships
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(db_error)?.map(Into::into))
    }
}
