//! Registered resource repository for database operations.
//!
//! Rows in the resources table are written by the platform inventory sync,
//! not by this service; the engine only reads them to resolve per-resource
//! approver groups.

use sqlx::PgPool;

use domain::models::ResourceRecord;
use domain::services::stores::ResourceStore;
use shared::error::AppError;

use crate::entities::ResourceEntity;
use crate::metrics::QueryTimer;
use crate::repositories::db_error;

/// Repository for registered resource lookups.
#[derive(Clone)]
pub struct ResourceRepository {
    pool: PgPool,
}

impl ResourceRepository {
    /// Creates a new ResourceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ResourceStore for ResourceRepository {
    async fn get(
        &self,
        catalog_id: &str,
        resource_type_id: &str,
        resource_id: &str,
    ) -> Result<Option<ResourceRecord>, AppError> {
        let timer = QueryTimer::new("find_resource");
        let result = sqlx::query_as::<_, ResourceEntity>(
            r#"
            SELECT catalog_id, resource_type_id, resource_id, name,
                   approver_group_id, registered_date
            FROM resources
            WHERE catalog_id = $1 AND resource_type_id = $2 AND resource_id = $3
            "#,
        )
        .bind(catalog_id)
        .bind(resource_type_id)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(db_error)?.map(Into::into))
    }
}
