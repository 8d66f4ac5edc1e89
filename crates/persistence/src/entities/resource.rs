//! Registered resource entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::ResourceRecord;

/// Database row mapping for the resources table.
#[derive(Debug, Clone, FromRow)]
pub struct ResourceEntity {
    pub catalog_id: String,
    pub resource_type_id: String,
    pub resource_id: String,
    pub name: Option<String>,
    pub approver_group_id: Option<String>,
    pub registered_date: DateTime<Utc>,
}

impl From<ResourceEntity> for ResourceRecord {
    fn from(entity: ResourceEntity) -> Self {
        ResourceRecord {
            catalog_id: entity.catalog_id,
            resource_type_id: entity.resource_type_id,
            resource_id: entity.resource_id,
            name: entity.name,
            approver_group_id: entity.approver_group_id,
            registered_date: entity.registered_date,
        }
    }
}
