//! Group membership entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::GroupMembership;

/// Database row mapping for the group_memberships table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMembershipEntity {
    pub group_id: String,
    pub user_id: String,
    pub added_date: DateTime<Utc>,
}

impl From<GroupMembershipEntity> for GroupMembership {
    fn from(entity: GroupMembershipEntity) -> Self {
        GroupMembership {
            group_id: entity.group_id,
            user_id: entity.user_id,
            added_date: entity.added_date,
        }
    }
}
