//! Group membership records served by the identity directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Membership of one user in one approver group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMembership {
    pub group_id: String,
    pub user_id: String,
    pub added_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_membership_serde() {
        let membership = GroupMembership {
            group_id: "data-owners".into(),
            user_id: "alice".into(),
            added_date: Utc::now(),
        };
        let json = serde_json::to_value(&membership).unwrap();
        assert_eq!(json["group_id"], "data-owners");
        assert_eq!(json["user_id"], "alice");
    }
}
