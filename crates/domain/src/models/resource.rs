//! Registered resource records consulted by resource-scoped authorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resource registered under a catalog. Authorization under the resource
/// approver model reads `approver_group_id` off this record; nothing else in
/// the engine interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceRecord {
    pub catalog_id: String,
    pub resource_type_id: String,
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_group_id: Option<String>,
    pub registered_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_record_serde() {
        let record = ResourceRecord {
            catalog_id: "analytics".into(),
            resource_type_id: "bucket".into(),
            resource_id: "reports".into(),
            name: Some("Reports bucket".into()),
            approver_group_id: Some("data-owners".into()),
            registered_date: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["resource_type_id"], "bucket");
        assert_eq!(json["approver_group_id"], "data-owners");
    }
}
