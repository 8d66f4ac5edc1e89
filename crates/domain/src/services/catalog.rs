//! Catalog registry and flow resolution.
//!
//! Catalogs and their flows are static configuration loaded at startup; the
//! registry is a read-only lookup over them. Resolution merges the static
//! flow definition with the mutable [`ApprovalFlowInfo`] record: static
//! config wins descriptive fields, the persisted record supplies the approver
//! group and may override the revoke switch.

use std::collections::HashMap;
use std::sync::Arc;

use shared::error::AppError;

use crate::models::{
    ApprovalFlowInfo, ApproverModel, AutoRevokePolicy, FlowView, ParamSchema, ResourceSchema,
};
use crate::services::handler::ApprovalActionHandler;
use crate::services::stores::FlowInfoStore;

/// Static definition of one approval flow within a catalog.
#[derive(Clone)]
pub struct ApprovalFlowConfig {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ParamSchema>,
    pub resources: Vec<ResourceSchema>,
    pub approver: ApproverModel,
    pub enable_revoke: bool,
    pub auto_revoke: Option<AutoRevokePolicy>,
    pub handler: Arc<dyn ApprovalActionHandler>,
}

impl std::fmt::Debug for ApprovalFlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalFlowConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("approver", &self.approver)
            .field("enable_revoke", &self.enable_revoke)
            .field("auto_revoke", &self.auto_revoke)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Static definition of one catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub id: String,
    pub name: String,
    pub approval_flows: Vec<ApprovalFlowConfig>,
}

/// Read-only lookup over the configured catalogs.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    catalogs: HashMap<String, CatalogConfig>,
}

impl CatalogRegistry {
    /// Builds the registry, rejecting duplicate catalog or flow ids. Both are
    /// configuration mistakes best caught at startup.
    pub fn new(catalogs: Vec<CatalogConfig>) -> Result<Self, AppError> {
        let mut map = HashMap::with_capacity(catalogs.len());
        for catalog in catalogs {
            let mut seen_flows = std::collections::HashSet::new();
            for flow in &catalog.approval_flows {
                if !seen_flows.insert(flow.id.clone()) {
                    return Err(AppError::internal(format!(
                        "Duplicate approval flow id {} in catalog {}",
                        flow.id, catalog.id
                    )));
                }
            }
            if map.insert(catalog.id.clone(), catalog).is_some() {
                return Err(AppError::internal("Duplicate catalog id in configuration"));
            }
        }
        Ok(Self { catalogs: map })
    }

    pub fn catalog(&self, catalog_id: &str) -> Option<&CatalogConfig> {
        self.catalogs.get(catalog_id)
    }

    /// Looks up a flow by id within a catalog. An empty flow id never
    /// resolves.
    pub fn flow(
        &self,
        catalog_id: &str,
        approval_flow_id: &str,
    ) -> Result<&ApprovalFlowConfig, AppError> {
        if approval_flow_id.is_empty() {
            return Err(AppError::not_found(format!(
                "Approval flow not found in catalog {catalog_id}"
            )));
        }
        let catalog = self
            .catalog(catalog_id)
            .ok_or_else(|| AppError::not_found(format!("Catalog {catalog_id} not found")))?;
        catalog
            .approval_flows
            .iter()
            .find(|flow| flow.id == approval_flow_id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Approval flow {approval_flow_id} not found in catalog {catalog_id}"
                ))
            })
    }
}

/// A flow definition merged with its persisted info record. Every transition
/// that needs the handler or the approver model starts here.
#[derive(Clone)]
pub struct ResolvedFlow {
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ParamSchema>,
    pub resources: Vec<ResourceSchema>,
    pub approver: ApproverModel,
    /// Effective switch: the info record's override when set, the static
    /// value otherwise.
    pub enable_revoke: bool,
    pub auto_revoke: Option<AutoRevokePolicy>,
    /// From the info record; consulted by flow-model authorization.
    pub approver_group_id: Option<String>,
    pub handler: Arc<dyn ApprovalActionHandler>,
}

impl std::fmt::Debug for ResolvedFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFlow")
            .field("catalog_id", &self.catalog_id)
            .field("approval_flow_id", &self.approval_flow_id)
            .field("approver", &self.approver)
            .field("enable_revoke", &self.enable_revoke)
            .field("approver_group_id", &self.approver_group_id)
            .field("handler", &self.handler.name())
            .finish()
    }
}

impl ResolvedFlow {
    /// Serializable projection for the admin API.
    pub fn view(&self) -> FlowView {
        FlowView {
            catalog_id: self.catalog_id.clone(),
            approval_flow_id: self.approval_flow_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            approver_model: self.approver.clone(),
            enable_revoke: self.enable_revoke,
            max_auto_revoke_duration: self
                .auto_revoke
                .as_ref()
                .map(|policy| policy.max_duration.clone()),
            approver_group_id: self.approver_group_id.clone(),
            params: self.params.clone(),
            resources: self.resources.clone(),
        }
    }
}

/// Resolves a flow and merges the persisted info record over it.
pub async fn resolve_flow(
    registry: &CatalogRegistry,
    flow_infos: &dyn FlowInfoStore,
    catalog_id: &str,
    approval_flow_id: &str,
) -> Result<ResolvedFlow, AppError> {
    let config = registry.flow(catalog_id, approval_flow_id)?;
    let info: Option<ApprovalFlowInfo> = flow_infos.get(catalog_id, approval_flow_id).await?;

    let (approver_group_id, enable_revoke_override) = match info {
        Some(info) => (info.approver_group_id, info.enable_revoke_override),
        None => (None, None),
    };

    Ok(ResolvedFlow {
        catalog_id: catalog_id.to_string(),
        approval_flow_id: approval_flow_id.to_string(),
        name: config.name.clone(),
        description: config.description.clone(),
        params: config.params.clone(),
        resources: config.resources.clone(),
        approver: config.approver.clone(),
        enable_revoke: enable_revoke_override.unwrap_or(config.enable_revoke),
        auto_revoke: config.auto_revoke.clone(),
        approver_group_id,
        handler: Arc::clone(&config.handler),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::handler::AcceptHandler;
    use crate::services::stores::InMemoryFlowInfoStore;
    use chrono::Utc;

    fn flow(id: &str) -> ApprovalFlowConfig {
        ApprovalFlowConfig {
            id: id.into(),
            name: format!("Flow {id}"),
            description: None,
            params: vec![],
            resources: vec![],
            approver: ApproverModel::Flow,
            enable_revoke: true,
            auto_revoke: Some(AutoRevokePolicy {
                max_duration: "P30D".into(),
            }),
            handler: Arc::new(AcceptHandler),
        }
    }

    fn registry() -> CatalogRegistry {
        CatalogRegistry::new(vec![CatalogConfig {
            id: "analytics".into(),
            name: "Analytics".into(),
            approval_flows: vec![flow("storage-read"), flow("storage-write")],
        }])
        .unwrap()
    }

    #[test]
    fn test_flow_lookup() {
        let registry = registry();
        assert!(registry.flow("analytics", "storage-read").is_ok());

        let err = registry.flow("analytics", "nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.system_message().contains("nope"));

        let err = registry.flow("missing", "storage-read").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.system_message().contains("missing"));
    }

    #[test]
    fn test_empty_flow_id_is_not_found() {
        let registry = registry();
        let err = registry.flow("analytics", "").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_duplicate_flow_id_rejected() {
        let result = CatalogRegistry::new(vec![CatalogConfig {
            id: "analytics".into(),
            name: "Analytics".into(),
            approval_flows: vec![flow("storage-read"), flow("storage-read")],
        }]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolve_flow_without_info_record() {
        let registry = registry();
        let flow_infos = InMemoryFlowInfoStore::new();

        let resolved = resolve_flow(&registry, &flow_infos, "analytics", "storage-read")
            .await
            .unwrap();
        assert!(resolved.enable_revoke);
        assert!(resolved.approver_group_id.is_none());
        assert_eq!(resolved.handler.name(), "accept");
    }

    #[tokio::test]
    async fn test_resolve_flow_merges_info_record() {
        let registry = registry();
        let flow_infos = InMemoryFlowInfoStore::new();
        flow_infos
            .set(ApprovalFlowInfo {
                catalog_id: "analytics".into(),
                approval_flow_id: "storage-read".into(),
                approver_group_id: Some("data-owners".into()),
                enable_revoke_override: Some(false),
                updated_date: Utc::now(),
            })
            .await
            .unwrap();

        let resolved = resolve_flow(&registry, &flow_infos, "analytics", "storage-read")
            .await
            .unwrap();
        assert_eq!(resolved.approver_group_id.as_deref(), Some("data-owners"));
        // The persisted override wins over the static switch.
        assert!(!resolved.enable_revoke);

        let untouched = resolve_flow(&registry, &flow_infos, "analytics", "storage-write")
            .await
            .unwrap();
        assert!(untouched.enable_revoke);
    }

    #[test]
    fn test_view_projects_policy() {
        let registry = registry();
        let config = registry.flow("analytics", "storage-read").unwrap();
        let resolved = ResolvedFlow {
            catalog_id: "analytics".into(),
            approval_flow_id: config.id.clone(),
            name: config.name.clone(),
            description: None,
            params: vec![],
            resources: vec![],
            approver: config.approver.clone(),
            enable_revoke: true,
            auto_revoke: config.auto_revoke.clone(),
            approver_group_id: Some("data-owners".into()),
            handler: Arc::clone(&config.handler),
        };
        let view = resolved.view();
        assert_eq!(view.max_auto_revoke_duration.as_deref(), Some("P30D"));
        assert_eq!(view.approver_group_id.as_deref(), Some("data-owners"));
    }
}
