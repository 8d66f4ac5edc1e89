use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    AcceptHandler, ApprovalActionHandler, ApprovalEngine, ApprovalFlowConfig, CatalogConfig,
    CatalogRegistry, DenyHandler,
};
use shared::error::AppError;

use crate::config::{Config, FlowDefinition, HandlerDefinition};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{flows, health, requests};
use crate::services::WebhookActionHandler;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub engine: Arc<ApprovalEngine>,
}

/// Builds the catalog registry from the configured catalog definitions.
///
/// Fails on duplicate catalog or flow ids, which aborts startup.
pub fn build_registry(config: &Config) -> Result<CatalogRegistry, AppError> {
    let catalogs = config
        .catalogs
        .iter()
        .map(|catalog| CatalogConfig {
            id: catalog.id.clone(),
            name: catalog.name.clone(),
            approval_flows: catalog.approval_flows.iter().map(flow_config).collect(),
        })
        .collect();
    CatalogRegistry::new(catalogs)
}

fn flow_config(flow: &FlowDefinition) -> ApprovalFlowConfig {
    ApprovalFlowConfig {
        id: flow.id.clone(),
        name: flow.name.clone(),
        description: flow.description.clone(),
        params: flow.params.clone(),
        resources: flow.resources.clone(),
        approver: flow.approver.clone(),
        enable_revoke: flow.enable_revoke,
        auto_revoke: flow.auto_revoke.clone(),
        handler: build_handler(&flow.handler),
    }
}

fn build_handler(definition: &HandlerDefinition) -> Arc<dyn ApprovalActionHandler> {
    match definition {
        HandlerDefinition::Accept => Arc::new(AcceptHandler),
        HandlerDefinition::Deny => Arc::new(DenyHandler),
        HandlerDefinition::Webhook { url } => Arc::new(WebhookActionHandler::new(url.clone())),
    }
}

pub fn create_app(config: Config, pool: PgPool, engine: Arc<ApprovalEngine>) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
        engine,
    };

    // The gateway enforces origin policy; CORS stays permissive here.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Caller identity comes from the X-User-Id header; every handler under
    // /api/v1 extracts it and rejects requests without one.
    let api_routes = Router::new()
        .route(
            "/api/v1/catalogs/:catalog_id/flows/:approval_flow_id/requests",
            post(requests::submit_request).get(requests::list_requests_by_flow),
        )
        .route(
            "/api/v1/catalogs/:catalog_id/flows/:approval_flow_id",
            get(flows::get_flow).put(flows::set_flow_info),
        )
        .route("/api/v1/requests/:request_id", get(requests::get_request))
        .route(
            "/api/v1/requests/:request_id/validate",
            post(requests::validate_request),
        )
        .route(
            "/api/v1/requests/:request_id/approve",
            post(requests::approve_request),
        )
        .route(
            "/api/v1/requests/:request_id/reject",
            post(requests::reject_request),
        )
        .route(
            "/api/v1/requests/:request_id/revoke",
            post(requests::revoke_request),
        )
        .route(
            "/api/v1/requests/:request_id/cancel",
            post(requests::cancel_request),
        )
        .route("/api/v1/my/requests", get(requests::list_my_requests));

    // Public routes (no caller identity required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ApproverModel;

    use crate::config::CatalogDefinition;

    fn config_with_catalog() -> Config {
        let mut config = Config::load_for_test(&[]).unwrap();
        config.catalogs = vec![CatalogDefinition {
            id: "analytics".into(),
            name: "Analytics".into(),
            approval_flows: vec![
                FlowDefinition {
                    id: "storage-read".into(),
                    name: "Storage read".into(),
                    description: None,
                    params: vec![],
                    resources: vec![],
                    approver: ApproverModel::Flow,
                    enable_revoke: true,
                    auto_revoke: None,
                    handler: HandlerDefinition::Accept,
                },
                FlowDefinition {
                    id: "storage-write".into(),
                    name: "Storage write".into(),
                    description: None,
                    params: vec![],
                    resources: vec![],
                    approver: ApproverModel::Flow,
                    enable_revoke: false,
                    auto_revoke: None,
                    handler: HandlerDefinition::Webhook {
                        url: "https://fulfillment.internal/hooks".into(),
                    },
                },
            ],
        }];
        config
    }

    #[test]
    fn test_build_registry_maps_flows_and_handlers() {
        let registry = build_registry(&config_with_catalog()).unwrap();

        let read = registry.flow("analytics", "storage-read").unwrap();
        assert_eq!(read.handler.name(), "accept");
        assert!(read.enable_revoke);

        let write = registry.flow("analytics", "storage-write").unwrap();
        assert_eq!(write.handler.name(), "webhook");
        assert!(!write.enable_revoke);
    }

    #[test]
    fn test_build_registry_rejects_duplicate_flow_ids() {
        let mut config = config_with_catalog();
        let duplicate = config.catalogs[0].approval_flows[0].clone();
        config.catalogs[0].approval_flows.push(duplicate);

        assert!(build_registry(&config).is_err());
    }
}
