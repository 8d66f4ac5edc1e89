use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use access_desk_api::app::{build_registry, create_app};
use access_desk_api::config::Config;
use access_desk_api::jobs::{AutoRevokeJob, JobScheduler, PoolMetricsJob};
use access_desk_api::middleware::{init_metrics, logging::init_logging};
use access_desk_api::services::WebhookNotifier;
use domain::services::ApprovalEngine;
use persistence::repositories::{
    ApprovalRequestRepository, FlowInfoRepository, MembershipRepository, ResourceRepository,
    ScheduledEventRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Access Desk API v{}", env!("CARGO_PKG_VERSION"));

    // Install the Prometheus recorder before anything records
    init_metrics();

    // Create database pool
    let pool = persistence::db::create_pool(&config.database).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Catalog registry from configuration
    let registry = Arc::new(build_registry(&config)?);
    info!(catalogs = config.catalogs.len(), "Catalog registry loaded");

    // Wire the engine over the Postgres-backed stores
    let scheduled_events = ScheduledEventRepository::new(pool.clone());
    let mut engine = ApprovalEngine::new(
        registry,
        Arc::new(ApprovalRequestRepository::new(pool.clone())),
        Arc::new(FlowInfoRepository::new(pool.clone())),
        Arc::new(ResourceRepository::new(pool.clone())),
        Arc::new(MembershipRepository::new(pool.clone())),
    );
    if config.engine.scheduler_enabled {
        engine = engine.with_scheduler(Arc::new(scheduled_events.clone()));
    }
    if config.notifications.enabled {
        engine = engine.with_notifier(Arc::new(WebhookNotifier::new(
            config.notifications.webhook_url.clone(),
            config.notifications.timeout_ms,
        )));
    }
    let engine = Arc::new(engine);

    // Background jobs
    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    if config.engine.scheduler_enabled {
        scheduler.register(AutoRevokeJob::new(
            Arc::clone(&engine),
            scheduled_events,
            config.engine.auto_revoke_poll_secs,
            config.engine.dispatch_batch_size,
        ));
    }
    scheduler.start();

    // Build application
    let app = create_app(config.clone(), pool, Arc::clone(&engine));

    // Start server
    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background jobs once the listener has drained
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown signal handler: {}", e);
    }
    info!("Shutdown signal received");
}
