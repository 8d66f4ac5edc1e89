//! Scheduled event repository for database operations.
//!
//! Auto-revoke registrations land here as one-shot rows. The dispatcher job
//! claims due rows with a conditional `pending -> dispatched` update under
//! `FOR UPDATE SKIP LOCKED`, so replicas running the same job never fire the
//! same event twice.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::services::stores::{AutoRevokeEvent, RevokeScheduler, AUTO_REVOKE_EVENT_TYPE};
use shared::error::AppError;

use crate::entities::ScheduledEventEntity;
use crate::metrics::QueryTimer;
use crate::repositories::db_error;

const EVENT_COLUMNS: &str = "event_id, event_type, catalog_id, approval_flow_id, request_id, \
     fire_at, status, created_at, dispatched_at, finished_at, last_error";

/// Repository for one-shot scheduled events.
#[derive(Clone)]
pub struct ScheduledEventRepository {
    pool: PgPool,
}

impl ScheduledEventRepository {
    /// Creates a new ScheduledEventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claims up to `batch` due events, moving them `pending -> dispatched`.
    /// Each returned row belongs exclusively to this caller.
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        batch: i64,
    ) -> Result<Vec<ScheduledEventEntity>, AppError> {
        let timer = QueryTimer::new("claim_due_scheduled_events");
        let sql = format!(
            r#"
            UPDATE scheduled_events
            SET status = 'dispatched', dispatched_at = $1
            WHERE event_id IN (
                SELECT event_id
                FROM scheduled_events
                WHERE status = 'pending' AND fire_at <= $1
                ORDER BY fire_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {EVENT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ScheduledEventEntity>(&sql)
            .bind(now)
            .bind(batch)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        let events = result.map_err(db_error)?;
        if !events.is_empty() {
            tracing::debug!(claimed = events.len(), "claimed due scheduled events");
        }
        Ok(events)
    }

    /// Records that a dispatched event ran to completion.
    pub async fn mark_completed(
        &self,
        event_id: Uuid,
        finished_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let timer = QueryTimer::new("mark_scheduled_event_completed");
        let result = sqlx::query(
            r#"
            UPDATE scheduled_events
            SET status = 'completed', finished_at = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(finished_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(db_error)?;
        Ok(())
    }

    /// Records a dispatched event that failed. Failed events are not retried;
    /// the row keeps the error for operator follow-up.
    pub async fn mark_failed(
        &self,
        event_id: Uuid,
        finished_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), AppError> {
        let timer = QueryTimer::new("mark_scheduled_event_failed");
        let result = sqlx::query(
            r#"
            UPDATE scheduled_events
            SET status = 'failed', finished_at = $2, last_error = $3
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(finished_at)
        .bind(error)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(db_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RevokeScheduler for ScheduledEventRepository {
    async fn schedule_revoke(&self, event: AutoRevokeEvent) -> Result<Uuid, AppError> {
        let event_id = Uuid::now_v7();
        let timer = QueryTimer::new("insert_scheduled_event");
        let result = sqlx::query(
            r#"
            INSERT INTO scheduled_events (
                event_id, event_type, catalog_id, approval_flow_id,
                request_id, fire_at, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            "#,
        )
        .bind(event_id)
        .bind(AUTO_REVOKE_EVENT_TYPE)
        .bind(&event.catalog_id)
        .bind(&event.approval_flow_id)
        .bind(event.request_id)
        .bind(event.fire_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(db_error)?;
        Ok(event_id)
    }
}
