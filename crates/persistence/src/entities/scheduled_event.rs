//! Scheduled event entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for scheduled event status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "scheduled_event_status", rename_all = "lowercase")]
pub enum ScheduledEventStatusDb {
    Pending,
    Dispatched,
    Completed,
    Failed,
}

impl From<ScheduledEventStatusDb> for String {
    fn from(status: ScheduledEventStatusDb) -> Self {
        match status {
            ScheduledEventStatusDb::Pending => "pending".to_string(),
            ScheduledEventStatusDb::Dispatched => "dispatched".to_string(),
            ScheduledEventStatusDb::Completed => "completed".to_string(),
            ScheduledEventStatusDb::Failed => "failed".to_string(),
        }
    }
}

/// Database row mapping for the scheduled_events table.
///
/// One row per one-shot event. The dispatcher claims due rows with a
/// conditional `pending -> dispatched` update, so an event is handed to at
/// most one dispatcher run.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledEventEntity {
    pub event_id: Uuid,
    pub event_type: String,
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub request_id: Uuid,
    pub fire_at: DateTime<Utc>,
    pub status: ScheduledEventStatusDb,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
