//! Repository implementations for database operations.

pub mod approval_request;
pub mod flow_info;
pub mod membership;
pub mod resource;
pub mod scheduled_event;

pub use approval_request::ApprovalRequestRepository;
pub use flow_info::FlowInfoRepository;
pub use membership::MembershipRepository;
pub use resource::ResourceRepository;
pub use scheduled_event::ScheduledEventRepository;

use shared::error::AppError;

pub(crate) fn db_error(err: sqlx::Error) -> AppError {
    AppError::dependency("database", err)
}
