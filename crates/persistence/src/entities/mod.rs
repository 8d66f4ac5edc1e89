//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod approval_request;
pub mod flow_info;
pub mod membership;
pub mod resource;
pub mod scheduled_event;

pub use approval_request::{
    approver_type_from_db, request_status_from_db, ApprovalRequestEntity,
};
pub use flow_info::ApprovalFlowInfoEntity;
pub use membership::GroupMembershipEntity;
pub use resource::ResourceEntity;
pub use scheduled_event::{ScheduledEventEntity, ScheduledEventStatusDb};
