//! Domain models for Access Desk.

pub mod approval_flow;
pub mod approval_request;
pub mod membership;
pub mod resource;

pub use approval_flow::{
    ApprovalFlowInfo, ApproverModel, AutoRevokePolicy, FlowView, ParamSchema, ResourceSchema,
    SetFlowInfoBody,
};
pub use approval_request::{
    ActionCommentBody, ApprovalRequest, ApproveRequestBody, ApproverType, HandlerResult,
    InputParam, InputResource, ListRequestsQuery, ParamValue, RequestPage, RequestStatus,
    SubmitRequestBody, SYSTEM_USER_ID,
};
pub use membership::GroupMembership;
pub use resource::ResourceRecord;
