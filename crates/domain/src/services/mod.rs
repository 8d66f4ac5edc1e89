//! Domain services for Access Desk.
//!
//! Services contain the approval workflow logic operating on the domain
//! models: the catalog registry, duration policy, authorization rules, flow
//! handlers, collaborator interfaces and the engine itself.

pub mod authorization;
pub mod catalog;
pub mod duration;
pub mod handler;
pub mod notification;
pub mod stores;
pub mod workflow;

pub use authorization::{authorize, ApprovalAction, AuthorizationContext};

pub use catalog::{
    resolve_flow, ApprovalFlowConfig, CatalogConfig, CatalogRegistry, ResolvedFlow,
};

pub use duration::{ensure_within_limit, RevokeDuration};

pub use handler::{
    AcceptHandler, ApprovalActionHandler, DenyHandler, HandlerInput, HandlerStage, MockHandler,
};

pub use notification::{
    ApprovalEventKind, ApprovalEventPayload, ApprovalNotifier, MockNotifier, NotificationResult,
};

pub use stores::{
    ApprovalRequestStore, AutoRevokeEvent, FlowInfoStore, GroupDirectory,
    InMemoryApprovalRequestStore, InMemoryFlowInfoStore, InMemoryGroupDirectory,
    InMemoryResourceStore, InMemoryRevokeScheduler, MarkApprovedInput, MarkCanceledInput,
    MarkRejectedInput, MarkRevokedInput, MarkValidatedInput, RequestSlice, ResourceStore,
    RevokeScheduler, AUTO_REVOKE_EVENT_TYPE,
};

pub use workflow::ApprovalEngine;
