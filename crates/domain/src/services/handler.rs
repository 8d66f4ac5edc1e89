//! Flow action handlers.
//!
//! Every approval flow carries one handler implementing the side effects of
//! the lifecycle: checking a submission, provisioning access on approval,
//! tearing it down on revocation. A handler reports business outcomes through
//! [`HandlerResult`]; an `Err` return means the handler infrastructure itself
//! failed and the surrounding transition must not record an outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::error::AppError;

use crate::models::{ApprovalRequest, HandlerResult, ParamValue};

/// Lifecycle stage a handler invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStage {
    Validation,
    Approved,
    Revoked,
}

impl std::fmt::Display for HandlerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerStage::Validation => write!(f, "validation"),
            HandlerStage::Approved => write!(f, "approved"),
            HandlerStage::Revoked => write!(f, "revoked"),
        }
    }
}

/// Input handed to a handler invocation.
///
/// Parameters and resources arrive re-keyed by their ids. The request stores
/// them as ordered lists; when a list repeats an id the later entry wins here.
#[derive(Debug, Clone)]
pub struct HandlerInput {
    pub stage: HandlerStage,
    pub request_id: Uuid,
    pub catalog_id: String,
    pub approval_flow_id: String,
    pub request_user_id: String,
    pub params: HashMap<String, ParamValue>,
    pub resources: HashMap<String, String>,
    pub request_date: DateTime<Utc>,
}

impl HandlerInput {
    pub fn from_request(stage: HandlerStage, request: &ApprovalRequest) -> Self {
        let mut params = HashMap::with_capacity(request.input_params.len());
        for param in &request.input_params {
            params.insert(param.id.clone(), param.value.clone());
        }
        let mut resources = HashMap::with_capacity(request.input_resources.len());
        for resource in &request.input_resources {
            resources.insert(
                resource.resource_type_id.clone(),
                resource.resource_id.clone(),
            );
        }
        Self {
            stage,
            request_id: request.request_id,
            catalog_id: request.catalog_id.clone(),
            approval_flow_id: request.approval_flow_id.clone(),
            request_user_id: request.request_user_id.clone(),
            params,
            resources,
            request_date: request.request_date,
        }
    }
}

/// Side-effect hooks of an approval flow.
#[async_trait::async_trait]
pub trait ApprovalActionHandler: Send + Sync {
    /// Stable name used in logs and the flow admin view.
    fn name(&self) -> &str;

    /// Checks a submitted request before it becomes pending.
    async fn validation(&self, input: HandlerInput) -> Result<HandlerResult, AppError>;

    /// Applies the approved request's effect.
    async fn approved(&self, input: HandlerInput) -> Result<HandlerResult, AppError>;

    /// Reverts a previously applied effect.
    async fn revoked(&self, input: HandlerInput) -> Result<HandlerResult, AppError>;
}

/// Handler that acknowledges every stage. Suits flows whose effect is carried
/// out elsewhere and only tracked here.
#[derive(Debug, Clone, Default)]
pub struct AcceptHandler;

#[async_trait::async_trait]
impl ApprovalActionHandler for AcceptHandler {
    fn name(&self) -> &str {
        "accept"
    }

    async fn validation(&self, _input: HandlerInput) -> Result<HandlerResult, AppError> {
        Ok(HandlerResult::success("accepted"))
    }

    async fn approved(&self, _input: HandlerInput) -> Result<HandlerResult, AppError> {
        Ok(HandlerResult::success("accepted"))
    }

    async fn revoked(&self, _input: HandlerInput) -> Result<HandlerResult, AppError> {
        Ok(HandlerResult::success("accepted"))
    }
}

/// Handler that reports a business failure at every stage. Useful for
/// fencing off a flow without removing it from the catalog.
#[derive(Debug, Clone, Default)]
pub struct DenyHandler;

#[async_trait::async_trait]
impl ApprovalActionHandler for DenyHandler {
    fn name(&self) -> &str {
        "deny"
    }

    async fn validation(&self, _input: HandlerInput) -> Result<HandlerResult, AppError> {
        Ok(HandlerResult::failure("denied"))
    }

    async fn approved(&self, _input: HandlerInput) -> Result<HandlerResult, AppError> {
        Ok(HandlerResult::failure("denied"))
    }

    async fn revoked(&self, _input: HandlerInput) -> Result<HandlerResult, AppError> {
        Ok(HandlerResult::failure("denied"))
    }
}

/// Scripted handler for development and tests.
///
/// Counts invocations per stage; can report business failures or fail
/// outright.
#[derive(Debug, Default)]
pub struct MockHandler {
    /// Return `Err` from every stage.
    pub simulate_error: bool,
    /// Return `Ok` with `is_success: false` from every stage.
    pub report_failure: bool,
    validation_calls: AtomicU64,
    approved_calls: AtomicU64,
    revoked_calls: AtomicU64,
}

impl MockHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose stages fail with an infrastructure error.
    pub fn erroring() -> Self {
        Self {
            simulate_error: true,
            ..Self::default()
        }
    }

    /// Mock whose stages report a business failure.
    pub fn denying() -> Self {
        Self {
            report_failure: true,
            ..Self::default()
        }
    }

    pub fn validation_calls(&self) -> u64 {
        self.validation_calls.load(Ordering::SeqCst)
    }

    pub fn approved_calls(&self) -> u64 {
        self.approved_calls.load(Ordering::SeqCst)
    }

    pub fn revoked_calls(&self) -> u64 {
        self.revoked_calls.load(Ordering::SeqCst)
    }

    fn outcome(&self, input: &HandlerInput) -> Result<HandlerResult, AppError> {
        if self.simulate_error {
            tracing::warn!(
                request_id = %input.request_id,
                stage = %input.stage,
                "Mock handler simulating infrastructure failure"
            );
            return Err(AppError::internal("Simulated handler failure"));
        }
        if self.report_failure {
            return Ok(HandlerResult::failure("denied by mock"));
        }
        Ok(HandlerResult::success(format!("mock {} ok", input.stage)))
    }
}

#[async_trait::async_trait]
impl ApprovalActionHandler for MockHandler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validation(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        self.validation_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(&input)
    }

    async fn approved(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        self.approved_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(&input)
    }

    async fn revoked(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        self.revoked_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(&input)
    }
}
