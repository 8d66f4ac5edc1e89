//! Webhook-backed integrations: flow action handlers that delegate to an
//! external fulfillment endpoint, and the lifecycle event notifier.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use domain::models::{HandlerResult, ParamValue};
use domain::services::{
    ApprovalActionHandler, ApprovalEventPayload, ApprovalNotifier, HandlerInput,
    NotificationResult,
};
use shared::error::AppError;

/// Outbound HTTP timeout for handler calls in seconds.
const HANDLER_TIMEOUT_SECS: u64 = 10;

/// Wire form of a handler invocation sent to the fulfillment endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
struct HandlerCallBody {
    stage: String,
    request_id: Uuid,
    catalog_id: String,
    approval_flow_id: String,
    request_user_id: String,
    params: HashMap<String, ParamValue>,
    resources: HashMap<String, String>,
    request_date: DateTime<Utc>,
}

impl From<HandlerInput> for HandlerCallBody {
    fn from(input: HandlerInput) -> Self {
        Self {
            stage: input.stage.to_string(),
            request_id: input.request_id,
            catalog_id: input.catalog_id,
            approval_flow_id: input.approval_flow_id,
            request_user_id: input.request_user_id,
            params: input.params,
            resources: input.resources,
            request_date: input.request_date,
        }
    }
}

/// Flow handler that POSTs each stage to a fulfillment endpoint and expects
/// a [`HandlerResult`] JSON body back. A non-success HTTP status or an
/// unreadable body is an infrastructure failure, not a business outcome.
pub struct WebhookActionHandler {
    url: String,
    client: Client,
}

impl WebhookActionHandler {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(HANDLER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            url: url.into(),
            client,
        }
    }

    async fn call(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        let body = HandlerCallBody::from(input);
        debug!(
            url = %self.url,
            stage = %body.stage,
            request_id = %body.request_id,
            "Calling fulfillment webhook"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::dependency("fulfillment webhook", err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::dependency(
                "fulfillment webhook",
                format!("endpoint returned {status}"),
            ));
        }

        response
            .json::<HandlerResult>()
            .await
            .map_err(|err| AppError::dependency("fulfillment webhook", err))
    }
}

#[async_trait::async_trait]
impl ApprovalActionHandler for WebhookActionHandler {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn validation(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        self.call(input).await
    }

    async fn approved(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        self.call(input).await
    }

    async fn revoked(&self, input: HandlerInput) -> Result<HandlerResult, AppError> {
        self.call(input).await
    }
}

/// Lifecycle event notifier POSTing payloads to one configured endpoint.
/// Delivery is best-effort; the engine logs failures and moves on.
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl ApprovalNotifier for WebhookNotifier {
    async fn notify(&self, payload: ApprovalEventPayload) -> NotificationResult {
        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => NotificationResult::Sent,
            Ok(response) => {
                warn!(
                    url = %self.url,
                    status = %response.status(),
                    "Notification endpoint rejected event"
                );
                NotificationResult::Failed(format!("endpoint returned {}", response.status()))
            }
            Err(err) => NotificationResult::Failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::HandlerStage;

    fn input() -> HandlerInput {
        let mut params = HashMap::new();
        params.insert("region".to_string(), ParamValue::String("eu-1".into()));
        let mut resources = HashMap::new();
        resources.insert("bucket".to_string(), "reports".to_string());
        HandlerInput {
            stage: HandlerStage::Approved,
            request_id: Uuid::now_v7(),
            catalog_id: "analytics".into(),
            approval_flow_id: "bucket-read".into(),
            request_user_id: "alice".into(),
            params,
            resources,
            request_date: Utc::now(),
        }
    }

    #[test]
    fn test_handler_call_body_shape() {
        let body = HandlerCallBody::from(input());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stage"], "approved");
        assert_eq!(json["catalog_id"], "analytics");
        assert_eq!(json["params"]["region"], "eu-1");
        assert_eq!(json["resources"]["bucket"], "reports");
    }

    #[test]
    fn test_handler_name() {
        let handler = WebhookActionHandler::new("https://fulfillment.internal/hooks");
        assert_eq!(handler.name(), "webhook");
    }
}
