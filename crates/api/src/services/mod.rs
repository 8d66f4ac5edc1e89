//! External service integrations.

pub mod webhook;

pub use webhook::{WebhookActionHandler, WebhookNotifier};
