//! Application error taxonomy.
//!
//! Every fallible operation in the engine returns [`AppError`]: one value
//! carrying a system-facing message (logs), an optional user-facing message
//! (safe to surface), and a coarse [`ErrorCode`]. Failures coming from
//! collaborators (storage, identity, handlers, scheduler) are converted into
//! this type at the call boundary with the user message masked.

use serde::Serialize;
use thiserror::Error;

/// Fixed user-facing text for errors that originate outside the engine.
pub const GENERIC_USER_MESSAGE: &str = "Unexpected error occurred";

/// Coarse classification of an application error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Caller supplied invalid input or acted on a request in the wrong state.
    BadRequest,
    /// Catalog, flow, request or resource reference does not resolve.
    NotFound,
    /// Authorization denied.
    Forbidden,
    /// Concurrent-update race surfaced by a conditional write.
    Conflict,
    /// Collaborator failure, contract violation or unclassified error.
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::BadRequest => write!(f, "bad_request"),
            ErrorCode::NotFound => write!(f, "not_found"),
            ErrorCode::Forbidden => write!(f, "forbidden"),
            ErrorCode::Conflict => write!(f, "conflict"),
            ErrorCode::Internal => write!(f, "internal_error"),
        }
    }
}

/// Application error value.
///
/// `system_message` may contain internal detail and is what `Display` renders.
/// `user_message` is only set for conditions raised intentionally by this
/// engine; when absent, [`AppError::user_message`] falls back to
/// [`GENERIC_USER_MESSAGE`].
#[derive(Debug, Clone, Error)]
#[error("{system_message}")]
pub struct AppError {
    code: ErrorCode,
    system_message: String,
    user_message: Option<String>,
}

impl AppError {
    /// Invalid caller input or wrong-state action. Message is safe to surface.
    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: ErrorCode::BadRequest,
            user_message: Some(message.clone()),
            system_message: message,
        }
    }

    /// Unresolvable catalog/flow/request/resource reference. Safe to surface.
    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: ErrorCode::NotFound,
            user_message: Some(message.clone()),
            system_message: message,
        }
    }

    /// Authorization denial. Safe to surface.
    pub fn forbidden(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: ErrorCode::Forbidden,
            user_message: Some(message.clone()),
            system_message: message,
        }
    }

    /// Conditional-write race. Safe to surface.
    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: ErrorCode::Conflict,
            user_message: Some(message.clone()),
            system_message: message,
        }
    }

    /// Internal failure; user message is masked.
    pub fn internal(system_message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            system_message: system_message.into(),
            user_message: None,
        }
    }

    /// Failure of a named collaborator (storage, identity backend, handler,
    /// scheduler). Classified `Internal`, user message masked.
    pub fn dependency(source: &str, err: impl std::fmt::Display) -> Self {
        Self {
            code: ErrorCode::Internal,
            system_message: format!("{source} failure: {err}"),
            user_message: None,
        }
    }

    /// Replace the user-facing message while keeping code and system message.
    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    /// The coarse classification code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The system-facing message (may contain internal detail).
    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// The user-facing message, masked for errors of external origin.
    pub fn user_message(&self) -> &str {
        self.user_message.as_deref().unwrap_or(GENERIC_USER_MESSAGE)
    }

    pub fn is_bad_request(&self) -> bool {
        self.code == ErrorCode::BadRequest
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_forbidden(&self) -> bool {
        self.code == ErrorCode::Forbidden
    }

    pub fn is_conflict(&self) -> bool {
        self.code == ErrorCode::Conflict
    }

    pub fn is_internal(&self) -> bool {
        self.code == ErrorCode::Internal
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .collect();
        messages.sort();

        let message = if messages.len() == 1 {
            messages.remove(0)
        } else {
            format!("{} validation errors: {}", messages.len(), messages.join("; "))
        };

        AppError::bad_request(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_surfaces_message() {
        let err = AppError::bad_request("Approval request not found");
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.user_message(), "Approval request not found");
        assert_eq!(err.system_message(), "Approval request not found");
    }

    #[test]
    fn test_internal_masks_user_message() {
        let err = AppError::internal("connection pool exhausted");
        assert_eq!(err.code(), ErrorCode::Internal);
        assert_eq!(err.user_message(), GENERIC_USER_MESSAGE);
        assert_eq!(err.system_message(), "connection pool exhausted");
    }

    #[test]
    fn test_dependency_is_masked_internal() {
        let err = AppError::dependency("identity backend", "timeout after 5s");
        assert!(err.is_internal());
        assert_eq!(err.user_message(), GENERIC_USER_MESSAGE);
        assert_eq!(
            err.system_message(),
            "identity backend failure: timeout after 5s"
        );
    }

    #[test]
    fn test_with_user_message_overrides_mask() {
        let err = AppError::internal("resource record missing")
            .with_user_message("Request resources are misconfigured");
        assert!(err.is_internal());
        assert_eq!(err.user_message(), "Request resources are misconfigured");
    }

    #[test]
    fn test_display_uses_system_message() {
        let err = AppError::dependency("scheduler", "503");
        assert_eq!(format!("{err}"), "scheduler failure: 503");
    }

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::BadRequest.to_string(), "bad_request");
        assert_eq!(ErrorCode::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCode::Forbidden.to_string(), "forbidden");
        assert_eq!(ErrorCode::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCode::Internal.to_string(), "internal_error");
    }

    #[test]
    fn test_predicates() {
        assert!(AppError::not_found("x").is_not_found());
        assert!(AppError::forbidden("x").is_forbidden());
        assert!(AppError::conflict("x").is_conflict());
        assert!(!AppError::conflict("x").is_internal());
    }

    #[test]
    fn test_from_validation_errors_single() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(length(max = 3, message = "comment too long"))]
            comment: String,
        }

        let probe = Probe {
            comment: "abcdef".to_string(),
        };
        let err: AppError = probe.validate().unwrap_err().into();
        assert!(err.is_bad_request());
        assert_eq!(err.user_message(), "comment too long");
    }
}
