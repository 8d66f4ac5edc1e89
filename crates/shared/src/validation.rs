//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of catalog, flow, user, group and resource identifiers.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of request/approve/reject/revoke/cancel comments.
pub const MAX_COMMENT_LENGTH: usize = 1024;

/// Maximum length of a single input parameter string value.
pub const MAX_PARAM_VALUE_LENGTH: usize = 4096;

/// Maximum number of input parameters on one request.
pub const MAX_INPUT_PARAMS: usize = 64;

/// Maximum number of input resources on one request.
pub const MAX_INPUT_RESOURCES: usize = 32;

/// Validates an opaque identifier: non-empty, capped length, no control
/// characters or whitespace.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("identifier_empty");
        err.message = Some("Identifier must not be empty".into());
        return Err(err);
    }
    if id.len() > MAX_ID_LENGTH {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(format!("Identifier must be at most {MAX_ID_LENGTH} characters").into());
        return Err(err);
    }
    if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
        let mut err = ValidationError::new("identifier_charset");
        err.message = Some("Identifier must not contain whitespace or control characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a comment against the shared length cap.
pub fn validate_comment(comment: &str) -> Result<(), ValidationError> {
    if comment.len() > MAX_COMMENT_LENGTH {
        let mut err = ValidationError::new("comment_length");
        err.message =
            Some(format!("Comment must be at most {MAX_COMMENT_LENGTH} characters").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a string parameter value against the shared length cap.
pub fn validate_param_value(value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_PARAM_VALUE_LENGTH {
        let mut err = ValidationError::new("param_value_length");
        err.message = Some(
            format!("Parameter value must be at most {MAX_PARAM_VALUE_LENGTH} characters").into(),
        );
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("storage-read").is_ok());
        assert!(validate_identifier("team_42").is_ok());
        assert!(validate_identifier("a").is_ok());
        assert!(validate_identifier(&"x".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_identifier_empty() {
        let err = validate_identifier("").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Identifier must not be empty"
        );
    }

    #[test]
    fn test_validate_identifier_too_long() {
        assert!(validate_identifier(&"x".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_identifier_charset() {
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier("has\ttab").is_err());
        assert!(validate_identifier("has\nnewline").is_err());
        assert!(validate_identifier("has\u{0007}bell").is_err());
    }

    #[test]
    fn test_validate_comment() {
        assert!(validate_comment("").is_ok());
        assert!(validate_comment("need access for the quarterly report").is_ok());
        assert!(validate_comment(&"c".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(validate_comment(&"c".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_param_value() {
        assert!(validate_param_value("eu-west-1").is_ok());
        assert!(validate_param_value(&"v".repeat(MAX_PARAM_VALUE_LENGTH)).is_ok());
        assert!(validate_param_value(&"v".repeat(MAX_PARAM_VALUE_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_comment_error_message() {
        let err = validate_comment(&"c".repeat(MAX_COMMENT_LENGTH + 1)).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            format!("Comment must be at most {MAX_COMMENT_LENGTH} characters")
        );
    }
}
