use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::services::{ArtifactError, CatalogError};

/// Rejected request input. Always a client fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("num_recommendations must be a positive integer, got {0}")]
    InvalidCount(i64),
}

impl ValidationError {
    /// Convert `validator` output into a single error, picking the first
    /// offending field in name order so the message is stable.
    pub fn from_validator(errors: &validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<String> = field_errors.keys().map(|k| k.to_string()).collect();
        fields.sort();

        let Some(field) = fields.into_iter().next() else {
            return Self::InvalidField {
                field: "user_profile".to_string(),
                reason: errors.to_string(),
            };
        };

        let reason = field_errors
            .iter()
            .find(|(k, _)| k.to_string() == field)
            .and_then(|(_, errs)| errs.first())
            .map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => e.code.to_string(),
            })
            .unwrap_or_else(|| "invalid value".to_string());

        Self::InvalidField { field, reason }
    }
}

/// The scoring model failed on a well-formed request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("Feature vector has {actual} entries, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model returned {actual} scores for a catalog of {expected} schools")]
    OutputLength { expected: usize, actual: usize },

    #[error("Scoring task aborted: {0}")]
    Aborted(String),
}

/// A category value outside the model vocabulary. Non-fatal: the value is
/// encoded with the reserved unknown code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' encoded as unknown category")]
pub struct UnknownCategoryWarning {
    pub kind: crate::core::CategoryKind,
    pub value: String,
}

/// Errors surfaced by a recommendation request
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Scoring timed out after {0:?}")]
    Timeout(Duration),

    #[error("Too many scoring tasks in flight")]
    Overloaded,
}

impl RecommendError {
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendError::Validation(_) => "validation_error",
            RecommendError::Scoring(_) | RecommendError::Timeout(_) => "scoring_error",
            RecommendError::Overloaded => "overloaded",
        }
    }

    /// Message that is safe to show to callers. Validation messages describe
    /// the caller's own input; server-side detail stays in the logs.
    pub fn safe_message(&self) -> String {
        match self {
            RecommendError::Validation(e) => e.to_string(),
            RecommendError::Scoring(_) => "Failed to score schools for this profile".to_string(),
            RecommendError::Timeout(_) => "Recommendation request timed out".to_string(),
            RecommendError::Overloaded => "Service is busy, retry later".to_string(),
        }
    }
}

impl ResponseError for RecommendError {
    fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::Validation(_) => StatusCode::BAD_REQUEST,
            RecommendError::Scoring(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RecommendError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RecommendError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "Recommendation failed: {}", self);
        } else {
            tracing::info!(kind = self.kind(), "Recommendation rejected: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse::new(
            self.kind(),
            self.safe_message(),
            status.as_u16(),
        ))
    }
}

/// Failures while bringing the service up. Any of these stops the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("School catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Model artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Invalid {kind} vocabulary: duplicate entry '{value}'")]
    DuplicateVocabulary {
        kind: crate::core::CategoryKind,
        value: String,
    },

    #[error("Model expects {expected} features but the layout has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_error_kinds() {
        let validation = RecommendError::from(ValidationError::InvalidCount(0));
        assert_eq!(validation.kind(), "validation_error");
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let scoring = RecommendError::from(ScoringError::ShapeMismatch {
            expected: 9,
            actual: 7,
        });
        assert_eq!(scoring.kind(), "scoring_error");
        assert_eq!(scoring.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let timeout = RecommendError::Timeout(Duration::from_millis(10));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let busy = RecommendError::Overloaded;
        assert_eq!(busy.kind(), "overloaded");
        assert_eq!(busy.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_scoring_detail_not_exposed() {
        let err = RecommendError::from(ScoringError::ShapeMismatch {
            expected: 9,
            actual: 7,
        });
        let body = err.error_response().into_body().try_into_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "scoring_error");
        assert_eq!(json["status_code"], 500);
        assert!(!json["error"].as_str().unwrap().contains("expects"));
    }

    #[test]
    fn test_validation_message_exposed() {
        let err = RecommendError::from(ValidationError::MissingField("gpa"));
        assert_eq!(err.safe_message(), "Missing required field: gpa");
    }
}
