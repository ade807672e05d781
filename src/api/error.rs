// =============================================================================
// API error boundary
// =============================================================================
//
// Every failure leaving the HTTP layer is one of three kinds, each with a
// fixed status and machine-readable code:
//
//   InvalidArgument  400  "invalid-argument"
//   NotFound         404  "not-found"
//   Internal         500  "internal"
//
// Body: `{ "error": <message>, "code": <code> }`.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::EngineError;
use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid-argument",
            Self::NotFound(_) => "not-found",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(message) => error!(code = self.code(), %message, "request failed"),
            _ => warn!(code = self.code(), message = %self, "request rejected"),
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NoData => Self::NotFound(e.to_string()),
            EngineError::InsufficientHistory { .. } => Self::InvalidArgument(e.to_string()),
            // The bars came from the provider, not the caller.
            EngineError::InsufficientField { .. } | EngineError::UnorderedSeries { .. } => {
                Self::Internal(format!("Failed to fetch or process historical data: {e}"))
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound(ticker) => {
                Self::NotFound(format!("No historical data found for {ticker}."))
            }
            other => Self::Internal(format!("Failed to fetch or process historical data: {other}")),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let cases = [
            (ApiError::InvalidArgument("x".into()), 400, "invalid-argument"),
            (ApiError::NotFound("x".into()), 404, "not-found"),
            (ApiError::Internal("x".into()), 500, "internal"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn engine_errors_map_to_boundary_kinds() {
        assert_eq!(ApiError::from(EngineError::NoData).code(), "not-found");
        assert_eq!(
            ApiError::from(EngineError::InsufficientHistory {
                required: 3,
                actual: 1
            })
            .code(),
            "invalid-argument"
        );
        assert_eq!(
            ApiError::from(EngineError::UnorderedSeries { index: 4 }).code(),
            "internal"
        );
    }

    #[test]
    fn provider_not_found_is_404() {
        let err = ApiError::from(ProviderError::NotFound("XYZ.SN".into()));
        assert_eq!(err, ApiError::NotFound("No historical data found for XYZ.SN.".into()));

        let err = ApiError::from(ProviderError::Malformed("bad".into()));
        assert_eq!(err.code(), "internal");
        assert!(err.to_string().starts_with("Failed to fetch or process historical data"));
    }
}
