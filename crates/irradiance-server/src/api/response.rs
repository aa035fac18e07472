//! API response types
//!
//! Read endpoints wrap their payload in [`ApiResponse`]. Every failure,
//! from any endpoint, is a flat [`ErrorResponse`] with a human-readable
//! `error` and a machine-readable `code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// One tier attempt reported in an aggregate resolution failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptReport {
    pub tier: String,
    pub outcome: String,
    pub reason: String,
}

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<AttemptReport>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            attempts: None,
        }
    }

    /// Error that lists every resolver tier that was tried
    pub fn with_attempts(
        code: impl Into<String>,
        message: impl Into<String>,
        attempts: Vec<AttemptReport>,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            attempts: Some(attempts),
        }
    }

    /// Pair the body with a status code
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_is_flat() {
        let body = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "dataset 'x' not found"))
            .unwrap();
        assert_eq!(body, json!({"error": "dataset 'x' not found", "code": "NOT_FOUND"}));
    }

    #[test]
    fn test_error_response_with_attempts() {
        let body = serde_json::to_value(ErrorResponse::with_attempts(
            "ALL_TIERS_FAILED",
            "no tier could resolve",
            vec![AttemptReport {
                tier: "tier1".to_string(),
                outcome: "out_of_coverage".to_string(),
                reason: "outside bounding box".to_string(),
            }],
        ))
        .unwrap();
        assert_eq!(body["attempts"][0]["outcome"], "out_of_coverage");
    }

    #[test]
    fn test_success_wrapper() {
        let body = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(body, json!({"success": true, "data": [1, 2]}));
    }
}
