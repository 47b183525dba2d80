//! JSON error body returned for rejected requests.
//!
//! The shape is `{"error": {"statusCode": 404, "name": "NotFoundError", "message": "..."}}`.
//! Server errors carry the canonical status reason instead of the underlying
//! message.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Top-level error envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error details reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// HTTP status code, repeated in the body
    pub status_code: u16,
    /// Error class name (e.g. `NotFoundError`)
    pub name: String,
    /// Human-readable message
    pub message: String,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        let status = err.status_code();
        let message = if err.is_exposed() {
            err.to_string()
        } else {
            status.canonical_reason().unwrap_or("Internal Server Error").to_string()
        };

        ErrorBody {
            error: ErrorDetail {
                status_code: status.as_u16(),
                name: err.name().to_string(),
                message,
            },
        }
    }
}
