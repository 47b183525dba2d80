use hyper::StatusCode;
use thiserror::Error;

/// Errors raised anywhere in the gateway request sequence.
///
/// Every stage of the pipeline returns this type so the error funnel can
/// forward any failure to the rejection handler unchanged. Only the
/// rejection handler turns it into an HTTP response, using
/// [`status_code`](Self::status_code) and [`name`](Self::name).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    InternalServerError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Context key already bound: {0}")]
    ContextRebound(&'static str),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// HTTP status a rejection handler should answer with.
    ///
    /// # Returns
    /// - `404` for routing failures
    /// - `400` for malformed parameters
    /// - `502` / `504` when the dispatcher network fails or times out
    /// - `500` for everything else, including identity unlock failures
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Configuration(_)
            | GatewayError::InternalServerError(_)
            | GatewayError::Handler(_)
            | GatewayError::ContextRebound(_)
            | GatewayError::JsonSerialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error class name reported in the JSON error body.
    pub fn name(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "NotFoundError",
            StatusCode::BAD_REQUEST => "BadRequestError",
            StatusCode::BAD_GATEWAY => "BadGatewayError",
            StatusCode::GATEWAY_TIMEOUT => "GatewayTimeoutError",
            _ => "InternalServerError",
        }
    }

    /// Whether the message may be shown to the caller.
    ///
    /// Client errors (4xx) expose their message. Server errors never do, so
    /// callers cannot observe raw cryptographic or transport failures.
    pub fn is_exposed(&self) -> bool {
        self.status_code().is_client_error()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::Transport("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(GatewayError::Timeout(10).status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::InternalServerError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Handler("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(GatewayError::NotFound("x".into()).name(), "NotFoundError");
        assert_eq!(GatewayError::BadRequest("x".into()).name(), "BadRequestError");
        assert_eq!(GatewayError::Configuration("x".into()).name(), "InternalServerError");
    }

    #[test]
    fn test_exposure() {
        assert!(GatewayError::BadRequest("x".into()).is_exposed());
        assert!(!GatewayError::InternalServerError("x".into()).is_exposed());
        assert!(!GatewayError::Transport("x".into()).is_exposed());
    }

    #[test]
    fn test_internal_server_error_display_is_message_only() {
        let err = GatewayError::InternalServerError("Unable to unlock".into());
        assert_eq!(err.to_string(), "Unable to unlock");
    }
}
