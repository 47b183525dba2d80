//! HTTP Response Utilities
//!
//! Builders for the JSON responses the gateway writes, either a handler
//! result or a rejection.
//!
//! # Example
//!
//! ```
//! use relaygate_common::http::{json_response, error_response};
//! use relaygate_common::GatewayError;
//! use hyper::StatusCode;
//! use serde_json::json;
//!
//! let ok = json_response(StatusCode::OK, &json!({"result": 42}));
//! assert_eq!(ok.status(), StatusCode::OK);
//!
//! let rejected = error_response(&GatewayError::NotFound("/v1/nope".into()));
//! assert_eq!(rejected.status(), StatusCode::NOT_FOUND);
//! ```

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::GatewayError;
use crate::protocol::ErrorBody;

/// Type alias for responses with a fully buffered body
pub type HttpResponse = Response<Full<Bytes>>;

/// Create a JSON response with the given status.
///
/// A value that fails to serialize produces an empty `500` response rather
/// than a partial body.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(_) => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// Create an error response from a gateway error.
///
/// The status comes from [`GatewayError::status_code`] and the body is an
/// [`ErrorBody`].
pub fn error_response(err: &GatewayError) -> HttpResponse {
    json_response(err.status_code(), &ErrorBody::from(err))
}
