//! Request metadata extraction.
//!
//! Copies caller headers and the method into the [`RequestContext`], parses
//! the secret key from Basic auth, and assigns a correlation id. Total over
//! all inputs: absent or malformed headers never produce an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hyper::header::{HeaderMap, HeaderName, AUTHORIZATION, CONTENT_TYPE, HOST, ORIGIN, USER_AGENT};
use hyper::Request;
use relaygate_common::auth::extract_secret_key;
use relaygate_common::Result;
use uuid::Uuid;

use crate::context::{ContextKey, RequestContext};

/// Header naming the blockchain-specific sub-route of a relay.
pub const RELAY_PATH_HEADER: &str = "relay-path";

/// Generates a short correlation id.
///
/// 11 URL-safe characters taken from the first 8 bytes of a v4 UUID.
pub fn generate_request_id() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    URL_SAFE_NO_PAD.encode(&bytes[..8])
}

/// Binds request metadata into `ctx`.
///
/// Binds `host`, `userAgent`, `origin`, `contentType`, `relayPath`,
/// `httpMethod`, `secretKey` and `requestID`.
///
/// # Errors
/// Only `GatewayError::ContextRebound`, when `ctx` already holds one of these keys.
pub fn extract_metadata<B>(request: &Request<B>, ctx: &mut RequestContext) -> Result<()> {
    let headers = request.headers();

    ctx.bind_text(ContextKey::Host, header_text(headers, &HOST))?;
    ctx.bind_text(ContextKey::UserAgent, header_text(headers, &USER_AGENT))?;
    ctx.bind_text(ContextKey::Origin, header_text(headers, &ORIGIN))?;
    ctx.bind_text(ContextKey::ContentType, header_text(headers, &CONTENT_TYPE))?;
    ctx.bind_text(
        ContextKey::RelayPath,
        header_text(headers, &HeaderName::from_static(RELAY_PATH_HEADER)),
    )?;
    ctx.bind_text(ContextKey::HttpMethod, Some(request.method().as_str().to_string()))?;

    let authorization = header_text(headers, &AUTHORIZATION);
    let secret_key = extract_secret_key(authorization.as_deref());
    ctx.bind_text(ContextKey::SecretKey, Some(secret_key))?;

    ctx.bind_text(ContextKey::RequestId, Some(generate_request_id()))?;
    Ok(())
}

fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
