//! Path normalization for blockchain sub-paths.
//!
//! The route table only matches flat paths: `/v1/lb/{id}` and `/v1/{id}`
//! with a single trailing segment. POST requests that carry extra sub-path
//! segments are flattened before lookup by turning every `/` after the
//! prefix into `~`:
//!
//! | request | normalized |
//! |---------|------------|
//! | `POST /v1/lb/XYZ/foo/bar` | `/v1/lb/XYZ~foo~bar` |
//! | `POST /v1/abcdefghijklmnopqrstuvwx/foo/bar` | `/v1/abcdefghijklmnopqrstuvwx~foo~bar` |
//! | `GET` anything | unchanged |
//!
//! The rewrite works on the path-and-query string, replaces the request URI
//! in place and is not reversible.

use hyper::http::uri::PathAndQuery;
use hyper::{Method, Request, Uri};
use relaygate_common::{GatewayError, Result};
use std::borrow::Cow;

const LOAD_BALANCER_PREFIX: &str = "/v1/lb/";
const V1_PREFIX: &str = "/v1/";
/// Fixed width of an application id.
pub const APPLICATION_ID_LEN: usize = 24;
/// `/v1/` followed by an application id.
const APPLICATION_PREFIX_LEN: usize = V1_PREFIX.len() + APPLICATION_ID_LEN;

/// Normalizes a request path for route lookup.
///
/// Returns the input unchanged (borrowed) unless `method` is POST and the
/// path starts with `/v1/lb/` or `/v1/<24 alphanumeric chars>/`.
pub fn normalize_path<'a>(method: &Method, path: &'a str) -> Cow<'a, str> {
    if *method != Method::POST {
        return Cow::Borrowed(path);
    }

    if path.starts_with(LOAD_BALANCER_PREFIX) {
        return flatten_after(path, LOAD_BALANCER_PREFIX.len());
    }

    if is_application_path(path) {
        return flatten_after(path, APPLICATION_PREFIX_LEN);
    }

    Cow::Borrowed(path)
}

/// Rewrites the request URI in place.
pub fn normalize_request<B>(request: &mut Request<B>) -> Result<()> {
    let normalized = match request.uri().path_and_query() {
        Some(path_and_query) => match normalize_path(request.method(), path_and_query.as_str()) {
            Cow::Borrowed(_) => return Ok(()),
            Cow::Owned(normalized) => normalized,
        },
        None => return Ok(()),
    };

    let path_and_query = PathAndQuery::try_from(normalized)
        .map_err(|e| GatewayError::BadRequest(format!("Invalid normalized path: {}", e)))?;

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    *request.uri_mut() = Uri::from_parts(parts)
        .map_err(|e| GatewayError::BadRequest(format!("Invalid normalized URI: {}", e)))?;

    Ok(())
}

/// `/v1/` + 24 ASCII alphanumerics + `/`.
///
/// Compares bytes so multibyte characters near the id boundary never split.
fn is_application_path(path: &str) -> bool {
    path.strip_prefix(V1_PREFIX).is_some_and(|rest| {
        let bytes = rest.as_bytes();
        bytes.len() > APPLICATION_ID_LEN
            && bytes[APPLICATION_ID_LEN] == b'/'
            && bytes[..APPLICATION_ID_LEN].iter().all(u8::is_ascii_alphanumeric)
    })
}

fn flatten_after(path: &str, prefix_len: usize) -> Cow<'_, str> {
    let (prefix, rest) = path.split_at(prefix_len);
    if rest.contains('/') {
        Cow::Owned(format!("{}{}", prefix, rest.replace('/', "~")))
    } else {
        Cow::Borrowed(path)
    }
}
