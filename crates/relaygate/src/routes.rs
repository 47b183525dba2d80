//! Route table and relay handler.
//!
//! [`RouteTable`] is the default [`SequenceActions`] implementation. It
//! matches normalized paths against four patterns:
//!
//! - `POST /v1/lb/{id}` and `GET /v1/lb/{id}` for load balancer relays
//! - `POST /v1/{id}` and `GET /v1/{id}` for application relays
//!
//! `{id}` is a single segment. A flattened sub-path travels inside it after
//! the first `~` and is restored to slashes in [`RouteMatch::sub_path`].

use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Method, StatusCode};
use relaygate_common::http::{error_response, json_response};
use relaygate_common::{GatewayError, HttpResponse, Result};
use relaygate_session::RELAY_PATH;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::context::RequestContext;
use crate::sequence::{GatewayRequest, SequenceActions};

/// Response header echoing the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Family of a matched route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// `/v1/lb/{id}`
    LoadBalancer,
    /// `/v1/{id}`
    Application,
}

impl RouteKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RouteKind::LoadBalancer => "loadBalancer",
            RouteKind::Application => "application",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of matching a normalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub kind: RouteKind,
    pub method: Method,
    /// Load balancer or application id
    pub id: String,
    /// Blockchain sub-path with slashes restored, e.g. `/foo/bar`
    pub sub_path: Option<String>,
}

impl RouteMatch {
    /// Matches `method` and `path` against the gateway's route patterns.
    ///
    /// Returns `None` for any other method or shape.
    pub fn parse(method: &Method, path: &str) -> Option<Self> {
        if *method != Method::GET && *method != Method::POST {
            return None;
        }

        let rest = path.strip_prefix("/v1/")?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest == "lb" {
            return None;
        }

        let (kind, segment) = match rest.split_once('/') {
            Some(("lb", segment)) => (RouteKind::LoadBalancer, segment),
            Some(_) => return None,
            None => (RouteKind::Application, rest),
        };

        if segment.is_empty() || segment.contains('/') {
            return None;
        }

        let (id, sub_path) = match segment.split_once('~') {
            Some((id, flattened)) => (id, Some(format!("/{}", flattened.replace('~', "/")))),
            None => (segment, None),
        };
        if id.is_empty() {
            return None;
        }

        Some(Self {
            kind,
            method: method.clone(),
            id: id.to_string(),
            sub_path,
        })
    }
}

/// Handler bound to a route family.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Handles a matched request.
    ///
    /// # Arguments
    /// * `route` - The matched route
    /// * `params` - Parsed JSON body, or `null` for GET
    /// * `ctx` - Request context filled by the pipeline
    async fn handle(&self, route: &RouteMatch, params: Value, ctx: &RequestContext) -> Result<Value>;
}

/// A matched route with the handler that serves it.
pub struct ResolvedRoute {
    pub matched: RouteMatch,
    handler: Arc<dyn RouteHandler>,
}

/// Route families and their handlers.
///
/// # Example
///
/// ```
/// use relaygate::routes::{RelayHandler, RouteKind, RouteTable};
/// use std::sync::Arc;
///
/// let table = RouteTable::new()
///     .route(RouteKind::LoadBalancer, Arc::new(RelayHandler))
///     .route(RouteKind::Application, Arc::new(RelayHandler));
/// assert!(table.handles(RouteKind::Application));
/// ```
#[derive(Default)]
pub struct RouteTable {
    handlers: HashMap<RouteKind, Arc<dyn RouteHandler>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn route(mut self, kind: RouteKind, handler: Arc<dyn RouteHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn handles(&self, kind: RouteKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

#[async_trait]
impl SequenceActions for RouteTable {
    type Route = ResolvedRoute;
    type Args = Value;
    type Output = Value;

    fn find_route(&self, request: &GatewayRequest, _ctx: &RequestContext) -> Result<ResolvedRoute> {
        let path = request.uri().path();
        let not_found = || GatewayError::NotFound(format!("{} {}", request.method(), path));

        let matched = RouteMatch::parse(request.method(), path).ok_or_else(not_found)?;
        let handler = self.handlers.get(&matched.kind).ok_or_else(not_found)?.clone();

        Ok(ResolvedRoute { matched, handler })
    }

    async fn parse_params(
        &self,
        request: &GatewayRequest,
        route: &ResolvedRoute,
        _ctx: &RequestContext,
    ) -> Result<Value> {
        if route.matched.method != Method::POST {
            return Ok(Value::Null);
        }

        let body = request.body();
        if body.is_empty() {
            return Err(GatewayError::BadRequest("Request body is required".into()));
        }

        serde_json::from_slice(body)
            .map_err(|e| GatewayError::BadRequest(format!("Request body is not valid JSON: {}", e)))
    }

    async fn invoke(&self, route: &ResolvedRoute, args: Value, ctx: &RequestContext) -> Result<Value> {
        route.handler.handle(&route.matched, args, ctx).await
    }

    fn send(&self, ctx: &RequestContext, output: Value) -> HttpResponse {
        let mut response = json_response(StatusCode::OK, &output);
        tag_request_id(&mut response, ctx);
        response
    }

    fn reject(&self, ctx: &RequestContext, error: GatewayError) -> HttpResponse {
        warn!(
            status = error.status_code().as_u16(),
            request_id = ctx.request_id().unwrap_or("-"),
            "Request rejected: {}",
            error
        );
        let mut response = error_response(&error);
        tag_request_id(&mut response, ctx);
        response
    }
}

fn tag_request_id(response: &mut HttpResponse, ctx: &RequestContext) {
    if let Some(value) = ctx.request_id().and_then(|id| HeaderValue::from_str(id).ok()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
}

/// Forwards requests through the bound session as signed relays.
///
/// The relay payload carries the route kind and id, the restored sub-path,
/// the caller's `relay-path` header, the HTTP method and the parsed body.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayHandler;

#[async_trait]
impl RouteHandler for RelayHandler {
    async fn handle(&self, route: &RouteMatch, params: Value, ctx: &RequestContext) -> Result<Value> {
        let session = ctx
            .session()
            .ok_or_else(|| GatewayError::InternalServerError("No client session bound".into()))?;
        let identity = ctx
            .signing_identity()
            .ok_or_else(|| GatewayError::InternalServerError("No signing identity bound".into()))?;

        let payload = json!({
            "kind": route.kind.as_str(),
            "id": route.id,
            "path": route.sub_path,
            "relayPath": ctx.relay_path(),
            "method": route.method.as_str(),
            "data": params,
        });

        session.relay(identity.address_hex(), RELAY_PATH, payload).await
    }
}
