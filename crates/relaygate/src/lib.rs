//! Relaygate Request Sequencing
//!
//! The per-request pipeline of the gateway. For every inbound request it:
//!
//! 1. builds (or attaches) a client session and unlocks the signing identity
//! 2. binds caller metadata and a correlation id into a [`RequestContext`]
//! 3. flattens blockchain sub-paths so the route table can match them
//! 4. finds the route, parses parameters, invokes the handler and writes the
//!    response, or funnels any failure into the rejection handler
//!
//! The session and signing logic lives in `relaygate-session`; errors and
//! response helpers in `relaygate-common`.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod http_server;
pub mod identity;
pub mod metadata;
pub mod path;
pub mod routes;
pub mod sequence;

pub use bootstrap::{BoundSession, SessionBootstrapper};
pub use config::{GatewayConfig, SessionMode};
pub use context::{ContextKey, ContextValue, RequestContext};
pub use http_server::HttpServer;
pub use identity::{unlock_identity, SigningIdentity, UNLOCK_FAILURE_MESSAGE};
pub use routes::{RelayHandler, RouteHandler, RouteKind, RouteMatch, RouteTable};
pub use sequence::{GatewayRequest, GatewaySequence, SequenceActions};
