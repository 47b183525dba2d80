//! Relaygate Common Types
//!
//! This crate provides the error taxonomy, HTTP response helpers and
//! authorization parsing shared by every relaygate component.
//!
//! # Overview
//!
//! Relaygate is a gateway that proxies client API calls to a decentralized
//! network of RPC-serving nodes (dispatchers). Every inbound request runs
//! through a fixed sequence: session bootstrap, identity unlock, metadata
//! extraction, path normalization and dispatch. This crate holds the pieces
//! those stages agree on:
//!
//! - **Errors**: [`GatewayError`], the single error type every stage returns
//! - **Protocol**: [`ErrorBody`], the JSON shape of a rejected request
//! - **HTTP**: [`HttpResponse`] and builders for JSON responses
//! - **Auth**: Basic-authentication secret key extraction
//!
//! # Example
//!
//! ```
//! use relaygate_common::{auth::extract_secret_key, GatewayError};
//!
//! // "Basic " + base64("user:secret123")
//! let secret = extract_secret_key(Some("Basic dXNlcjpzZWNyZXQxMjM="));
//! assert_eq!(secret, "secret123");
//!
//! let err = GatewayError::NotFound("no route".into());
//! assert_eq!(err.status_code().as_u16(), 404);
//! ```

pub mod auth;
pub mod error;
pub mod http;
pub mod protocol;

pub use error::{GatewayError, Result};
pub use http::HttpResponse;
pub use protocol::{ErrorBody, ErrorDetail};
