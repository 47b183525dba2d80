//! Relaygate Network Session
//!
//! This crate builds the client-side handle used to relay signed calls to the
//! dispatcher network:
//!
//! - [`DispatcherSet`]: ordered, validated dispatcher endpoints
//! - [`SessionConfig`]: immutable operational parameters
//! - [`HttpRpcProvider`]: round-robin HTTP transport over the dispatchers
//! - [`Keybase`]: in-memory store of encrypted signing keys and unlocks
//! - [`ClientSession`]: the four of the above bound together
//!
//! Constructing any of these performs no network I/O.
//!
//! # Example
//!
//! ```no_run
//! use relaygate_session::{ClientSession, DispatcherSet, SessionConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatchers = DispatcherSet::parse("http://node-a:8081,http://node-b:8081")?;
//! let config = Arc::new(SessionConfig::for_gateway(25, 60_000));
//! let session = ClientSession::new(dispatchers, config);
//! assert_eq!(session.dispatchers().len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod keybase;
pub mod provider;
pub mod session;

pub use config::SessionConfig;
pub use dispatcher::DispatcherSet;
pub use keybase::{Account, Keybase, KeybaseError};
pub use provider::HttpRpcProvider;
pub use session::{ClientSession, RELAY_PATH};
