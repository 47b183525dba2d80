// Copyright 2025 Relaygate Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Request-scoped property store.
//!
//! A [`RequestContext`] is created at the start of every request, filled by
//! the pipeline stages, handed by reference to the route collaborators, and
//! dropped when the request completes. Every key can be bound at most once.

use relaygate_common::{GatewayError, Result};
use relaygate_session::{ClientSession, SessionConfig};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::identity::SigningIdentity;

/// Well-known context keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKey {
    Host,
    UserAgent,
    Origin,
    ContentType,
    RelayPath,
    HttpMethod,
    SecretKey,
    RequestId,
    PocketInstance,
    PocketConfiguration,
    SigningIdentity,
}

impl ContextKey {
    /// Binding name as seen by route collaborators.
    pub const fn as_str(self) -> &'static str {
        match self {
            ContextKey::Host => "host",
            ContextKey::UserAgent => "userAgent",
            ContextKey::Origin => "origin",
            ContextKey::ContentType => "contentType",
            ContextKey::RelayPath => "relayPath",
            ContextKey::HttpMethod => "httpMethod",
            ContextKey::SecretKey => "secretKey",
            ContextKey::RequestId => "requestID",
            ContextKey::PocketInstance => "pocketInstance",
            ContextKey::PocketConfiguration => "pocketConfiguration",
            ContextKey::SigningIdentity => "signingIdentity",
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value bound to a context key.
#[derive(Clone)]
pub enum ContextValue {
    /// Header-derived text; `None` when the header was absent
    Text(Option<String>),
    Session(Arc<ClientSession>),
    Configuration(Arc<SessionConfig>),
    Identity(SigningIdentity),
}

/// Write-once mapping of context keys to values.
#[derive(Default)]
pub struct RequestContext {
    bindings: HashMap<ContextKey, ContextValue>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `key`.
    ///
    /// # Errors
    /// `GatewayError::ContextRebound` if the key already has a value.
    pub fn bind(&mut self, key: ContextKey, value: ContextValue) -> Result<()> {
        if self.bindings.contains_key(&key) {
            return Err(GatewayError::ContextRebound(key.as_str()));
        }
        self.bindings.insert(key, value);
        Ok(())
    }

    pub fn bind_text(&mut self, key: ContextKey, value: Option<String>) -> Result<()> {
        self.bind(key, ContextValue::Text(value))
    }

    pub fn get(&self, key: ContextKey) -> Option<&ContextValue> {
        self.bindings.get(&key)
    }

    pub fn is_bound(&self, key: ContextKey) -> bool {
        self.bindings.contains_key(&key)
    }

    /// Text value of `key`, `None` if unbound, absent, or not text.
    pub fn text(&self, key: ContextKey) -> Option<&str> {
        match self.bindings.get(&key) {
            Some(ContextValue::Text(value)) => value.as_deref(),
            _ => None,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.text(ContextKey::Host)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.text(ContextKey::UserAgent)
    }

    pub fn origin(&self) -> Option<&str> {
        self.text(ContextKey::Origin)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.text(ContextKey::ContentType)
    }

    pub fn relay_path(&self) -> Option<&str> {
        self.text(ContextKey::RelayPath)
    }

    pub fn http_method(&self) -> Option<&str> {
        self.text(ContextKey::HttpMethod)
    }

    /// Secret key from Basic auth; empty when none was supplied.
    pub fn secret_key(&self) -> &str {
        self.text(ContextKey::SecretKey).unwrap_or("")
    }

    pub fn request_id(&self) -> Option<&str> {
        self.text(ContextKey::RequestId)
    }

    pub fn session(&self) -> Option<&Arc<ClientSession>> {
        match self.bindings.get(&ContextKey::PocketInstance) {
            Some(ContextValue::Session(session)) => Some(session),
            _ => None,
        }
    }

    pub fn session_config(&self) -> Option<&Arc<SessionConfig>> {
        match self.bindings.get(&ContextKey::PocketConfiguration) {
            Some(ContextValue::Configuration(config)) => Some(config),
            _ => None,
        }
    }

    pub fn signing_identity(&self) -> Option<&SigningIdentity> {
        match self.bindings.get(&ContextKey::SigningIdentity) {
            Some(ContextValue::Identity(identity)) => Some(identity),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&'static str> = self.bindings.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id())
            .field("keys", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaygate_session::DispatcherSet;

    #[test]
    fn test_bind_and_read_text() {
        let mut ctx = RequestContext::new();
        ctx.bind_text(ContextKey::Host, Some("gateway.local".into())).unwrap();
        ctx.bind_text(ContextKey::Origin, None).unwrap();

        assert_eq!(ctx.host(), Some("gateway.local"));
        assert_eq!(ctx.origin(), None);
        assert!(ctx.is_bound(ContextKey::Origin));
        assert!(!ctx.is_bound(ContextKey::UserAgent));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_keys_are_write_once() {
        let mut ctx = RequestContext::new();
        ctx.bind_text(ContextKey::SecretKey, Some("first".into())).unwrap();
        let err = ctx.bind_text(ContextKey::SecretKey, Some("second".into())).unwrap_err();

        assert!(matches!(err, GatewayError::ContextRebound("secretKey")));
        assert_eq!(ctx.secret_key(), "first");
    }

    #[test]
    fn test_secret_key_defaults_to_empty() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.secret_key(), "");
    }

    #[test]
    fn test_session_bindings() {
        let config = Arc::new(SessionConfig::for_gateway(25, 60_000));
        let session = Arc::new(ClientSession::new(
            DispatcherSet::parse("http://a").unwrap(),
            config.clone(),
        ));

        let mut ctx = RequestContext::new();
        ctx.bind(ContextKey::PocketInstance, ContextValue::Session(session.clone()))
            .unwrap();
        ctx.bind(ContextKey::PocketConfiguration, ContextValue::Configuration(config.clone()))
            .unwrap();

        assert!(Arc::ptr_eq(ctx.session().unwrap(), &session));
        assert!(Arc::ptr_eq(ctx.session_config().unwrap(), &config));
        // Wrong-typed lookups come back empty
        assert_eq!(ctx.text(ContextKey::PocketInstance), None);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(ContextKey::UserAgent.as_str(), "userAgent");
        assert_eq!(ContextKey::RequestId.to_string(), "requestID");
        assert_eq!(ContextKey::PocketConfiguration.as_str(), "pocketConfiguration");
    }
}
