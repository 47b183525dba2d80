//! Session bootstrap.
//!
//! Resolves dispatchers, builds the session configuration and client
//! session, binds them into the request context, and unlocks the signing
//! identity. In [`SessionMode::PerRequest`] all of this happens on every
//! request; in [`SessionMode::Shared`] it happens once in
//! [`SessionBootstrapper::warm`] and requests only attach the result.

use relaygate_common::Result;
use relaygate_session::{ClientSession, DispatcherSet, SessionConfig};
use std::sync::Arc;
use tracing::info;

use crate::config::{GatewayConfig, SessionMode};
use crate::context::{ContextKey, ContextValue, RequestContext};
use crate::identity::{unlock_identity, SigningIdentity};

/// Session, configuration and identity built by one bootstrap run.
#[derive(Clone)]
pub struct BoundSession {
    pub config: Arc<SessionConfig>,
    pub session: Arc<ClientSession>,
    pub identity: SigningIdentity,
}

/// Builds and attaches client sessions.
pub struct SessionBootstrapper {
    config: GatewayConfig,
    shared: Option<BoundSession>,
}

impl SessionBootstrapper {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config, shared: None }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The session shared by all requests, once warmed.
    pub fn shared_session(&self) -> Option<&BoundSession> {
        self.shared.as_ref()
    }

    /// Builds the shared session when running in [`SessionMode::Shared`].
    ///
    /// A no-op in per-request mode.
    ///
    /// # Errors
    /// Dispatcher or identity failures; callers treat them as fatal at startup.
    pub async fn warm(mut self) -> Result<Self> {
        if self.config.session_mode == SessionMode::Shared {
            let mut scratch = RequestContext::new();
            let bound = self.build(&mut scratch).await?;
            info!(
                "Shared session ready with {} dispatcher(s), signing as {}",
                bound.session.dispatchers().len(),
                bound.identity.address_hex()
            );
            self.shared = Some(bound);
        }
        Ok(self)
    }

    /// Attaches a session to `ctx`, building one first unless shared.
    ///
    /// Binds `pocketConfiguration`, `pocketInstance` and `signingIdentity`.
    pub async fn bootstrap(&self, ctx: &mut RequestContext) -> Result<()> {
        match &self.shared {
            Some(bound) => {
                bind_session(ctx, bound)?;
                ctx.bind(ContextKey::SigningIdentity, ContextValue::Identity(bound.identity.clone()))
            }
            None => self.build(ctx).await.map(|_| ()),
        }
    }

    /// Builds a session and unlocks the identity in it.
    ///
    /// The session is bound into `ctx` before the unlock runs, so an unlock
    /// failure leaves the session bound but no identity.
    async fn build(&self, ctx: &mut RequestContext) -> Result<BoundSession> {
        let dispatchers = DispatcherSet::parse(&self.config.dispatch_url)?;
        let config = Arc::new(SessionConfig::for_gateway(
            self.config.session_block_frequency,
            self.config.block_time_ms,
        ));
        let session = Arc::new(ClientSession::new(dispatchers, config.clone()));

        ctx.bind(ContextKey::PocketConfiguration, ContextValue::Configuration(config.clone()))?;
        ctx.bind(ContextKey::PocketInstance, ContextValue::Session(session.clone()))?;

        let identity = unlock_identity(
            &session,
            &self.config.client_private_key,
            &self.config.client_passphrase,
        )
        .await?;
        ctx.bind(ContextKey::SigningIdentity, ContextValue::Identity(identity.clone()))?;

        Ok(BoundSession {
            config,
            session,
            identity,
        })
    }
}

fn bind_session(ctx: &mut RequestContext, bound: &BoundSession) -> Result<()> {
    ctx.bind(ContextKey::PocketConfiguration, ContextValue::Configuration(bound.config.clone()))?;
    ctx.bind(ContextKey::PocketInstance, ContextValue::Session(bound.session.clone()))
}
