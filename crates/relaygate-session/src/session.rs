use relaygate_common::{GatewayError, Result};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::dispatcher::DispatcherSet;
use crate::keybase::Keybase;
use crate::provider::HttpRpcProvider;

/// Dispatcher path that accepts signed relays.
pub const RELAY_PATH: &str = "/v1/client/relay";

/// Client handle for relaying signed calls to the dispatcher network.
///
/// Binds a [`DispatcherSet`], a [`SessionConfig`], an [`HttpRpcProvider`]
/// built from the set, and a fresh [`Keybase`]. The keybase belongs to this
/// session only: identities unlocked here are not visible to any other
/// session.
///
/// # Example
///
/// ```
/// use relaygate_session::{ClientSession, DispatcherSet, SessionConfig};
/// use std::sync::Arc;
///
/// let dispatchers = DispatcherSet::parse("http://a,http://b").unwrap();
/// let session = ClientSession::new(dispatchers, Arc::new(SessionConfig::for_gateway(25, 60_000)));
/// assert_eq!(session.config().session_block_frequency(), 25);
/// ```
pub struct ClientSession {
    dispatchers: DispatcherSet,
    config: Arc<SessionConfig>,
    provider: HttpRpcProvider,
    keybase: Keybase,
}

impl ClientSession {
    /// Creates a session. Performs no network I/O.
    pub fn new(dispatchers: DispatcherSet, config: Arc<SessionConfig>) -> Self {
        let provider = HttpRpcProvider::new(dispatchers.clone(), config.request_timeout());
        Self {
            dispatchers,
            config,
            provider,
            keybase: Keybase::new(),
        }
    }

    pub fn dispatchers(&self) -> &DispatcherSet {
        &self.dispatchers
    }

    pub fn config(&self) -> &Arc<SessionConfig> {
        &self.config
    }

    pub fn provider(&self) -> &HttpRpcProvider {
        &self.provider
    }

    pub fn keybase(&self) -> &Keybase {
        &self.keybase
    }

    /// Signs `payload` with an unlocked account and sends it to a dispatcher.
    ///
    /// The envelope sent is `{"payload": ..., "address": ..., "signature": ...}`
    /// where `signature` is the hex ed25519 signature of the serialized payload.
    ///
    /// # Errors
    /// - `GatewayError::Handler` - The signing account is not unlocked in this session
    /// - `GatewayError::Transport` / `Timeout` - The dispatcher call failed
    pub async fn relay(&self, address_hex: &str, path: &str, payload: Value) -> Result<Value> {
        let body = serde_json::to_vec(&payload)?;
        let signature = self
            .keybase
            .sign(address_hex, &body)
            .await
            .map_err(|e| GatewayError::Handler(format!("Unable to sign relay: {}", e)))?;

        let envelope = json!({
            "payload": payload,
            "address": address_hex,
            "signature": hex::encode(signature),
        });

        self.provider.send(path, &envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(config: &str) -> ClientSession {
        ClientSession::new(
            DispatcherSet::parse(config).unwrap(),
            Arc::new(SessionConfig::for_gateway(25, 60_000)),
        )
    }

    #[test]
    fn test_session_binds_dispatchers_and_config() {
        let session = session("http://a,http://b,http://c");
        assert_eq!(session.dispatchers().len(), 3);
        assert_eq!(session.provider().dispatchers(), session.dispatchers());
        assert_eq!(session.provider().timeout(), Duration::from_millis(120_000));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_keybase() {
        let first = session("http://a");
        let second = session("http://a");

        let account = first.keybase().import_account(&[9u8; 32], "pass").await.unwrap();
        first
            .keybase()
            .unlock_account(account.address_hex(), "pass", Duration::ZERO)
            .await
            .unwrap();

        assert!(first.keybase().is_unlocked(account.address_hex()).await);
        assert!(!second.keybase().is_unlocked(account.address_hex()).await);
    }

    #[tokio::test]
    async fn test_relay_requires_unlocked_identity() {
        let session = session("http://127.0.0.1:1");
        let result = session.relay("deadbeef", RELAY_PATH, json!({})).await;
        assert!(matches!(result, Err(GatewayError::Handler(_))));
    }
}
