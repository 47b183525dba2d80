use relaygate_common::{GatewayError, Result};
use relaygate_session::DispatcherSet;
use std::fmt;

/// Default number of network blocks per session.
pub const DEFAULT_SESSION_BLOCK_FREQUENCY: u64 = 25;
/// Default network block time in milliseconds.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 60_000;

/// How client sessions are built across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Every request builds its own session and re-imports the identity.
    /// Requests never share an unlocked identity.
    #[default]
    PerRequest,
    /// The session is built and the identity unlocked once at startup;
    /// requests attach the shared session.
    Shared,
}

/// Process-level gateway configuration.
///
/// Treated as immutable input once the gateway is running. `Debug` output
/// redacts the private key and passphrase.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Comma-separated dispatcher URLs
    pub dispatch_url: String,
    /// Network blocks per session
    pub session_block_frequency: u64,
    /// Network block time in milliseconds
    pub block_time_ms: u64,
    /// Hex-encoded signing key
    pub client_private_key: String,
    /// Passphrase used when importing the signing key
    pub client_passphrase: String,
    pub session_mode: SessionMode,
}

impl GatewayConfig {
    /// Creates a per-request configuration with default block timing.
    pub fn new(
        dispatch_url: impl Into<String>,
        client_private_key: impl Into<String>,
        client_passphrase: impl Into<String>,
    ) -> Self {
        Self {
            dispatch_url: dispatch_url.into(),
            session_block_frequency: DEFAULT_SESSION_BLOCK_FREQUENCY,
            block_time_ms: DEFAULT_BLOCK_TIME_MS,
            client_private_key: client_private_key.into(),
            client_passphrase: client_passphrase.into(),
            session_mode: SessionMode::PerRequest,
        }
    }

    pub fn with_block_timing(mut self, session_block_frequency: u64, block_time_ms: u64) -> Self {
        self.session_block_frequency = session_block_frequency;
        self.block_time_ms = block_time_ms;
        self
    }

    pub fn with_session_mode(mut self, session_mode: SessionMode) -> Self {
        self.session_mode = session_mode;
        self
    }

    /// Validates values that must be correct before serving.
    ///
    /// Checks the dispatcher list parses and the private key is hex. Whether
    /// the key imports and unlocks is only known when a session is built.
    ///
    /// # Errors
    /// `GatewayError::Configuration` describing the first invalid value.
    pub fn validate(&self) -> Result<DispatcherSet> {
        let dispatchers = DispatcherSet::parse(&self.dispatch_url)?;

        if self.client_private_key.trim().is_empty() {
            return Err(GatewayError::Configuration("client private key is not set".into()));
        }
        hex::decode(self.client_private_key.trim()).map_err(|e| {
            GatewayError::Configuration(format!("client private key is not valid hex: {}", e))
        })?;

        if self.block_time_ms == 0 {
            return Err(GatewayError::Configuration("block time must be greater than zero".into()));
        }

        Ok(dispatchers)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("dispatch_url", &self.dispatch_url)
            .field("session_block_frequency", &self.session_block_frequency)
            .field("block_time_ms", &self.block_time_ms)
            .field("client_private_key", &"*****")
            .field("client_passphrase", &"*****")
            .field("session_mode", &self.session_mode)
            .finish()
    }
}
