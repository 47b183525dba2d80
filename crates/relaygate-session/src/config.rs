use std::time::Duration;

/// Default request timeout for relays (120 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Upper bound on cached sessions.
pub const DEFAULT_MAX_SESSIONS: u32 = 100_000;
/// Session refresh attempts before giving up.
pub const DEFAULT_MAX_SESSION_REFRESH_RETRIES: u32 = 1;

/// Immutable operational parameters of a client session.
///
/// Built once per session from process configuration and never mutated
/// afterwards; fields are only readable through accessors.
///
/// # Gateway Defaults
///
/// [`SessionConfig::for_gateway`] fixes everything except the two
/// network-timing values:
///
/// | parameter | value |
/// |-----------|-------|
/// | max dispatchers | 0 (no limit) |
/// | max sessions | 100 000 |
/// | consensus node count | 0 (consensus disabled) |
/// | request timeout | 120 000 ms |
/// | accept disputed responses | false |
/// | max session refresh retries | 1 |
/// | validate relay responses | true |
/// | reject self-signed certificates | false |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    max_dispatchers: u32,
    max_sessions: u32,
    consensus_node_count: u32,
    request_timeout: Duration,
    accept_disputed_responses: bool,
    session_block_frequency: u64,
    block_time: Duration,
    max_session_refresh_retries: u32,
    validate_relay_responses: bool,
    reject_self_signed_certificates: bool,
}

impl SessionConfig {
    /// Creates the configuration the gateway uses for every session.
    ///
    /// # Arguments
    /// * `session_block_frequency` - Number of network blocks per session
    /// * `block_time_ms` - Network block time in milliseconds
    pub fn for_gateway(session_block_frequency: u64, block_time_ms: u64) -> Self {
        Self {
            max_dispatchers: 0,
            max_sessions: DEFAULT_MAX_SESSIONS,
            consensus_node_count: 0,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            accept_disputed_responses: false,
            session_block_frequency,
            block_time: Duration::from_millis(block_time_ms),
            max_session_refresh_retries: DEFAULT_MAX_SESSION_REFRESH_RETRIES,
            validate_relay_responses: true,
            reject_self_signed_certificates: false,
        }
    }

    pub fn max_dispatchers(&self) -> u32 {
        self.max_dispatchers
    }

    pub fn max_sessions(&self) -> u32 {
        self.max_sessions
    }

    pub fn consensus_node_count(&self) -> u32 {
        self.consensus_node_count
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn accept_disputed_responses(&self) -> bool {
        self.accept_disputed_responses
    }

    pub fn session_block_frequency(&self) -> u64 {
        self.session_block_frequency
    }

    pub fn block_time(&self) -> Duration {
        self.block_time
    }

    pub fn max_session_refresh_retries(&self) -> u32 {
        self.max_session_refresh_retries
    }

    pub fn validate_relay_responses(&self) -> bool {
        self.validate_relay_responses
    }

    pub fn reject_self_signed_certificates(&self) -> bool {
        self.reject_self_signed_certificates
    }

    /// Wall-clock length of one session: block time times block frequency.
    pub fn session_refresh_interval(&self) -> Duration {
        let blocks = u32::try_from(self.session_block_frequency).unwrap_or(u32::MAX);
        self.block_time.saturating_mul(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let config = SessionConfig::for_gateway(25, 60_000);
        assert_eq!(config.max_dispatchers(), 0);
        assert_eq!(config.max_sessions(), 100_000);
        assert_eq!(config.consensus_node_count(), 0);
        assert_eq!(config.request_timeout(), Duration::from_millis(120_000));
        assert!(!config.accept_disputed_responses());
        assert_eq!(config.max_session_refresh_retries(), 1);
        assert!(config.validate_relay_responses());
        assert!(!config.reject_self_signed_certificates());
    }

    #[test]
    fn test_network_timing_values() {
        let config = SessionConfig::for_gateway(4, 15_000);
        assert_eq!(config.session_block_frequency(), 4);
        assert_eq!(config.block_time(), Duration::from_millis(15_000));
        assert_eq!(config.session_refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_refresh_interval_saturates() {
        let config = SessionConfig::for_gateway(u64::MAX, u64::MAX);
        assert_eq!(config.session_refresh_interval(), Duration::MAX);
    }
}
