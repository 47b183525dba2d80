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

//! # Relaygate Entry Point
//!
//! Starts the gateway HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! # Everything from the environment
//! DISPATCH_URL=http://dispatch-1:8081,http://dispatch-2:8081 \
//! GATEWAY_CLIENT_PRIVATE_KEY=<hex> \
//! GATEWAY_CLIENT_PASSPHRASE=<passphrase> \
//! relaygate
//!
//! # Flags override the environment
//! relaygate -b 127.0.0.1:3000 --dispatch-url http://127.0.0.1:8081 --shared-session
//! ```
//!
//! Every option falls back to its environment variable, then to its default.

use anyhow::{Context, Result};
use argh::FromArgs;
use relaygate::config::{DEFAULT_BLOCK_TIME_MS, DEFAULT_SESSION_BLOCK_FREQUENCY};
use relaygate::{
    GatewayConfig, GatewaySequence, HttpServer, RelayHandler, RouteKind, RouteTable, SessionBootstrapper,
    SessionMode,
};
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_BIND: &str = "0.0.0.0:3000";

const ENV_DISPATCH_URL: &str = "DISPATCH_URL";
const ENV_SESSION_BLOCK_FREQUENCY: &str = "POCKET_SESSION_BLOCK_FREQUENCY";
const ENV_BLOCK_TIME: &str = "POCKET_BLOCK_TIME";
const ENV_CLIENT_PRIVATE_KEY: &str = "GATEWAY_CLIENT_PRIVATE_KEY";
const ENV_CLIENT_PASSPHRASE: &str = "GATEWAY_CLIENT_PASSPHRASE";
const ENV_BIND: &str = "GATEWAY_BIND";
const ENV_SHARED_SESSION: &str = "GATEWAY_SHARED_SESSION";

#[derive(FromArgs, Debug, Default)]
/// Relaygate - signed relay gateway for a dispatcher network
struct Args {
    /// address to bind the gateway's HTTP server to
    ///
    /// Falls back to GATEWAY_BIND, then 0.0.0.0:3000.
    #[argh(option, short = 'b')]
    bind: Option<String>,

    /// comma-separated dispatcher URLs
    ///
    /// Falls back to DISPATCH_URL. Required.
    #[argh(option, long = "dispatch-url")]
    dispatch_url: Option<String>,

    /// number of network blocks per session
    ///
    /// Falls back to POCKET_SESSION_BLOCK_FREQUENCY, then 25.
    #[argh(option, long = "session-block-frequency")]
    session_block_frequency: Option<u64>,

    /// network block time in milliseconds
    ///
    /// Falls back to POCKET_BLOCK_TIME, then 60000.
    #[argh(option, long = "block-time")]
    block_time: Option<u64>,

    /// hex-encoded private key of the gateway's signing account
    ///
    /// Falls back to GATEWAY_CLIENT_PRIVATE_KEY. Required.
    #[argh(option, long = "client-private-key")]
    client_private_key: Option<String>,

    /// passphrase protecting the signing account
    ///
    /// Falls back to GATEWAY_CLIENT_PASSPHRASE. Required.
    #[argh(option, long = "client-passphrase")]
    client_passphrase: Option<String>,

    /// build one session at startup and share it across requests
    ///
    /// Also enabled by GATEWAY_SHARED_SESSION=true or 1.
    #[argh(switch, long = "shared-session")]
    shared_session: bool,
}

/// Fully resolved startup settings.
#[derive(Debug)]
struct Settings {
    bind: SocketAddr,
    gateway: GatewayConfig,
}

impl Args {
    /// Resolves every setting as flag, then `env`, then default.
    ///
    /// # Arguments
    /// * `env` - Environment lookup, `std::env::var` in production
    ///
    /// # Errors
    /// Returns an error when a required value is missing or a value does not parse.
    fn resolve(self, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let bind = self
            .bind
            .or_else(|| env(ENV_BIND))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", bind))?;

        let dispatch_url = self
            .dispatch_url
            .or_else(|| env(ENV_DISPATCH_URL))
            .with_context(|| format!("{} or --dispatch-url is required", ENV_DISPATCH_URL))?;
        let client_private_key = self
            .client_private_key
            .or_else(|| env(ENV_CLIENT_PRIVATE_KEY))
            .with_context(|| format!("{} or --client-private-key is required", ENV_CLIENT_PRIVATE_KEY))?;
        let client_passphrase = self
            .client_passphrase
            .or_else(|| env(ENV_CLIENT_PASSPHRASE))
            .with_context(|| format!("{} or --client-passphrase is required", ENV_CLIENT_PASSPHRASE))?;

        let session_block_frequency = match self.session_block_frequency {
            Some(value) => value,
            None => parse_env_u64(&env, ENV_SESSION_BLOCK_FREQUENCY)?.unwrap_or(DEFAULT_SESSION_BLOCK_FREQUENCY),
        };
        let block_time_ms = match self.block_time {
            Some(value) => value,
            None => parse_env_u64(&env, ENV_BLOCK_TIME)?.unwrap_or(DEFAULT_BLOCK_TIME_MS),
        };

        let shared = self.shared_session
            || env(ENV_SHARED_SESSION).is_some_and(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"));
        let session_mode = if shared {
            SessionMode::Shared
        } else {
            SessionMode::PerRequest
        };

        let gateway = GatewayConfig::new(dispatch_url, client_private_key, client_passphrase)
            .with_block_timing(session_block_frequency, block_time_ms)
            .with_session_mode(session_mode);

        Ok(Settings { bind, gateway })
    }
}

fn parse_env_u64(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    env(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a non-negative integer, got '{}'", name, raw))
        })
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = args.resolve(|name| std::env::var(name).ok())?;
    let dispatchers = settings
        .gateway
        .validate()
        .context("Invalid gateway configuration")?;

    tracing::info!(
        "Starting gateway with {} dispatcher(s) [{}], session mode {:?}",
        dispatchers.len(),
        dispatchers,
        settings.gateway.session_mode
    );

    let bootstrapper = SessionBootstrapper::new(settings.gateway)
        .warm()
        .await
        .context("Failed to prepare the shared session")?;

    let routes = RouteTable::new()
        .route(RouteKind::LoadBalancer, Arc::new(RelayHandler))
        .route(RouteKind::Application, Arc::new(RelayHandler));

    let server = HttpServer::new(GatewaySequence::new(Arc::new(bootstrapper), Arc::new(routes)));
    server.run(settings.bind).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_DISPATCH_URL, "http://a:8081,http://b:8081"),
            (ENV_CLIENT_PRIVATE_KEY, "abcd"),
            (ENV_CLIENT_PASSPHRASE, "pass"),
        ]
    }

    #[test]
    fn test_cli_parse_flags() {
        let args = Args::from_args(
            &["relaygate"],
            &["-b", "127.0.0.1:4000", "--dispatch-url", "http://x", "--shared-session"],
        )
        .unwrap();
        assert_eq!(args.bind.as_deref(), Some("127.0.0.1:4000"));
        assert_eq!(args.dispatch_url.as_deref(), Some("http://x"));
        assert!(args.shared_session);
    }

    #[test]
    fn test_defaults_from_env() {
        let settings = Args::default().resolve(env_from(&required_env())).unwrap();

        assert_eq!(settings.bind, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.gateway.dispatch_url, "http://a:8081,http://b:8081");
        assert_eq!(settings.gateway.session_block_frequency, 25);
        assert_eq!(settings.gateway.block_time_ms, 60_000);
        assert_eq!(settings.gateway.session_mode, SessionMode::PerRequest);
    }

    #[test]
    fn test_flags_override_env() {
        let mut env = required_env();
        env.push((ENV_BIND, "0.0.0.0:9999"));
        env.push((ENV_BLOCK_TIME, "1000"));

        let args = Args {
            bind: Some("127.0.0.1:3001".into()),
            dispatch_url: Some("http://flag:1".into()),
            block_time: Some(5000),
            ..Args::default()
        };
        let settings = args.resolve(env_from(&env)).unwrap();

        assert_eq!(settings.bind.port(), 3001);
        assert_eq!(settings.gateway.dispatch_url, "http://flag:1");
        assert_eq!(settings.gateway.block_time_ms, 5000);
    }

    #[test]
    fn test_block_timing_from_env() {
        let mut env = required_env();
        env.push((ENV_SESSION_BLOCK_FREQUENCY, "4"));
        env.push((ENV_BLOCK_TIME, "15000"));

        let settings = Args::default().resolve(env_from(&env)).unwrap();
        assert_eq!(settings.gateway.session_block_frequency, 4);
        assert_eq!(settings.gateway.block_time_ms, 15_000);
    }

    #[test]
    fn test_invalid_numeric_env_is_error() {
        let mut env = required_env();
        env.push((ENV_BLOCK_TIME, "soon"));
        assert!(Args::default().resolve(env_from(&env)).is_err());
    }

    #[test]
    fn test_missing_required_values() {
        assert!(Args::default().resolve(env_from(&[])).is_err());
        let without_key: Vec<_> = required_env()
            .into_iter()
            .filter(|(k, _)| *k != ENV_CLIENT_PRIVATE_KEY)
            .collect();
        assert!(Args::default().resolve(env_from(&without_key)).is_err());
    }

    #[test]
    fn test_shared_session_from_env() {
        let mut env = required_env();
        env.push((ENV_SHARED_SESSION, "true"));
        let settings = Args::default().resolve(env_from(&env)).unwrap();
        assert_eq!(settings.gateway.session_mode, SessionMode::Shared);
    }

    #[test]
    fn test_invalid_bind_is_error() {
        let args = Args {
            bind: Some("not-an-address".into()),
            ..Args::default()
        };
        assert!(args.resolve(env_from(&required_env())).is_err());
    }
}
