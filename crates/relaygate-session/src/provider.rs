//! HTTP transport over the dispatcher set.
//!
//! [`HttpRpcProvider`] posts JSON payloads to dispatchers in round-robin
//! order. Construction only records the dispatcher set and builds a lazy
//! hyper client; connections are opened on the first [`send`](HttpRpcProvider::send).

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use relaygate_common::{GatewayError, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use crate::dispatcher::DispatcherSet;

/// Round-robin JSON transport bound to a dispatcher set.
pub struct HttpRpcProvider {
    dispatchers: DispatcherSet,
    next: AtomicUsize,
    timeout: Duration,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpRpcProvider {
    /// Creates a provider for the given dispatchers.
    ///
    /// # Arguments
    /// * `dispatchers` - Dispatcher endpoints, walked in order
    /// * `timeout` - Upper bound on each request, including reading the body
    pub fn new(dispatchers: DispatcherSet, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            dispatchers,
            next: AtomicUsize::new(0),
            timeout,
            client,
        }
    }

    pub fn dispatchers(&self) -> &DispatcherSet {
        &self.dispatchers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Next dispatcher in round-robin order.
    pub fn next_dispatcher(&self) -> &Url {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.dispatchers.get_wrapping(index)
    }

    /// Posts `payload` to `path` on the next dispatcher.
    ///
    /// # Arguments
    /// * `path` - Path joined onto the dispatcher URL (e.g. `/v1/client/relay`)
    /// * `payload` - JSON request body
    ///
    /// # Returns
    /// - `Ok(Value)` - The decoded JSON response body
    /// - `Err(GatewayError::Timeout)` - The dispatcher did not answer in time
    /// - `Err(GatewayError::Transport)` - Connection failure or non-2xx status
    pub async fn send(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = self
            .next_dispatcher()
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("Invalid relay path '{}': {}", path, e)))?;

        let body = serde_json::to_vec(payload)?;
        let mut request = Request::new(Full::new(Bytes::from(body)));
        *request.method_mut() = Method::POST;
        *request.uri_mut() = url
            .as_str()
            .parse()
            .map_err(|e| GatewayError::Transport(format!("Invalid dispatcher URI '{}': {}", url, e)))?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!("Sending relay to {}", url);

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| GatewayError::Transport(format!("HTTP request to {} failed: {}", url, e)))?;

            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| GatewayError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            if !status.is_success() {
                return Err(GatewayError::Transport(format!(
                    "Dispatcher {} answered with status {}",
                    url, status
                )));
            }

            let value: Value = serde_json::from_slice(&bytes)?;
            Ok::<Value, GatewayError>(value)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| GatewayError::Timeout(timeout_ms))?
    }
}
