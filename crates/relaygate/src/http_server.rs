//! HTTP Server for the Gateway
//!
//! hyper HTTP/1.1 server in front of a [`GatewaySequence`].
//!
//! # Architecture
//!
//! The server:
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Reads each request body in full
//! - Hands the request to the sequence, which always produces a response
//!
//! # Example
//!
//! ```no_run
//! use relaygate::{GatewayConfig, GatewaySequence, HttpServer, SessionBootstrapper};
//! use relaygate::routes::{RelayHandler, RouteKind, RouteTable};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GatewayConfig::new("http://dispatch-1:8081", "<hex key>", "passphrase");
//!     let routes = RouteTable::new().route(RouteKind::LoadBalancer, Arc::new(RelayHandler));
//!     let sequence = GatewaySequence::new(
//!         Arc::new(SessionBootstrapper::new(config)),
//!         Arc::new(routes),
//!     );
//!     let server = HttpServer::new(sequence);
//!     server.run("127.0.0.1:3000".parse().unwrap()).await.unwrap();
//! }
//! ```

use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use relaygate_common::{GatewayError, HttpResponse, Result};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::context::{ContextKey, RequestContext};
use crate::metadata::generate_request_id;
use crate::sequence::{GatewaySequence, SequenceActions};

/// HTTP server for the gateway.
pub struct HttpServer<A> {
    sequence: Arc<GatewaySequence<A>>,
}

impl<A: SequenceActions> HttpServer<A> {
    pub fn new(sequence: GatewaySequence<A>) -> Self {
        Self {
            sequence: Arc::new(sequence),
        }
    }

    /// Binds `addr` and serves until the accept loop fails.
    ///
    /// # Arguments
    /// * `addr` - The socket address to bind to
    ///
    /// # Errors
    /// `GatewayError::Transport` if binding or accepting fails.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        tracing::info!(
            "Gateway listening on {}",
            listener
                .local_addr()
                .map_err(|e| GatewayError::Transport(format!("Failed to get local address: {}", e)))?
        );

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| GatewayError::Transport(format!("Failed to accept connection: {}", e)))?;

            let io = TokioIo::new(stream);
            let sequence = self.sequence.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let sequence = sequence.clone();
                    async move { Ok::<_, Infallible>(Self::handle_request(sequence, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!("Error serving connection from {}: {}", peer, err);
                }
            });
        }
    }

    /// Reads the body and runs the sequence.
    ///
    /// A body that cannot be read is rejected through the sequence's
    /// rejection handler with a fresh correlation id.
    async fn handle_request<B>(sequence: Arc<GatewaySequence<A>>, req: Request<B>) -> HttpResponse
    where
        B: Body,
        B::Error: fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let mut ctx = RequestContext::new();
                if let Err(bind_err) = ctx.bind_text(ContextKey::RequestId, Some(generate_request_id())) {
                    tracing::debug!("Unable to tag unreadable request: {}", bind_err);
                }
                let error = GatewayError::BadRequest(format!("Failed to read request body: {}", e));
                return sequence.actions().reject(&ctx, error);
            }
        };

        sequence.handle(Request::from_parts(parts, body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::routes::{RouteTable, REQUEST_ID_HEADER};
    use crate::SessionBootstrapper;
    use hyper::body::{Bytes, Frame};
    use hyper::StatusCode;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Body whose first frame is a read error.
    struct BrokenBody;

    impl Body for BrokenBody {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<std::result::Result<Frame<Bytes>, io::Error>>> {
            Poll::Ready(Some(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away"))))
        }
    }

    fn sequence() -> Arc<GatewaySequence<RouteTable>> {
        let config = GatewayConfig::new("http://127.0.0.1:1", "00", "pass");
        Arc::new(GatewaySequence::new(
            Arc::new(SessionBootstrapper::new(config)),
            Arc::new(RouteTable::new()),
        ))
    }

    #[tokio::test]
    async fn test_unreadable_body_goes_through_reject() {
        let request = Request::builder()
            .method(hyper::Method::POST)
            .uri("/v1/lb/XYZ")
            .body(BrokenBody)
            .unwrap();

        let response = HttpServer::handle_request(sequence(), request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // Only the route table's rejection handler sets this header
        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert_eq!(request_id.len(), 11);
    }
}
