//! Gateway HTTP Server Integration Tests
//!
//! Runs the gateway in front of a mock dispatcher and checks that relays
//! arrive signed and that failures come back as JSON error bodies.

use ed25519_dalek::{Signature, SigningKey, Verifier};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use relaygate::routes::REQUEST_ID_HEADER;
use relaygate::{
    GatewayConfig, GatewaySequence, HttpServer, RelayHandler, RouteKind, RouteTable, SessionBootstrapper,
    SessionMode,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ============================================================================
// Mock Dispatcher
// ============================================================================

/// Dispatcher that records every relay envelope and answers `{"relayed": true}`.
struct MockDispatcher {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<(String, Value)>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockDispatcher {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));

        let store = received.clone();
        let handle = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let store = store.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let store = store.clone();
                        async move {
                            let path = req.uri().path().to_string();
                            let body = req.into_body().collect().await.unwrap().to_bytes();
                            let envelope: Value = serde_json::from_slice(&body).unwrap();
                            store.lock().unwrap().push((path, envelope));
                            let reply = serde_json::to_vec(&json!({"relayed": true})).unwrap();
                            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(reply))))
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            received,
            _handle: handle,
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

async fn start_gateway(dispatch_url: String, mode: SessionMode) -> SocketAddr {
    let key = hex::encode(signing_key().to_keypair_bytes());
    let config = GatewayConfig::new(dispatch_url, key, "gateway-pass").with_session_mode(mode);
    let bootstrapper = SessionBootstrapper::new(config).warm().await.unwrap();

    let routes = RouteTable::new()
        .route(RouteKind::LoadBalancer, Arc::new(RelayHandler))
        .route(RouteKind::Application, Arc::new(RelayHandler));
    let server = HttpServer::new(GatewaySequence::new(Arc::new(bootstrapper), Arc::new(routes)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));
    addr
}

async fn call(addr: SocketAddr, method: Method, path: &str, body: &str) -> (StatusCode, Option<String>, Value) {
    let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build_http();
    let request = Request::builder()
        .method(method)
        .uri(format!("http://{}{}", addr, path))
        .header("content-type", "application/json")
        .header("relay-path", "/v1/query/height")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap();

    let response = client.request(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, request_id, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_relay_is_signed_and_forwarded() {
    let dispatcher = MockDispatcher::start().await;
    let gateway = start_gateway(dispatcher.url(), SessionMode::PerRequest).await;

    let (status, request_id, body) = call(
        gateway,
        Method::POST,
        "/v1/lb/LB0000000001/v1/query/height",
        r#"{"jsonrpc":"2.0"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request_id.map(|id| id.len()), Some(11));
    assert_eq!(body, json!({"relayed": true}));

    let received = dispatcher.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let (path, envelope) = &received[0];
    assert_eq!(path, "/v1/client/relay");

    let payload = &envelope["payload"];
    assert_eq!(payload["kind"], "loadBalancer");
    assert_eq!(payload["id"], "LB0000000001");
    assert_eq!(payload["path"], "/v1/query/height");
    assert_eq!(payload["relayPath"], "/v1/query/height");
    assert_eq!(payload["method"], "POST");
    assert_eq!(payload["data"], json!({"jsonrpc": "2.0"}));

    let signature_bytes = hex::decode(envelope["signature"].as_str().unwrap()).unwrap();
    let signature = Signature::from_slice(&signature_bytes).unwrap();
    let signed = serde_json::to_vec(payload).unwrap();
    assert!(signing_key().verifying_key().verify(&signed, &signature).is_ok());
    assert_eq!(envelope["address"].as_str().unwrap().len(), 40);
}

#[tokio::test]
async fn test_application_route_over_shared_session() {
    let dispatcher = MockDispatcher::start().await;
    let gateway = start_gateway(dispatcher.url(), SessionMode::Shared).await;

    for _ in 0..2 {
        let (status, _, _) = call(gateway, Method::POST, "/v1/abcdefghijklmnopqrstuvwx/a/b", "{}").await;
        assert_eq!(status, StatusCode::OK);
    }

    let received = dispatcher.received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].1["payload"]["kind"], "application");
    assert_eq!(received[0].1["payload"]["path"], "/a/b");
    assert_eq!(received[0].1["address"], received[1].1["address"]);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let dispatcher = MockDispatcher::start().await;
    let gateway = start_gateway(dispatcher.url(), SessionMode::PerRequest).await;

    let (status, request_id, body) = call(gateway, Method::POST, "/v2/nothing", "{}").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(request_id.is_some());
    assert_eq!(body["error"]["statusCode"], 404);
    assert_eq!(body["error"]["name"], "NotFoundError");
    assert!(dispatcher.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_json_body_is_400() {
    let dispatcher = MockDispatcher::start().await;
    let gateway = start_gateway(dispatcher.url(), SessionMode::PerRequest).await;

    let (status, _, body) = call(gateway, Method::POST, "/v1/lb/LB1", "{oops").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["name"], "BadRequestError");
    assert!(dispatcher.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_dispatcher_is_502() {
    let gateway = start_gateway("http://127.0.0.1:1".to_string(), SessionMode::PerRequest).await;

    let (status, _, body) = call(gateway, Method::POST, "/v1/lb/LB1", "{}").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["statusCode"], 502);
    assert_eq!(body["error"]["message"], "Bad Gateway");
}

#[tokio::test]
async fn test_raw_utf8_path_still_gets_a_response() {
    let dispatcher = MockDispatcher::start().await;
    let gateway = start_gateway(dispatcher.url(), SessionMode::PerRequest).await;

    // hyper accepts raw UTF-8 in the request target; the 'é' straddles the
    // end of the 24-byte application id slot
    let path = format!("/v1/{}é/x", "a".repeat(23));
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: gateway.local\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
        path
    );

    let mut stream = TcpStream::connect(gateway).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 404"), "unexpected response: {}", response);
    assert!(dispatcher.received.lock().unwrap().is_empty());
}
