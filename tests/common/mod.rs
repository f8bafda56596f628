//! Shared utilities for integration tests.
#![allow(dead_code)]

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use endpoint_router::cache::ResponseCache;
use endpoint_router::config::{CacheConfig, DispatchConfig};
use endpoint_router::dispatch::Dispatcher;
use endpoint_router::health::{HistoryRecorder, MemoryHistoryStore};
use endpoint_router::registry::{Capability, Endpoint, EndpointRegistry};
use endpoint_router::resilience::ConcurrencyGate;
use endpoint_router::transport::{OutboundRequest, Transport, TransportError, TransportResponse};

/// What a scripted host does with one request.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(u16, &'static str),
    /// Reply after holding the request open for a while.
    Slow(Duration, u16, &'static str),
    Timeout,
    Refused,
}

/// In-process transport answering per host from a script.
///
/// Each host has an optional queue of one-shot steps and a fallback step
/// used once the queue is empty. Hosts with neither refuse connections.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<OutboundRequest>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every request to `host` with `step`.
    pub fn always(&self, host: &str, step: Step) {
        self.fallback.lock().unwrap().insert(host.to_string(), step);
    }

    /// Answer the next request to `host` with `step`, before the fallback.
    pub fn then(&self, host: &str, step: Step) {
        self.queued
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .push_back(step);
    }

    /// Hosts contacted, in order.
    pub fn hosts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.host_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_step(&self, host: &str) -> Step {
        if let Some(step) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(host)
            .and_then(|q| q.pop_front())
        {
            return step;
        }
        self.fallback
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or(Step::Refused)
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, request: OutboundRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        let host = request.url.host_str().unwrap_or_default().to_string();
        let timeout = request.timeout;
        let step = self.next_step(&host);
        self.calls.lock().unwrap().push(request);

        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let result = match step {
                Step::Reply(status, body) => Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }),
                Step::Slow(delay, status, body) => {
                    tokio::time::sleep(delay).await;
                    Ok(TransportResponse {
                        status,
                        body: body.to_string(),
                    })
                }
                Step::Timeout => Err(TransportError::Timeout(timeout)),
                Step::Refused => Err(TransportError::Connect("connection refused".to_string())),
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
        .boxed()
    }
}

/// An endpoint at `http://{host}` serving `capabilities`.
pub fn endpoint(name: &str, host: &str, capabilities: &[&str]) -> Arc<Endpoint> {
    Arc::new(Endpoint::new(
        name,
        Url::parse(&format!("http://{}", host)).unwrap(),
        capabilities.iter().map(Capability::new),
        "/health",
        3,
    ))
}

/// Dispatch settings with short delays so tests run quickly.
pub fn fast_dispatch() -> DispatchConfig {
    DispatchConfig {
        rate_limit_delay_ms: 30,
        retry_base_delay_ms: 5,
        retry_max_delay_ms: 20,
        ..DispatchConfig::default()
    }
}

/// A dispatcher over `endpoints` with its collaborators exposed.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub registry: Arc<EndpointRegistry>,
    pub cache: Arc<ResponseCache>,
    pub gate: Arc<ConcurrencyGate>,
    pub recorder: Arc<HistoryRecorder>,
    pub store: Arc<MemoryHistoryStore>,
}

impl Harness {
    pub fn new(
        endpoints: Vec<Arc<Endpoint>>,
        transport: Arc<dyn Transport>,
        dispatch: DispatchConfig,
        cache: ResponseCache,
    ) -> Self {
        let registry = Arc::new(EndpointRegistry::from_endpoints(endpoints));
        let cache = Arc::new(cache);
        let gate = Arc::new(ConcurrencyGate::new(dispatch.max_concurrent_requests));
        let store = Arc::new(MemoryHistoryStore::new());
        let recorder = Arc::new(HistoryRecorder::new(store.clone(), 20));
        let dispatcher = Dispatcher::new(
            registry.clone(),
            cache.clone(),
            gate.clone(),
            transport,
            recorder.clone(),
            dispatch,
        );
        Self {
            dispatcher,
            registry,
            cache,
            gate,
            recorder,
            store,
        }
    }

    pub fn with_defaults(endpoints: Vec<Arc<Endpoint>>, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            endpoints,
            transport,
            fast_dispatch(),
            ResponseCache::new(&CacheConfig::default()),
        )
    }
}

/// Status line and body served by a mock backend.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Raw request heads received by a mock backend.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a programmable mock HTTP backend on an ephemeral port.
///
/// `respond` sees the request line (`GET /path?query HTTP/1.1`).
pub async fn start_programmable_backend<F>(respond: F) -> (SocketAddr, RequestLog)
where
    F: Fn(&str) -> MockReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let requests = log.clone();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let respond = respond.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let request_line = head.lines().next().unwrap_or_default().to_string();
                requests.lock().unwrap().push(head);

                let reply = respond(&request_line);
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.status,
                    reason(reply.status),
                    reply.body.len(),
                    reply.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, log)
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, RequestLog) {
    start_programmable_backend(move |_| MockReply::ok(body)).await
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
