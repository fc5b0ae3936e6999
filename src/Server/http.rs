// HTTP transport: JSON bodies posted to the `/Athena` endpoints.
//
// The client side is blocking so it can run on the dispatcher's worker
// thread. The server owns a tokio runtime on a dedicated thread and serves
// an axum router until shut down.

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::transport::{Connector, Link, LinkOutcome, LogService};
use super::wire::{MessagesQuery, WireMessage, GET_MESSAGES_PATH, WRITE_MESSAGE_PATH};
use crate::error::{ServerError, TransportError};

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8521;

/// Bound on one request/response exchange. The caller's timeout only
/// covers establishing the connection.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const SERVER_WORKER_THREADS: usize = 2;

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::Http(e)
    }
}

/// Opens HTTP links to one server address.
///
/// The underlying client is built once per connect timeout and shared by
/// every link. Connections are not pooled, so each request opens and
/// closes its own.
#[derive(Debug)]
pub struct HttpConnector {
    addr: SocketAddr,
    request_timeout: Duration,
    client: Mutex<Option<(Duration, Client)>>,
}

impl HttpConnector {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: Mutex::new(None),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn client(&self, connect_timeout: Duration) -> Result<Client, reqwest::Error> {
        let mut cached = self.client.lock();
        if let Some((timeout, client)) = cached.as_ref() {
            if *timeout == connect_timeout {
                return Ok(client.clone());
            }
        }
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        *cached = Some((connect_timeout, client.clone()));
        Ok(client)
    }
}

impl Connector for HttpConnector {
    fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn open(&self, timeout: Duration) -> LinkOutcome<Box<dyn Link>> {
        match self.client(timeout.max(Duration::from_millis(1))) {
            Ok(client) => LinkOutcome::Ok(Box::new(HttpLink {
                client: Some(client),
                base: self.endpoint(),
            })),
            Err(e) => LinkOutcome::Failed(classify(e)),
        }
    }
}

struct HttpLink {
    client: Option<Client>,
    base: String,
}

impl HttpLink {
    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::Disconnected)?;
        let response = client
            .post(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .ok()
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| status.to_string());
            debug!(url = %self.base, %status, "server rejected request");
            return Err(TransportError::Server(reason));
        }
        Ok(response)
    }
}

impl Link for HttpLink {
    fn write_message(&mut self, message: &WireMessage) -> Result<(), TransportError> {
        self.post(WRITE_MESSAGE_PATH, message).map(drop)
    }

    fn get_messages(&mut self, since: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError> {
        self.post(GET_MESSAGES_PATH, &MessagesQuery { since })?
            .json()
            .map_err(classify)
    }

    fn close(&mut self, _timeout: Duration) -> LinkOutcome<()> {
        // Each request already ran on its own connection.
        self.client = None;
        LinkOutcome::Ok(())
    }

    fn abort(self: Box<Self>) {}
}

/// Serves a [`LogService`] over HTTP until shut down.
pub struct HttpLogServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    runner: Option<JoinHandle<()>>,
}

impl HttpLogServer {
    /// Bind `addr` and start serving on a background runtime.
    pub fn bind<A: ToSocketAddrs>(addr: A, service: Arc<dyn LogService>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(SERVER_WORKER_THREADS)
            .thread_name("dmxp-log-http")
            .enable_all()
            .build()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(service);

        let runner = thread::Builder::new()
            .name("dmxp-log-server".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            error!(addr = %local_addr, error = %e, "could not register listener");
                            return;
                        }
                    };
                    let stop = async move {
                        let _ = shutdown_rx.await;
                    };
                    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
                        error!(addr = %local_addr, error = %e, "log server failed");
                    }
                });
            })?;

        info!(addr = %local_addr, "log server listening");
        Ok(Self {
            local_addr,
            shutdown: Some(shutdown_tx),
            runner: Some(runner),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let in-flight requests finish and wait for the
    /// runtime to wind down.
    pub fn shutdown(&mut self) {
        let Some(runner) = self.runner.take() else {
            return;
        };
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if runner.join().is_err() {
            error!("log server thread panicked");
        }
        info!(addr = %self.local_addr, "log server stopped");
    }
}

impl Drop for HttpLogServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn router(service: Arc<dyn LogService>) -> Router {
    Router::new()
        .route(WRITE_MESSAGE_PATH, post(write_message))
        .route(GET_MESSAGES_PATH, post(get_messages))
        .with_state(service)
}

fn rejected(e: TransportError) -> (StatusCode, String) {
    warn!(error = %e, "request rejected by service");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn write_message(
    State(service): State<Arc<dyn LogService>>,
    Json(message): Json<WireMessage>,
) -> Result<StatusCode, (StatusCode, String)> {
    service
        .write_message(message)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(rejected)
}

async fn get_messages(
    State(service): State<Arc<dyn LogService>>,
    Json(query): Json<MessagesQuery>,
) -> Result<Json<Vec<WireMessage>>, (StatusCode, String)> {
    service.get_messages(query.since).map(Json).map_err(rejected)
}
