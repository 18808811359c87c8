//! HTTP server lifecycle and graceful shutdown.
//!
//! ```text
//! Server::new(config, router)   construct, no I/O
//!     .bind().await?            TCP listener bound, local_addr() known
//!     .serve().await?           run until SIGTERM / Ctrl-C
//! ```
//!
//! [`Listening::spawn`] runs the same loop on a background task and returns
//! a [`RunningServer`] whose [`stop`](RunningServer::stop) ends it.
//!
//! On shutdown the server:
//! 1. Stops calling `accept()`. New connections are refused.
//! 2. Asks every open connection to finish its in-flight request and close.
//! 3. Waits up to `drain_timeout` for that, then aborts whatever is left and
//!    returns. No connection outlives `serve_with_shutdown`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{ALLOW, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::request::Request;
use crate::response::{Response, ResponseBuilder};
use crate::router::{Lookup, Router};

/// A configured, not yet bound, HTTP server.
pub struct Server {
    config: ServerConfig,
    router: Router,
}

impl Server {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// Binds the listening socket.
    ///
    /// Fails if the configured host does not resolve or the port cannot be
    /// bound. Port `0` asks the OS for a free port; read it back with
    /// [`Listening::local_addr`].
    pub async fn bind(self) -> Result<Listening, Error> {
        let addr = self.config.resolve().await?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Listening {
            listener,
            local_addr,
            router: Arc::new(self.router),
            drain_timeout: self.config.drain_timeout,
        })
    }
}

/// A server with a bound listener, ready to accept connections.
pub struct Listening {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Arc<Router>,
    drain_timeout: Duration,
}

impl Listening {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until the process receives SIGTERM or Ctrl-C, then shuts down
    /// gracefully.
    pub async fn serve(self) -> Result<(), Error> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then shuts down gracefully.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let Self { listener, local_addr, router, drain_timeout } = self;

        info!(addr = %local_addr, "heartbeat listening");

        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        // Every connection task, so shutdown can wait for or abort them.
        let mut tasks = JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting immediately,
                // even with connections still queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(&router, req).await }
                    });

                    // The auto builder speaks HTTP/1.1 and HTTP/2, whichever
                    // the client opens with.
                    let conn = builder.serve_connection(TokioIo::new(stream), svc).into_owned();
                    let conn = graceful.watch(conn);

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Refuse new connections while the open ones drain.
        drop(listener);

        tokio::select! {
            () = graceful.shutdown() => {}
            () = tokio::time::sleep(drain_timeout) => {
                warn!(
                    timeout_secs = drain_timeout.as_secs(),
                    remaining = tasks.len(),
                    "drain timed out, closing remaining connections"
                );
                tasks.abort_all();
            }
        }

        // Aborted tasks drop their sockets as they are joined.
        while tasks.join_next().await.is_some() {}

        info!("heartbeat stopped");
        Ok(())
    }

    /// Serves on a background task. The returned handle stops it.
    pub fn spawn(self) -> RunningServer {
        let local_addr = self.local_addr;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(self.serve_with_shutdown(async move {
            // A dropped sender also means stop.
            let _ = stop_rx.await;
        }));

        RunningServer { local_addr, stop_tx, task }
    }
}

/// Handle to a server running on a background task.
pub struct RunningServer {
    local_addr: SocketAddr,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Triggers graceful shutdown and waits for it to complete.
    pub async fn stop(self) -> Result<(), Error> {
        // The task may already have exited; its result is still in the handle.
        let _ = self.stop_tx.send(());
        self.task.await?
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// Infallible: 404, 405, and handler failures are all expressed as responses.
async fn dispatch(
    router: &Router,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let response = match router.lookup(&method, &path) {
        Lookup::Found(handler) => handler.call(Request::from_parts(parts)).await,
        Lookup::MethodNotAllowed(allowed) => method_not_allowed(&allowed),
        Lookup::NotFound => detail(StatusCode::NOT_FOUND),
    };

    debug!(
        %method,
        path = %path,
        status = response.status_code().as_u16(),
        latency_us = started.elapsed().as_micros() as u64,
        "request"
    );

    Ok(response.into_inner())
}

/// Default error body for unrouted requests: `{"detail":"<reason>"}`.
fn detail(status: StatusCode) -> Response {
    detail_with(Response::builder(), status)
}

fn detail_with(builder: ResponseBuilder, status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or_default();
    let body = serde_json::json!({ "detail": reason }).to_string();
    builder.status(status).json(body)
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    let mut builder = Response::builder();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        builder = builder.header(ALLOW, value);
    }
    detail_with(builder, StatusCode::METHOD_NOT_ALLOWED)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Unix) or Ctrl-C the process receives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => info!("received Ctrl-C"),
        () = sigterm => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_body_names_the_reason() {
        let res = detail(StatusCode::NOT_FOUND);

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body().as_ref(), br#"{"detail":"Not Found"}"#);
    }

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let res = method_not_allowed(&[Method::GET, Method::PUT]);

        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, PUT");
        assert_eq!(res.body().as_ref(), br#"{"detail":"Method Not Allowed"}"#);
    }

    #[tokio::test]
    async fn bind_rejects_unresolvable_host() {
        let config = ServerConfig { host: String::new(), ..Default::default() };
        let err = Server::new(config, Router::new()).bind().await.err().unwrap();

        assert!(matches!(err, Error::Resolve { .. }));
    }
}
