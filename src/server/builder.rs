// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::server::listener::bind_tcp;
use anyhow::{Context, Result};
use hyper::{server::conn::Http, Body, Request, Response};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Service;
use tracing::Instrument;

/// Pause after an accept error that is not tied to a single connection
/// (typically EMFILE/ENFILE), matching hyper's `AddrIncoming`.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Builder pattern so `main.rs` can inject its dispatcher (or any handler).
pub struct ServerBuilder<H> {
    addr: SocketAddr,
    handler: Option<H>,
}

/// A bound listener plus the handler each accepted connection gets a clone of.
pub struct Server<H> {
    listener: TcpListener,
    handler: H,
}

impl<H> ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, handler: None }
    }

    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Bind the socket without accepting yet; useful when binding to port 0.
    pub async fn bind(self) -> Result<Server<H>> {
        let handler = self
            .handler
            .context("handler must be set via with_handler()")?;
        let listener = bind_tcp(self.addr).await?;
        Ok(Server { listener, handler })
    }

    /// Bind, then accept until `shutdown` resolves.
    pub async fn serve<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        self.bind().await?.run(shutdown).await
    }
}

impl<H> Server<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Spawn one task per connection until `shutdown` resolves. Connections
    /// already accepted keep running on their own tasks.
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!("HTTP server listening on {}", addr);

        tokio::pin!(shutdown);
        let listener = &self.listener;
        loop {
            let (stream, peer) = tokio::select! {
                conn = accept_with_backoff(|| listener.accept(), ACCEPT_ERROR_BACKOFF) => conn,
                _ = &mut shutdown => {
                    tracing::info!("No longer accepting connections on {}", addr);
                    return Ok(());
                }
            };

            let svc = self.handler.clone();
            let span = tracing::debug_span!("connection", %peer);
            tokio::spawn(
                async move {
                    if let Err(err) = Http::new().serve_connection(stream, svc).await {
                        tracing::warn!(%err, "connection error");
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// Keep calling `accept` until it yields a connection. Errors that belong to
/// one aborted connection are retried at once; anything else sleeps for
/// `backoff` first so a full fd table cannot spin the loop.
async fn accept_with_backoff<T, F, Fut>(mut accept: F, backoff: Duration) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return conn,
            Err(err) if is_connection_error(&err) => {
                tracing::debug!(%err, "accepted connection failed");
            }
            Err(err) => {
                tracing::warn!(%err, "accept failed, pausing for {:?}", backoff);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn scripted(errors: Vec<io::ErrorKind>) -> impl FnMut() -> futures::future::Ready<io::Result<u32>> {
        let mut remaining = errors.into_iter();
        let mut attempts = 0u32;
        move || {
            attempts += 1;
            futures::future::ready(match remaining.next() {
                Some(kind) => Err(io::Error::from(kind)),
                None => Ok(attempts),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resource_errors_pause_before_retrying() {
        let started = Instant::now();
        let attempts = accept_with_backoff(
            scripted(vec![io::ErrorKind::Other, io::ErrorKind::Other, io::ErrorKind::Other]),
            Duration::from_millis(250),
        )
        .await;

        assert_eq!(attempts, 4);
        assert!(started.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_connections_retry_immediately() {
        let started = Instant::now();
        let attempts = accept_with_backoff(
            scripted(vec![
                io::ErrorKind::ConnectionAborted,
                io::ErrorKind::ConnectionReset,
            ]),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(attempts, 3);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_errors_wait_until_cancelled() {
        let stuck = accept_with_backoff(scripted(vec![io::ErrorKind::Other; 1000]), Duration::from_secs(1));
        let outcome = tokio::time::timeout(Duration::from_millis(1500), stuck).await;

        assert!(outcome.is_err());
    }
}
