// ────────────────────────────────
// src/proxy/dispatcher.rs
// One request in, one response out: pick a backend, forward, relay or 502.
// ────────────────────────────────

use super::{Backend, BackendPool, Forwarder, ProxyError};
use hyper::{Body, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Result of one forwarding attempt.
pub type ForwardOutcome = Result<Response<Body>, ProxyError>;

pub struct Dispatcher {
    pool: Arc<BackendPool>,
    forwarder: Arc<dyn Forwarder>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(pool: Arc<BackendPool>, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            pool,
            forwarder,
            timeout: None,
        }
    }

    /// Give up on an upstream that has not answered within `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Always produces exactly one response. Upstream failures are answered
    /// with a 502; the backend is chosen once and never revisited.
    pub async fn handle_request(&self, req: Request<Body>) -> Response<Body> {
        let target = self.pool.next_backend();
        let span = info_span!("dispatch", request_id = %Uuid::new_v4(), %target);

        async move {
            info!(method = %req.method(), uri = %req.uri(), "Forwarding request to: {}", target);

            let mut in_flight = InFlight::new(&target);
            let outcome = self.forward_to(&target, req).await;
            in_flight.finish();

            match outcome {
                Ok(response) => {
                    debug!(status = %response.status(), "upstream responded");
                    response
                }
                Err(err) => {
                    error!(%err, "Error connecting to {}", target);
                    err.into()
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Re-address `req` at `target` and send it, without touching method,
    /// headers, or body.
    pub async fn forward_to(&self, target: &Backend, req: Request<Body>) -> ForwardOutcome {
        let (mut parts, body) = req.into_parts();
        parts.uri = target
            .uri_for(parts.uri.path_and_query())
            .map_err(|source| ProxyError::InvalidTarget {
                target: target.to_string(),
                source,
            })?;
        let outbound = Request::from_parts(parts, body);

        let forward = self.forwarder.forward(outbound);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, forward)
                .await
                .map_err(|_| ProxyError::UpstreamTimeout {
                    target: target.to_string(),
                    after: limit,
                })?,
            None => forward.await,
        };

        result.map_err(|source| ProxyError::UpstreamUnreachable {
            target: target.to_string(),
            source,
        })
    }
}

/// Notices when the dispatch future is dropped mid-forward, which is how
/// hyper reports that the client hung up.
struct InFlight {
    target: Option<String>,
}

impl InFlight {
    fn new(target: &Backend) -> Self {
        Self {
            target: Some(target.to_string()),
        }
    }

    fn finish(&mut self) {
        self.target = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            let err = ProxyError::ClientDisconnected { target };
            debug!(%err, "abandoning in-flight forward");
        }
    }
}
