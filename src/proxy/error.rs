// src/proxy/error.rs
use super::forward::BoxError;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use std::time::Duration;

/// Per-request failures. None of them outlive the request that raised them.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("could not reach upstream {target}: {source}")]
    UpstreamUnreachable {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("upstream {target} did not respond within {after:?}")]
    UpstreamTimeout { target: String, after: Duration },

    #[error("cannot address upstream {target}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: hyper::http::Error,
    },

    #[error("client went away while {target} was being forwarded to")]
    ClientDisconnected { target: String },
}

impl ProxyError {
    pub fn target(&self) -> &str {
        match self {
            ProxyError::UpstreamUnreachable { target, .. }
            | ProxyError::UpstreamTimeout { target, .. }
            | ProxyError::InvalidTarget { target, .. }
            | ProxyError::ClientDisconnected { target } => target,
        }
    }
}

// Every upstream-side failure looks the same to the client.
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let message = format!(
            "Bad Gateway: Could not connect to the upstream server {}.\n",
            err.target()
        );

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = StatusCode::BAD_GATEWAY;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
