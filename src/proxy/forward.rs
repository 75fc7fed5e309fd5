// ────────────────────────────────
// src/proxy/forward.rs
// The outbound leg: send one prepared request upstream, hand back the reply.
// ────────────────────────────────
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{self, HeaderMap, HeaderName};
use hyper::{Body, Client, Request, Response, Version};
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sends a request whose URI already points at the chosen backend.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, BoxError>;
}

/// Hyper client based forwarder. Pools keep-alive connections per backend.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(connect_timeout);
        connector.set_nodelay(true);

        let client = Client::builder().build(connector);
        Self { client }
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, mut req: Request<Body>) -> Result<Response<Body>, BoxError> {
        strip_hop_by_hop(req.headers_mut());
        *req.version_mut() = Version::HTTP_11;

        let mut response = self.client.request(req).await?;
        strip_hop_by_hop(response.headers_mut());
        Ok(response)
    }
}

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Drop headers that only describe the current connection, including any
/// extra names listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn removes_hop_by_hop_and_connection_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("sticky"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert("x-test", HeaderValue::from_static("1"));
        headers.insert(header::HOST, HeaderValue::from_static("lb.example:8000"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-test"], "1");
        assert_eq!(headers[header::HOST], "lb.example:8000");
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let req = Request::builder()
            .uri(format!("http://127.0.0.1:{}/", port))
            .body(Body::empty())
            .unwrap();

        let result = HttpForwarder::default().forward(req).await;
        assert!(result.is_err());
    }
}
