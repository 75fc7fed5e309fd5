//! demos/echo_backend.rs
//! Run: cargo run --example echo_backend -- <port> [name]
//!
//! Upstream for trying the proxy by hand: answers every request with a JSON
//! description of what it received.

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use serde_json::json;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

#[derive(Clone)]
struct EchoState {
    port:        u16,
    name:        String,
    req_counter: Arc<AtomicU64>,
    delay_ms:    u64,
}

// ——————————————————————————————————————————
// Request handler
async fn handle(req: Request<Body>, state: EchoState) -> Result<Response<Body>, hyper::Error> {
    let n = state.req_counter.fetch_add(1, Ordering::SeqCst) + 1;

    if state.delay_ms > 0 {
        sleep(Duration::from_millis(state.delay_ms)).await;
    }

    let (parts, body) = req.into_parts();
    let body = hyper::body::to_bytes(body).await?;
    let headers: serde_json::Map<String, serde_json::Value> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                json!(String::from_utf8_lossy(value.as_bytes())),
            )
        })
        .collect();

    let echo = json!({
        "backend": &state.name,
        "port": state.port,
        "req": n,
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    });

    let mut response = Response::new(Body::from(echo.to_string()));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        "content-type",
        hyper::header::HeaderValue::from_static("application/json"),
    );
    if let Ok(value) = hyper::header::HeaderValue::from_str(&state.name) {
        response.headers_mut().insert("x-backend-name", value);
    }
    Ok(response)
}

// ——————————————————————————————————————————
// Main
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "3001".into())
        .parse()?;
    let name = std::env::args()
        .nth(2)
        .or_else(|| std::env::var("BACKEND_NAME").ok())
        .unwrap_or_else(|| format!("backend-{port}"));
    let delay_ms =
        std::env::var("DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(0);

    let state = EchoState {
        port,
        name: name.clone(),
        req_counter: Arc::new(AtomicU64::new(0)),
        delay_ms,
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, st.clone()))) }
    });

    println!("Echo backend '{}' on http://{}  [delay={}ms]", name, addr, delay_ms);

    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
