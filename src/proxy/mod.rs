//
// src/proxy/mod.rs
//
mod backend;
mod dispatcher;
mod error;
mod forward;
mod pool;

pub use backend::Backend;
pub use dispatcher::{Dispatcher, ForwardOutcome};
pub use error::ProxyError;
pub use forward::{strip_hop_by_hop, BoxError, Forwarder, HttpForwarder};
pub use pool::BackendPool;
