// src/config/error.rs

/// Startup-time configuration failures. Any of these prevents the listener
/// from starting.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend pool is empty: at least one backend must be configured")]
    NoBackends,

    #[error("backend {host}:{port} has an invalid port (must be 1-65535)")]
    InvalidPort { host: String, port: u16 },

    #[error("backend host {0:?} is not a valid host name or address")]
    InvalidHost(String),

    #[error("cannot parse backend {0:?}: expected host:port")]
    UnparsableBackend(String),

    #[error("listen host {0:?} is not a valid IP address")]
    InvalidListenHost(String),
}
