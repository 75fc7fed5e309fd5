// src/proxy/backend.rs
use crate::config::{BackendConfig, ConfigError};
use hyper::http::uri::{Authority, PathAndQuery, Uri};
use std::fmt;

/// One upstream server. Identity is the `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backend {
    pub host: String,
    pub port: u16,
    authority: Authority,
}

impl Backend {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into();
        BackendConfig {
            host: host.clone(),
            port,
        }
        .validate()?;

        let authority = format!("{}:{}", host, port)
            .parse::<Authority>()
            .map_err(|_| ConfigError::InvalidHost(host.clone()))?;

        Ok(Self {
            host,
            port,
            authority,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute `http://host:port/...` URI for an inbound path and query.
    pub fn uri_for(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, hyper::http::Error> {
        Uri::builder()
            .scheme("http")
            .authority(self.authority.clone())
            .path_and_query(path_and_query.map(PathAndQuery::as_str).unwrap_or("/"))
            .build()
    }
}

impl TryFrom<&BackendConfig> for Backend {
    type Error = ConfigError;

    fn try_from(config: &BackendConfig) -> Result<Self, Self::Error> {
        Backend::new(config.host.trim(), config.port)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
