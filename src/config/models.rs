// src/config/models.rs
use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LISTEN_PORT: u16 = 8000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_listen_host")]
    pub listen_host: IpAddr,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// May be left out when `LB_BACKENDS` supplies the pool.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
}

/// Knobs for the outbound leg. Both timeouts are disabled when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Values picked up from `LB_*` environment variables.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EnvOverrides {
    #[serde(default)]
    pub listen_host: Option<String>,

    #[serde(default)]
    pub listen_port: Option<u16>,

    /// Comma-separated `host:port` list.
    #[serde(default)]
    pub backends: Option<String>,
}

fn default_listen_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            backends: (3001..=3003)
                .map(|port| BackendConfig {
                    host: "localhost".to_string(),
                    port,
                })
                .collect(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_host, self.listen_port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        for backend in &self.backends {
            backend.validate()?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: EnvOverrides) -> Result<(), ConfigError> {
        if let Some(host) = overrides.listen_host {
            self.listen_host = host
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidListenHost(host.clone()))?;
        }
        if let Some(port) = overrides.listen_port {
            self.listen_port = port;
        }
        if let Some(list) = overrides.backends {
            self.backends = list
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(BackendConfig::from_str)
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort {
                host: self.host.clone(),
                port: self.port,
            });
        }
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        // Let the URL parser decide what a legal authority host is.
        url::Url::parse(&format!("http://{}:{}/", host, self.port))
            .ok()
            .filter(|url| url.host_str().is_some())
            .map(|_| ())
            .ok_or_else(|| ConfigError::InvalidHost(self.host.clone()))
    }
}

impl FromStr for BackendConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::UnparsableBackend(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::UnparsableBackend(s.to_string()))?;

        let backend = BackendConfig {
            host: host.to_string(),
            port,
        };
        backend.validate()?;
        Ok(backend)
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
