// src/config/mod.rs
mod error;
mod models;

pub use error::ConfigError;
pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Resolve the runtime configuration: the file at `path` if given (built-in
/// defaults otherwise), then `LB_*` environment overrides, then validation.
pub async fn load(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path).await?,
        None => Config::default(),
    };

    config.apply_overrides(env_overrides()?)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
    };

    Ok(config)
}

/// Read `LB_LISTEN_HOST`, `LB_LISTEN_PORT` and `LB_BACKENDS`.
pub fn env_overrides() -> Result<EnvOverrides> {
    let overrides = ::config::Config::builder()
        .add_source(::config::Environment::with_prefix("LB"))
        .build()
        .context("Failed to read LB_* environment")?
        .try_deserialize()
        .context("Invalid LB_* environment override")?;
    Ok(overrides)
}
