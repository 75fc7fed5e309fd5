//
// src/proxy/pool.rs
//

use super::backend::Backend;
use crate::config::{BackendConfig, ConfigError};
use crate::load_balancer::RoundRobin;
use std::sync::Arc;

/// Fixed, ordered set of backends plus the rotation cursor that picks
/// between them. Contents never change after construction.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    rotation: RoundRobin,
}

impl BackendPool {
    pub fn new(backends: Vec<Backend>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }

        let backends: Vec<Arc<Backend>> = backends.into_iter().map(Arc::new).collect();
        let rotation = RoundRobin::new(backends.len());

        tracing::info!(
            "Backend pool ready: {}",
            backends
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self { backends, rotation })
    }

    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, ConfigError> {
        let backends = configs
            .iter()
            .map(Backend::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(backends)
    }

    /// Backend at the cursor; the cursor moves on by one, wrapping at the end.
    pub fn next_backend(&self) -> Arc<Backend> {
        self.backends[self.rotation.advance()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pool(ports: &[u16]) -> BackendPool {
        BackendPool::new(
            ports
                .iter()
                .map(|&port| Backend::new("127.0.0.1", port).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rotates_in_configured_order() {
        let pool = pool(&[3001, 3002, 3003]);
        let picks: Vec<u16> = (0..4).map(|_| pool.next_backend().port).collect();
        assert_eq!(picks, vec![3001, 3002, 3003, 3001]);
    }

    #[test]
    fn empty_pool_is_a_configuration_error() {
        assert_eq!(BackendPool::new(vec![]).unwrap_err(), ConfigError::NoBackends);
        assert_eq!(
            BackendPool::from_config(&[]).unwrap_err(),
            ConfigError::NoBackends
        );
    }

    #[test]
    fn invalid_entry_fails_the_whole_pool() {
        let configs = vec![
            BackendConfig { host: "localhost".into(), port: 3001 },
            BackendConfig { host: "localhost".into(), port: 0 },
        ];
        assert!(matches!(
            BackendPool::from_config(&configs),
            Err(ConfigError::InvalidPort { port: 0, .. })
        ));
    }

    #[test]
    fn duplicates_raise_that_backends_share() {
        let pool = pool(&[3001, 3001, 3002]);
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for _ in 0..30 {
            *counts.entry(pool.next_backend().port).or_default() += 1;
        }
        assert_eq!(counts[&3001], 20);
        assert_eq!(counts[&3002], 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_see_every_backend_equally() {
        let pool = Arc::new(pool(&[1, 2, 3]));
        let tasks: Vec<_> = (0..300)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.next_backend().port })
            })
            .collect();

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for task in futures::future::join_all(tasks).await {
            *counts.entry(task.unwrap()).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&n| n == 100), "{:?}", counts);
    }
}
