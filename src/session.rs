use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;

const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-scoped handle to the shared outbound connection pool.
///
/// `acquire` is idempotent: the pool is built on first use and every later
/// call returns a clone of the same pooled client. `release` tears the pool
/// down and is a no-op when it is already closed. Callers must not issue new
/// requests after `release`; in-flight requests on already-cloned clients
/// are allowed to complete.
#[derive(Clone, Default)]
pub struct SessionManager {
    pool: Arc<Mutex<Option<Client>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> Result<Client> {
        let mut pool = self
            .pool
            .lock()
            .map_err(|_| anyhow!("session pool lock poisoned"))?;
        if let Some(client) = pool.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .context("failed to build shared HTTP client")?;
        *pool = Some(client.clone());
        Ok(client)
    }

    pub fn release(&self) {
        if let Ok(mut pool) = self.pool.lock() {
            pool.take();
        }
    }

    pub fn is_open(&self) -> bool {
        self.pool
            .lock()
            .map(|pool| pool.is_some())
            .unwrap_or(false)
    }
}
