//! Remote-first storage with a local fallback

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::StorageBackend;
use crate::{Error, Result};

/// Tries `primary` under a timeout and falls back to `local` when it fails
/// or does not answer in time.
///
/// Reads that the primary answers with "absent" are not retried locally.
pub struct FallbackStorage {
    primary: Arc<dyn StorageBackend>,
    local: Arc<dyn StorageBackend>,
    timeout: Duration,
}

impl FallbackStorage {
    pub fn new(primary: Arc<dyn StorageBackend>, local: Arc<dyn StorageBackend>, timeout: Duration) -> Self {
        Self {
            primary,
            local,
            timeout,
        }
    }

    async fn on_primary<T, F>(&self, op: &str, key: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} of '{}' on {} timed out after {:?}",
                    op,
                    key,
                    self.primary.name(),
                    self.timeout
                );
                Err(Error::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for FallbackStorage {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.on_primary("Read", key, self.primary.get(key)).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Reading '{}' from {} failed ({}), using {}", key, self.primary.name(), e, self.local.name());
                self.local.get(key).await
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.on_primary("Write", key, self.primary.set(key, value)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Writing '{}' to {} failed ({}), saving to {}", key, self.primary.name(), e, self.local.name());
                self.local.set(key, value).await
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if let Err(e) = self.on_primary("Remove", key, self.primary.remove(key)).await {
            warn!("Removing '{}' from {} failed: {}", key, self.primary.name(), e);
        }
        self.local.remove(key).await
    }
}
