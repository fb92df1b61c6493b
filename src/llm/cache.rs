use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::ConversationLog;

use super::{JsonSchema, LlmClient, LlmError};

/// Configuration for the response cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached responses per kind (text / structured)
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

/// Memoizes successful responses of an inner client by conversation log.
///
/// Identical logs return the stored reply without a vendor round-trip.
/// Errors are never cached. The lock is released while the inner call runs,
/// so two identical concurrent misses may both reach the vendor.
pub struct CachedClient<C> {
    inner: C,
    text: Mutex<LruCache<ConversationLog, String>>,
    structured: Mutex<LruCache<(ConversationLog, String), Option<serde_json::Value>>>,
}

impl<C: LlmClient> CachedClient<C> {
    pub fn new(inner: C, config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            text: Mutex::new(LruCache::new(capacity)),
            structured: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Number of cached free-text responses
    pub async fn len(&self) -> usize {
        self.text.lock().await.len()
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for CachedClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, log: &ConversationLog) -> Result<String, LlmError> {
        if let Some(hit) = self.text.lock().await.get(log).cloned() {
            debug!("{}: cache hit ({} messages)", self.inner.name(), log.len());
            return Ok(hit);
        }

        info!("{}: cache miss, calling vendor", self.inner.name());
        let response = self.inner.fetch(log).await?;
        self.text.lock().await.put(log.clone(), response.clone());
        Ok(response)
    }

    async fn fetch_structured(
        &self,
        log: &ConversationLog,
        schema: &JsonSchema,
    ) -> Result<Option<serde_json::Value>, LlmError> {
        let key = (
            log.clone(),
            format!("{}:{}", schema.name, schema.schema),
        );
        if let Some(hit) = self.structured.lock().await.get(&key).cloned() {
            debug!("{}: structured cache hit", self.inner.name());
            return Ok(hit);
        }

        info!("{}: structured cache miss, calling vendor", self.inner.name());
        let response = self.inner.fetch_structured(log, schema).await?;
        self.structured.lock().await.put(key, response.clone());
        Ok(response)
    }
}
