use crate::api::upstream::{CacheWrite, UpstreamClient};
use crate::config::{LEADS_KEY, LEADS_TTL, STREAMER_PATH};
use crate::error::{GatewayError, Result};
use crate::models::cache::CacheStore;
use crate::models::lead::{Envelope, Lead};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read-through access to the leads collection.
pub struct LeadsService {
    api: UpstreamClient,
    cache: Arc<dyn CacheStore>,
    key: String,
    ttl: Duration,
}

impl LeadsService {
    pub fn new(api: UpstreamClient, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            api,
            cache,
            key: LEADS_KEY.to_string(),
            ttl: LEADS_TTL,
        }
    }

    fn cache_write(&self) -> CacheWrite<'_> {
        CacheWrite {
            key: &self.key,
            ttl: Some(self.ttl),
        }
    }

    /// Returns the cached collection untouched, or fetches and caches it on a miss.
    ///
    /// An unreadable cache counts as a miss. A rejected upstream response is
    /// reported as [`GatewayError::UpstreamRejected`].
    pub async fn get_leads(&self, client_ip: &str) -> Result<Vec<Lead>> {
        match self.cache.get(&self.key).await {
            Ok(Some(cached)) => {
                debug!("Cache hit for {}", self.key);
                return Ok(serde_json::from_str(&cached)?);
            }
            Ok(None) => debug!("Cache miss for {}", self.key),
            Err(e) => warn!("Cache read for {} failed, fetching upstream: {}", self.key, e),
        }

        let envelope = self
            .api
            .get_authenticated(STREAMER_PATH, client_ip, Some(self.cache_write()))
            .await?;

        if !envelope.is_success() {
            return Err(GatewayError::UpstreamRejected { code: envelope.code });
        }

        let leads: Vec<Lead> = serde_json::from_value(envelope.data)?;
        info!("Fetched {} leads from upstream", leads.len());
        Ok(leads)
    }

    /// Forces an upstream fetch that overwrites the cache on success.
    pub async fn refresh(&self, client_ip: &str) -> Result<Envelope> {
        self.api
            .get_authenticated(STREAMER_PATH, client_ip, Some(self.cache_write()))
            .await
    }
}
