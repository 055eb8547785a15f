use crate::error::Result;
use crate::models::cache::CacheStore;
use crate::models::lead::Envelope;
use crate::web::client_ip::FORWARDED_CLIENT_IP;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a successful response's `data` should be cached.
#[derive(Debug, Clone, Copy)]
pub struct CacheWrite<'a> {
    pub key: &'a str,
    pub ttl: Option<Duration>,
}

pub struct UpstreamClient {
    client: Client,
    base_url: String,
    token: String,
    cache: Arc<dyn CacheStore>,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            cache,
        }
    }

    /// Authenticated GET of `base_url + path`.
    ///
    /// The token goes out verbatim in `Authorization` and `client_ip` in
    /// `Forwarded-Client-IP`. When `cache_write` is given and the envelope reports
    /// `code == 200`, its `data` is stored as JSON text. The envelope is returned
    /// whatever its code.
    pub async fn get_authenticated(
        &self,
        path: &str,
        client_ip: &str,
        cache_write: Option<CacheWrite<'_>>,
    ) -> Result<Envelope> {
        let url = format!("{}{}", self.base_url, path);

        debug!("Sending request to {} for client {}", url, client_ip);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.token)
            .header(FORWARDED_CLIENT_IP, client_ip)
            .send()
            .await?;

        let status = response.status();
        let envelope: Envelope = response.json().await?;
        debug!("Upstream answered {} with code {}", status, envelope.code);

        if let Some(CacheWrite { key, ttl }) = cache_write {
            if envelope.is_success() {
                let json_data = serde_json::to_string(&envelope.data)?;
                self.cache.set(key, json_data, ttl).await?;
                debug!("Cached response data under {:?} for {:?}", key, ttl);
            } else {
                warn!("Not caching {} response with code {}", url, envelope.code);
            }
        }

        Ok(envelope)
    }
}
