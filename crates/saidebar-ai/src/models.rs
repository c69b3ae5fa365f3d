//! Model catalog: the models an endpoint offers, cached per credentials.

use crate::error::Result;
use crate::http::HttpTransport;
use crate::providers::AnthropicClient;
use crate::types::{Endpoint, ModelInfo};
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory cache of `GET /v1/models` results.
///
/// The cache is keyed by endpoint and key, so changing either one
/// implicitly invalidates it. Nothing is persisted.
pub struct ModelCatalog {
    client: AnthropicClient,
    cache: Mutex<Option<(Endpoint, Vec<ModelInfo>)>>,
}

impl ModelCatalog {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            client: AnthropicClient::new(transport),
            cache: Mutex::new(None),
        }
    }

    /// Fetch the model list from the endpoint and replace the cache
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<Vec<ModelInfo>> {
        let models = self.client.list_models(endpoint).await?;
        tracing::debug!("Fetched {} models from {}", models.len(), endpoint.base_url);
        *self.cache.lock() = Some((endpoint.clone(), models.clone()));
        Ok(models)
    }

    /// Cached models for exactly this endpoint and key
    pub fn cached(&self, endpoint: &Endpoint) -> Option<Vec<ModelInfo>> {
        self.cache
            .lock()
            .as_ref()
            .filter(|(key, _)| key == endpoint)
            .map(|(_, models)| models.clone())
    }

    /// Cached models, fetching them first when the cache does not match
    pub async fn models(&self, endpoint: &Endpoint) -> Result<Vec<ModelInfo>> {
        if let Some(models) = self.cached(endpoint) {
            return Ok(models);
        }
        self.fetch(endpoint).await
    }

    /// Drop the cached list
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::{HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        status: u16,
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = br#"{"data":[{"id":"claude-a","display_name":"Claude A"},{"id":"claude-b"}]}"#;
            let chunks: Vec<Result<Vec<u8>>> = vec![Ok(body.to_vec())];
            Ok(HttpResponse {
                status: self.status,
                body: Box::pin(futures::stream::iter(chunks)),
            })
        }
    }

    fn catalog(status: u16) -> (Arc<CountingTransport>, ModelCatalog) {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            status,
        });
        (transport.clone(), ModelCatalog::new(transport))
    }

    #[tokio::test]
    async fn test_models_uses_cache_for_same_credentials() {
        let (transport, catalog) = catalog(200);
        let ep = Endpoint::new("https://api.anthropic.com", "sk-1");

        let first = catalog.models(&ep).await.unwrap();
        let second = catalog.models(&ep).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "claude-a");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changed_key_or_endpoint_misses_cache() {
        let (transport, catalog) = catalog(200);
        let ep = Endpoint::new("https://api.anthropic.com", "sk-1");
        catalog.fetch(&ep).await.unwrap();

        assert!(catalog.cached(&Endpoint::new("https://api.anthropic.com", "sk-2")).is_none());
        assert!(catalog.cached(&Endpoint::new("https://api.z.ai/api/anthropic", "sk-1")).is_none());
        assert!(catalog.cached(&ep).is_some());

        catalog
            .models(&Endpoint::new("https://api.anthropic.com", "sk-2"))
            .await
            .unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_always_hits_network() {
        let (transport, catalog) = catalog(200);
        let ep = Endpoint::new("https://api.anthropic.com", "sk-1");
        catalog.fetch(&ep).await.unwrap();
        catalog.fetch(&ep).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);

        catalog.invalidate();
        assert!(catalog.cached(&ep).is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_untouched() {
        let (_, catalog) = catalog(401);
        let ep = Endpoint::new("https://api.anthropic.com", "sk-bad");
        let err = catalog.fetch(&ep).await.err().unwrap();
        assert!(matches!(err, Error::Api { status: 401, .. }));
        assert!(catalog.cached(&ep).is_none());
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let (transport, catalog) = catalog(200);
        let err = catalog
            .fetch(&Endpoint::new("https://api.anthropic.com", ""))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidApiKey));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
