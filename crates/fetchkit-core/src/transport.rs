//! Terminal transport boundary
//!
//! The interceptor chain ends in a [`Transport`]: the one step that
//! actually performs network I/O (or serves from cache). Sockets, TLS,
//! redirects, and connection pooling all belong to the engine behind the
//! trait, not to this crate.
//!
//! - [`ReqwestTransport`]: production implementation backed by `reqwest`
//! - [`CachingTransport`]: decorator that consults and populates a
//!   [`CacheStore`] around any inner transport

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::cache::{CacheEntry, CacheStore};
use crate::error::Error;
use crate::types::{Method, Request, Response};
use crate::Result;

/// The terminal call at the end of an interceptor chain
///
/// Implementations may raise [`Error::Network`] or [`Error::Timeout`];
/// they never classify HTTP status codes; that is interceptor territory.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response>;
}

/// Production transport backed by a `reqwest` client
///
/// Connect/read timeouts are owned by the engine, configured once at
/// construction time.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build an engine with the given overall request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration {
                message: format!("failed to build HTTP engine: {}", e),
                source: Some(anyhow::Error::new(e)),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        let url = Url::parse(request.url()).map_err(|e| Error::Configuration {
            message: format!("invalid request URL {}: {}", request.url(), e),
            source: Some(anyhow::Error::new(e)),
        })?;

        let mut builder = self.client.request(to_engine_method(request.method()), url);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if !request.query().is_empty() {
            let pairs: Vec<(&String, &String)> = request.query().iter().collect();
            builder = builder.query(&pairs);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await.map_err(map_engine_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let text = response.text().await.map_err(map_engine_error)?;

        let mut out = Response::new(final_url, status);
        for (name, value) in headers {
            out = out.with_header(name, value);
        }
        if !text.is_empty() {
            out = out.with_body(text);
        }
        Ok(out)
    }
}

/// Map an engine-level failure to the crate taxonomy
fn map_engine_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout {
            message: error.to_string(),
        }
    } else {
        Error::Network {
            message: error.to_string(),
            source: Some(anyhow::Error::new(error)),
        }
    }
}

fn to_engine_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Head => reqwest::Method::HEAD,
    }
}

/// Cache-aside decorator over an inner transport
///
/// GET requests consult the store first; a hit short-circuits the inner
/// transport entirely. Successful (2xx) responses are snapshotted back into
/// the store. Non-GET requests bypass the cache in both directions.
///
/// A failure to *write* an entry is logged and swallowed: losing a cache
/// entry must not fail a request that the network already answered. The
/// public [`CacheStore`] API keeps its typed errors; only this decorator
/// downgrades them.
pub struct CachingTransport {
    inner: Arc<dyn Transport>,
    store: Arc<CacheStore>,
    vary_headers: Vec<String>,
}

impl CachingTransport {
    pub fn new(inner: Arc<dyn Transport>, store: Arc<CacheStore>, vary_headers: Vec<String>) -> Self {
        Self {
            inner,
            store,
            vary_headers,
        }
    }

    /// Project the configured vary headers out of a request
    fn vary_keys(&self, request: &Request) -> HashMap<String, String> {
        self.vary_headers
            .iter()
            .filter_map(|name| {
                request
                    .header(name)
                    .map(|value| (name.clone(), value.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Transport for CachingTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        if request.method() != Method::Get {
            return self.inner.call(request).await;
        }

        let vary_keys = self.vary_keys(&request);
        if let Some(entry) = self.store.find(request.url(), &vary_keys).await {
            tracing::debug!(url = %request.url(), "serving response from cache");
            return Ok(entry.to_response());
        }

        let response = self.inner.call(request.clone()).await?;
        if response.is_successful() {
            let entry = CacheEntry::from_response(request.url(), &response, vary_keys);
            if let Err(e) = self.store.store(request.url(), &entry).await {
                tracing::warn!(url = %request.url(), error = %e, "failed to store response in cache");
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        status: u16,
    }

    impl CountingTransport {
        fn new(status: u16) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status,
            }
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn call(&self, request: Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(request.url(), self.status).with_body("payload"))
        }
    }

    fn caching(
        inner: Arc<CountingTransport>,
        dir: &std::path::Path,
        vary_headers: Vec<String>,
    ) -> CachingTransport {
        let store = Arc::new(CacheStore::new(CacheConfig::new(dir)));
        CachingTransport::new(inner, store, vary_headers)
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_inner_transport() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingTransport::new(200));
        let transport = caching(inner.clone(), dir.path(), vec![]);

        let request = Request::get("https://api.example.com/items");
        let first = transport.call(request.clone()).await.unwrap();
        let second = transport.call(request).await.unwrap();

        assert_eq!(first.body(), second.body());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_get_requests_bypass_cache() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingTransport::new(200));
        let transport = caching(inner.clone(), dir.path(), vec![]);

        let request = Request::post("https://api.example.com/items");
        transport.call(request.clone()).await.unwrap();
        transport.call(request).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsuccessful_responses_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingTransport::new(500));
        let transport = caching(inner.clone(), dir.path(), vec![]);

        let request = Request::get("https://api.example.com/items");
        transport.call(request.clone()).await.unwrap();
        transport.call(request).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_vary_header_mismatch_misses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingTransport::new(200));
        let transport = caching(inner.clone(), dir.path(), vec!["Accept".to_string()]);

        let json = Request::get("https://api.example.com/items").with_header("Accept", "application/json");
        let text = Request::get("https://api.example.com/items").with_header("Accept", "text/plain");

        transport.call(json).await.unwrap();
        transport.call(text).await.unwrap();

        // Different vary keys never share an entry
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
