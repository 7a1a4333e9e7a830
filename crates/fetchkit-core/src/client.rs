//! Client composition root
//!
//! A [`Client`] owns the ordered interceptor list and the terminal
//! transport, builds a fresh [`Chain`] for every `execute` call, and wires
//! the optional response cache around the transport.
//!
//! Clients are immutable values: [`Client::with_interceptors`] returns a
//! new client sharing structure with the original, so a base client can be
//! reused concurrently across many customized derivatives.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use url::Url;

use crate::cache::{CacheConfig, CacheStore};
use crate::error::Error;
use crate::interceptor::{Chain, Interceptor, LoggingInterceptor, StatusValidationInterceptor};
use crate::transport::{CachingTransport, ReqwestTransport, Transport};
use crate::types::{Request, Response};
use crate::Result;

/// Configuration for a [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL that relative request URLs are resolved against
    pub base_url: Option<String>,
    /// Overall request timeout handed to the transport engine
    pub timeout: Duration,
    /// Install the [`LoggingInterceptor`] at the head of the chain
    pub request_logging: bool,
    /// Install the [`StatusValidationInterceptor`] so 4xx/5xx responses
    /// surface as typed errors
    pub validate_status: bool,
    /// Response cache settings; `None` disables caching entirely
    pub cache: Option<CacheConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            request_logging: false,
            validate_status: true,
            cache: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_logging(mut self, request_logging: bool) -> Self {
        self.request_logging = request_logging;
        self
    }

    pub fn with_status_validation(mut self, validate_status: bool) -> Self {
        self.validate_status = validate_status;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// HTTP client built from an interceptor chain and a terminal transport
///
/// Interceptor ordering matters: earlier interceptors wrap later ones, so
/// they mutate the request first and observe the response last. Appended
/// interceptors run closest to the terminal call. For the standard stack
/// that means appending, in order, [`TokenRefreshInterceptor`] then
/// [`AuthInterceptor`]: classification (installed by the config) wraps
/// refresh so recovery still sees raw 401 responses, and auth sits inside
/// refresh so a retried request re-enters auth and picks up the renewed
/// credential.
///
/// [`TokenRefreshInterceptor`]: crate::interceptor::TokenRefreshInterceptor
/// [`AuthInterceptor`]: crate::interceptor::AuthInterceptor
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client backed by the production `reqwest` engine
    pub fn new(config: ClientConfig) -> Result<Self> {
        let engine = Arc::new(ReqwestTransport::new(config.timeout)?);
        Ok(Self::with_transport(config, engine))
    }

    /// Create a client over a caller-supplied transport
    ///
    /// The seam for tests and for embedding alternative engines. The cache
    /// decorator and config-driven interceptors are applied here exactly
    /// as in [`Client::new`].
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let transport: Arc<dyn Transport> = match &config.cache {
            Some(cache_config) => {
                let store = Arc::new(CacheStore::new(cache_config.clone()));
                let vary_headers = cache_config.vary_headers.clone();
                Arc::new(CachingTransport::new(transport, store, vary_headers))
            }
            None => transport,
        };

        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();
        if config.request_logging {
            interceptors.push(Arc::new(LoggingInterceptor));
        }
        if config.validate_status {
            interceptors.push(Arc::new(StatusValidationInterceptor));
        }

        Self {
            config,
            interceptors: interceptors.into(),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return a new client with `additional` appended to the interceptor list
    ///
    /// The original client is untouched and keeps its behavior; both share
    /// the transport and existing interceptors structurally.
    pub fn with_interceptors(&self, additional: Vec<Arc<dyn Interceptor>>) -> Self {
        let mut combined: Vec<Arc<dyn Interceptor>> = self.interceptors.to_vec();
        combined.extend(additional);
        Self {
            config: self.config.clone(),
            interceptors: combined.into(),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Run a request through the interceptor chain and terminal transport
    ///
    /// Builds a fresh chain per call; concurrent executes on the same
    /// client never share a cursor.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let request = self.resolve_url(request)?;
        let chain = Chain::new(
            request.clone(),
            Arc::clone(&self.interceptors),
            Arc::clone(&self.transport),
        );
        chain.proceed(request).await
    }

    /// Resolve a relative request URL against the configured base URL
    fn resolve_url(&self, request: Request) -> Result<Request> {
        match Url::parse(request.url()) {
            Ok(_) => Ok(request),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.config.base_url.as_deref().ok_or_else(|| {
                    Error::Configuration {
                        message: format!(
                            "relative request URL {} with no base_url configured",
                            request.url()
                        ),
                        source: None,
                    }
                })?;
                let base = Url::parse(base).map_err(|e| Error::Configuration {
                    message: format!("invalid base URL {}: {}", base, e),
                    source: Some(anyhow::Error::new(e)),
                })?;
                let joined = base.join(request.url()).map_err(|e| Error::Configuration {
                    message: format!("failed to join {} to base URL: {}", request.url(), e),
                    source: Some(anyhow::Error::new(e)),
                })?;
                let joined = joined.to_string();
                Ok(request.with_url(joined))
            }
            Err(e) => Err(Error::Configuration {
                message: format!("invalid request URL {}: {}", request.url(), e),
                source: Some(anyhow::Error::new(e)),
            }),
        }
    }
}

static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();

/// Install a process-wide default client
///
/// Single-assignment: the first call wins, every later call is rejected
/// with a configuration error. A convenience registry only; nothing in
/// this crate requires it.
pub fn set_default_client(client: Client) -> Result<()> {
    DEFAULT_CLIENT
        .set(client)
        .map_err(|_| Error::Configuration {
            message: "default client is already set".to_string(),
            source: None,
        })
}

/// The process-wide default client, if one was installed
pub fn default_client() -> Option<&'static Client> {
    DEFAULT_CLIENT.get()
}
