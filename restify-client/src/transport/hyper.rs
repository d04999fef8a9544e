//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperHttpClient`], the default [`HttpClient`]
//! implementation using hyper_util's legacy client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH};
use http::{HeaderMap, HeaderValue};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use restify_core::{ContentEncoding, Error, Result};
use rustls::ClientConfig;

use super::connector::build_https_connector;
use super::{HttpClient, HttpRequestMessage, HttpResponseMessage, ResponseBody};
use crate::request::Timeout;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, Full<bytes::Bytes>>;

/// HTTP transport using hyper_util's legacy client.
///
/// Non-blocking sends run on the caller's tokio runtime. Blocking sends run on a
/// private current-thread runtime with its own connection pool, so pooled
/// connections never depend on a runtime that is not being driven.
///
/// The response body is collected before the response is returned; the
/// [`Timeout`] metadata entry bounds the whole exchange.
///
/// # Example
///
/// ```ignore
/// use restify_client::transport::HyperHttpClient;
///
/// let client = HyperHttpClient::builder()
///     .pool_max_idle_per_host(8)
///     .build()?;
///
/// let proxy = RestifyProxy::builder()
///     .endpoint("https://api.example.com")
///     .api(api)
///     .http_client(client)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperHttpClient {
    client: HyperClient,
    blocking: Arc<BlockingClient>,
    /// Whether HTTP/2 only mode is enabled.
    http2_only: bool,
}

struct BlockingClient {
    runtime: Option<tokio::runtime::Runtime>,
    client: HyperClient,
}

impl Drop for BlockingClient {
    fn drop(&mut self) {
        // Dropping a runtime inside another runtime panics; background shutdown does not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for HyperHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperHttpClient")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperHttpClient {
    /// Create a new client builder.
    pub fn builder() -> HyperHttpClientBuilder {
        HyperHttpClientBuilder::new()
    }

    /// Create a new client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Check if this client is configured for HTTP/2 only.
    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }
}

impl HttpClient for HyperHttpClient {
    fn send_async(&self, request: HttpRequestMessage) -> BoxFuture<'static, Result<HttpResponseMessage>> {
        exchange_with_timeout(self.client.clone(), request).boxed()
    }

    fn send(&self, request: HttpRequestMessage) -> Result<HttpResponseMessage> {
        let exchange = exchange_with_timeout(self.blocking.client.clone(), request);
        self.blocking.run(exchange)?
    }

    fn block_on(&self, task: BoxFuture<'static, ()>) -> Result<()> {
        self.blocking.run(task)
    }
}

impl BlockingClient {
    /// Drive `future` on the private runtime, off the caller's runtime if it has one.
    fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| Error::transport("blocking runtime has been shut down"))?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Ok(runtime.block_on(future));
        }

        // A runtime cannot be blocked on from inside another one.
        std::thread::scope(|scope| {
            scope
                .spawn(|| runtime.block_on(future))
                .join()
                .map_err(|_| Error::transport("blocking transport thread panicked"))
        })
    }
}

async fn exchange_with_timeout(
    client: HyperClient,
    message: HttpRequestMessage,
) -> Result<HttpResponseMessage> {
    match message.metadata.get::<Timeout>().map(|t| t.0) {
        Some(timeout) => tokio::time::timeout(timeout, exchange(client, message))
            .await
            .map_err(|elapsed| {
                Error::transport_caused_by(format!("request timed out after {:?}", timeout), elapsed)
            })?,
        None => exchange(client, message).await,
    }
}

async fn exchange(client: HyperClient, message: HttpRequestMessage) -> Result<HttpResponseMessage> {
    let HttpRequestMessage {
        method,
        uri,
        mut headers,
        body,
        metadata,
    } = message;

    if let Some(accept) = ContentEncoding::accept_encoding() {
        if !headers.contains_key(ACCEPT_ENCODING) {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(accept));
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(http.method = %method, url = %uri, "sending request");

    let mut request = http::Request::new(Full::new(body.unwrap_or_default()));
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    *request.extensions_mut() = metadata;

    let response = client
        .request(request)
        .await
        .map_err(|e| Error::transport_caused_by(format!("request failed: {}", e), e))?;

    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| Error::transport_caused_by(format!("failed to read response body: {}", e), e))?
        .to_bytes();

    #[cfg(feature = "tracing")]
    tracing::debug!(status = parts.status.as_u16(), len = bytes.len(), "received response");

    let mut headers = parts.headers;
    let bytes = decode_body(&mut headers, bytes)?;

    Ok(HttpResponseMessage::new(
        parts.status,
        headers,
        ResponseBody::from_bytes(bytes),
    ))
}

/// Undo the response `Content-Encoding`, dropping the headers that no longer apply.
fn decode_body(headers: &mut HeaderMap, bytes: bytes::Bytes) -> Result<bytes::Bytes> {
    let value = headers
        .get(CONTENT_ENCODING)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    let encoding = ContentEncoding::from_header(value.as_deref()).ok_or_else(|| {
        Error::decode(format!(
            "unsupported response Content-Encoding [{}]",
            value.as_deref().unwrap_or_default()
        ))
    })?;

    if encoding.is_identity() {
        return Ok(bytes);
    }

    let decoded = encoding
        .decode(bytes)
        .map_err(|e| Error::decode(format!("failed to decode {} body: {}", encoding.as_str(), e)))?;
    headers.remove(CONTENT_ENCODING);
    headers.remove(CONTENT_LENGTH);
    Ok(decoded)
}

/// Builder for [`HyperHttpClient`].
///
/// # Example
///
/// ```ignore
/// use restify_client::transport::HyperHttpClientBuilder;
/// use std::time::Duration;
///
/// let client = HyperHttpClientBuilder::new()
///     .http2_only(true)
///     .pool_idle_timeout(Duration::from_secs(90))
///     .build()?;
/// ```
pub struct HyperHttpClientBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only (for h2c or when HTTP/2 is required).
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
}

impl Default for HyperHttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperHttpClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Set a custom TLS configuration, e.g. with private root certificates or
    /// client certificates for mTLS.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Enable HTTP/2 only mode (prior knowledge, no HTTP/1.1 upgrade).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Disable the connection pool idle timeout.
    pub fn pool_idle_timeout_none(mut self) -> Self {
        self.pool_idle_timeout = None;
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    fn client(&self, connector: HttpsConnector<HttpConnector>) -> HyperClient {
        let mut builder = Client::builder(TokioExecutor::new());

        // Required for pool_idle_timeout to work
        builder.pool_timer(TokioTimer::new());

        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        if self.http2_only {
            builder.http2_only(true);
        }

        builder.build(connector)
    }

    /// Build the client.
    pub fn build(self) -> Result<HyperHttpClient> {
        let connector = build_https_connector(self.tls_config.clone())?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::transport_caused_by("failed to create blocking runtime", e))?;

        Ok(HyperHttpClient {
            client: self.client(connector.clone()),
            blocking: Arc::new(BlockingClient {
                runtime: Some(runtime),
                client: self.client(connector),
            }),
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperHttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperHttpClientBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}
