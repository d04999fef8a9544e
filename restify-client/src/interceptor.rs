//! Request interceptors.
//!
//! Interceptors transform an [`EndpointRequest`] before it is written and sent,
//! e.g. to add authentication headers or request metadata. Synchronous and
//! asynchronous interceptors can be mixed; the [`InterceptorChain`] applies
//! them strictly in registration order.
//!
//! # Example
//!
//! ```ignore
//! use restify_client::{HeaderInterceptor, Interceptor, RestifyProxy};
//!
//! let proxy = RestifyProxy::builder()
//!     .endpoint("http://localhost:3000")
//!     .api(api)
//!     .interceptor(HeaderInterceptor::try_new("authorization", "Bearer token")?)
//!     .interceptor(Interceptor::new(|request| {
//!         tracing::info!(uri = %request.uri(), "sending");
//!         Ok(request)
//!     }))
//!     .build()?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use http::{HeaderName, HeaderValue};
use restify_core::{Error, Result};

use crate::request::EndpointRequest;
use crate::transport::HttpClient;

/// Synchronous request transform.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: EndpointRequest) -> Result<EndpointRequest>;
}

/// Asynchronous request transform.
pub trait AsyncRequestInterceptor: Send + Sync {
    fn intercept(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointRequest>>;
}

#[derive(Clone)]
enum Stage {
    Sync(Arc<dyn RequestInterceptor>),
    Async(Arc<dyn AsyncRequestInterceptor>),
}

/// Ordered list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    stages: Vec<Stage>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<I: RequestInterceptor + 'static>(&mut self, interceptor: I) {
        self.stages.push(Stage::Sync(Arc::new(interceptor)));
    }

    pub fn push_async<I: AsyncRequestInterceptor + 'static>(&mut self, interceptor: I) {
        self.stages.push(Stage::Async(Arc::new(interceptor)));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply every stage, blocking the calling thread.
    ///
    /// Without asynchronous stages everything runs inline. Otherwise the whole
    /// chain is driven by `runner`, so asynchronous stages get the runtime that
    /// backs the transport's blocking sends.
    pub fn apply_blocking(
        &self,
        mut request: EndpointRequest,
        runner: &dyn HttpClient,
    ) -> Result<EndpointRequest> {
        if self.stages.iter().all(|stage| matches!(stage, Stage::Sync(_))) {
            for stage in &self.stages {
                if let Stage::Sync(interceptor) = stage {
                    request = interceptor.intercept(request)?;
                }
            }
            return Ok(request);
        }

        let (tx, rx) = oneshot::channel();
        let applied = self.apply_async(request);
        runner.block_on(
            async move {
                let _ = tx.send(applied.await);
            }
            .boxed(),
        )?;

        match rx.now_or_never() {
            Some(Ok(outcome)) => outcome,
            _ => Err(Error::transport("interceptor chain did not complete")),
        }
    }

    /// Apply every stage, awaiting each before the next.
    pub fn apply_async(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointRequest>> {
        let stages = self.stages.clone();
        async move {
            let mut request = request;
            for stage in stages {
                request = match stage {
                    Stage::Sync(interceptor) => interceptor.intercept(request)?,
                    Stage::Async(interceptor) => interceptor.intercept(request).await?,
                };
            }
            Ok(request)
        }
        .boxed()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("stages", &self.stages.len())
            .finish()
    }
}

// ============================================================================
// Header Interceptor
// ============================================================================

/// Sets a header on every request, replacing previous values.
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderInterceptor {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Parse the header name and value, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::configuration(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::configuration(format!("invalid header value for {}", name)))?;
        Ok(Self { name, value })
    }
}

impl RequestInterceptor for HeaderInterceptor {
    fn intercept(&self, request: EndpointRequest) -> Result<EndpointRequest> {
        Ok(request.with_header(self.name.clone(), self.value.clone()))
    }
}

// ============================================================================
// Closure Interceptors
// ============================================================================

/// Adapts a closure to [`RequestInterceptor`].
pub struct Interceptor<F> {
    intercept: F,
}

impl<F> Interceptor<F>
where
    F: Fn(EndpointRequest) -> Result<EndpointRequest> + Send + Sync,
{
    pub fn new(intercept: F) -> Self {
        Self { intercept }
    }
}

impl<F> RequestInterceptor for Interceptor<F>
where
    F: Fn(EndpointRequest) -> Result<EndpointRequest> + Send + Sync,
{
    fn intercept(&self, request: EndpointRequest) -> Result<EndpointRequest> {
        (self.intercept)(request)
    }
}

impl<F> std::fmt::Debug for Interceptor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor").finish()
    }
}

/// Adapts an async closure to [`AsyncRequestInterceptor`].
pub struct AsyncInterceptor<F> {
    intercept: F,
}

impl<F, Fut> AsyncInterceptor<F>
where
    F: Fn(EndpointRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<EndpointRequest>> + Send + 'static,
{
    pub fn new(intercept: F) -> Self {
        Self { intercept }
    }
}

impl<F, Fut> AsyncRequestInterceptor for AsyncInterceptor<F>
where
    F: Fn(EndpointRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<EndpointRequest>> + Send + 'static,
{
    fn intercept(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointRequest>> {
        (self.intercept)(request).boxed()
    }
}

impl<F> std::fmt::Debug for AsyncInterceptor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncInterceptor").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::StubClient;
    use http::{Method, Uri};
    use restify_core::TypeDescriptor;

    fn request() -> EndpointRequest {
        EndpointRequest::new(
            Method::GET,
            Uri::from_static("http://localhost/"),
            TypeDescriptor::Void,
        )
    }

    fn order_header(request: &EndpointRequest) -> Vec<String> {
        request
            .headers()
            .get_all("x-order")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn appending(tag: &'static str) -> Interceptor<impl Fn(EndpointRequest) -> Result<EndpointRequest> + Send + Sync> {
        Interceptor::new(move |request: EndpointRequest| {
            Ok(request.with_appended_header(
                HeaderName::from_static("x-order"),
                HeaderValue::from_static(tag),
            ))
        })
    }

    #[test]
    fn test_header_interceptor() {
        let interceptor = HeaderInterceptor::try_new("x-custom-header", "test-value").unwrap();
        let request = interceptor.intercept(request()).unwrap();
        assert_eq!(request.headers()["x-custom-header"], "test-value");
    }

    #[test]
    fn test_header_interceptor_rejects_invalid_name() {
        assert!(HeaderInterceptor::try_new("bad header", "v").unwrap_err().is_configuration());
    }

    #[test]
    fn test_sync_and_async_stages_in_order() {
        let mut chain = InterceptorChain::new();
        chain.push(appending("1"));
        chain.push_async(AsyncInterceptor::new(|request: EndpointRequest| async move {
            Ok(request.with_appended_header(
                HeaderName::from_static("x-order"),
                HeaderValue::from_static("2"),
            ))
        }));
        chain.push(appending("3"));

        let request = chain.apply_blocking(request(), &StubClient::ok("text/plain", "")).unwrap();
        assert_eq!(order_header(&request), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_async_apply_preserves_order() {
        let mut chain = InterceptorChain::new();
        chain.push_async(AsyncInterceptor::new(|request: EndpointRequest| async move {
            tokio::task::yield_now().await;
            Ok(request.with_appended_header(
                HeaderName::from_static("x-order"),
                HeaderValue::from_static("slow"),
            ))
        }));
        chain.push(appending("fast"));

        let request = chain.apply_async(request()).await.unwrap();
        assert_eq!(order_header(&request), vec!["slow", "fast"]);
    }

    #[test]
    fn test_failing_stage_stops_the_chain() {
        let mut chain = InterceptorChain::new();
        chain.push(Interceptor::new(|_request: EndpointRequest| {
            Err(Error::resolution("denied"))
        }));
        chain.push(appending("never"));

        assert!(chain.apply_blocking(request(), &StubClient::ok("text/plain", "")).unwrap_err().is_resolution());
    }
}
