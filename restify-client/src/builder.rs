//! Proxy builder.
//!
//! Provides a fluent API for configuring and building a [`RestifyProxy`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use restify_core::{
    ApiDeclaration, ContractReader, DefaultContractReader, EndpointTarget, Error, ErrorKind,
    MessageConverter, MessageConverters, Result,
};
use tokio::runtime::Handle;

use crate::executor::{
    DefaultEndpointRequestExecutor, EndpointRequestExecutor, InterceptingExecutor, RecoveringExecutor,
};
use crate::handler::{CallHandlerResolver, EndpointCallHandlerAdapter};
use crate::interceptor::{AsyncRequestInterceptor, InterceptorChain, RequestInterceptor};
use crate::proxy::{ProxyMethod, RestifyProxy};
use crate::request::RequestWriter;
use crate::response::{EndpointResponse, RecoveryHook, RecoveryHooks, ResponseReader};
use crate::transport::{HttpClient, HyperHttpClient};

/// Builder for creating a [`RestifyProxy`].
///
/// Every declared method is read and its handler chain resolved in
/// [`build`](Self::build), so contract errors surface there and never at
/// invocation time.
///
/// # Example
///
/// ```ignore
/// use restify_client::{HeaderInterceptor, RestifyProxy};
/// use restify_core::ErrorKind;
/// use std::time::Duration;
///
/// let proxy = RestifyProxy::builder()
///     .endpoint("http://localhost:3000")
///     .api(api)
///     .interceptor(HeaderInterceptor::try_new("authorization", "Bearer token")?)
///     .default_timeout(Duration::from_secs(30))
///     .recover_kind(ErrorKind::Transport, |_| fallback())
///     .build()?;
/// ```
pub struct RestifyProxyBuilder {
    /// Base URL prefixed to every method path.
    endpoint: Option<String>,
    /// The declaration being proxied.
    api: Option<ApiDeclaration>,
    /// Base converter registry; defaults to text, JSON and form converters.
    converters: Option<MessageConverters>,
    /// Converters registered ahead of the base registry.
    extra_converters: Vec<Arc<dyn MessageConverter>>,
    interceptors: InterceptorChain,
    adapters: Vec<Arc<dyn EndpointCallHandlerAdapter>>,
    /// Transport; defaults to [`HyperHttpClient`].
    http_client: Option<Arc<dyn HttpClient>>,
    hooks: RecoveryHooks,
    /// Default timeout for every call.
    default_timeout: Option<Duration>,
    /// Headers sent with every call unless the method declares them.
    default_headers: HeaderMap,
    contract_reader: Option<Arc<dyn ContractReader>>,
    /// Runtime for callback-shaped calls.
    runtime: Option<Handle>,
}

impl std::fmt::Debug for RestifyProxyBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestifyProxyBuilder")
            .field("endpoint", &self.endpoint)
            .field("api", &self.api.as_ref().map(ApiDeclaration::name))
            .field("converters", &self.converters)
            .field("extra_converters", &self.extra_converters.len())
            .field("interceptors", &self.interceptors.len())
            .field("adapters", &self.adapters.len())
            .field("http_client", &self.http_client.is_some())
            .field("hooks", &self.hooks.len())
            .field("default_timeout", &self.default_timeout)
            .field("default_headers", &self.default_headers)
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

impl Default for RestifyProxyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RestifyProxyBuilder {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            api: None,
            converters: None,
            extra_converters: Vec::new(),
            interceptors: InterceptorChain::new(),
            adapters: Vec::new(),
            http_client: None,
            hooks: RecoveryHooks::new(),
            default_timeout: None,
            default_headers: HeaderMap::new(),
            contract_reader: None,
            runtime: None,
        }
    }

    /// Set the base URL, e.g. `http://localhost:3000`.
    ///
    /// A trailing slash is ignored. Without an endpoint, method paths must be
    /// absolute URIs.
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the API declaration to proxy.
    pub fn api(mut self, api: ApiDeclaration) -> Self {
        self.api = Some(api);
        self
    }

    /// Replace the base converter registry.
    pub fn converters(mut self, converters: MessageConverters) -> Self {
        self.converters = Some(converters);
        self
    }

    /// Register a converter ahead of the base registry.
    ///
    /// Converters added this way are consulted first, in the order added.
    pub fn converter<C: MessageConverter + 'static>(mut self, converter: C) -> Self {
        self.extra_converters.push(Arc::new(converter));
        self
    }

    /// Add a synchronous interceptor. Interceptors run in the order added.
    pub fn interceptor<I: RequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Add an asynchronous interceptor. Interceptors run in the order added.
    pub fn async_interceptor<I: AsyncRequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push_async(interceptor);
        self
    }

    /// Add a return-shape adapter, tried before the built-in ones.
    pub fn handler_adapter<A: EndpointCallHandlerAdapter + 'static>(mut self, adapter: A) -> Self {
        self.adapters.push(Arc::new(adapter));
        self
    }

    /// Use a custom transport instead of [`HyperHttpClient`].
    pub fn http_client<C: HttpClient + 'static>(mut self, client: C) -> Self {
        self.http_client = Some(Arc::new(client));
        self
    }

    /// Add a recovery hook. The first hook matching a failure wins.
    pub fn recovery_hook(mut self, hook: RecoveryHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Recover every failure.
    pub fn recover<F>(self, recover: F) -> Self
    where
        F: Fn(&Error) -> EndpointResponse + Send + Sync + 'static,
    {
        self.recovery_hook(RecoveryHook::always(recover))
    }

    /// Recover failures matching `predicate`.
    pub fn recover_if<P, F>(self, predicate: P, recover: F) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
        F: Fn(&Error) -> EndpointResponse + Send + Sync + 'static,
    {
        self.recovery_hook(RecoveryHook::when(predicate, recover))
    }

    /// Recover failures of one kind.
    pub fn recover_kind<F>(self, kind: ErrorKind, recover: F) -> Self
    where
        F: Fn(&Error) -> EndpointResponse + Send + Sync + 'static,
    {
        self.recovery_hook(RecoveryHook::on_kind(kind, recover))
    }

    /// Set the default timeout for every call.
    ///
    /// Individual calls can override it with [`CallOptions::timeout`].
    ///
    /// [`CallOptions::timeout`]: crate::CallOptions::timeout
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Add a header sent with every call unless the method already declares it.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.append(name, value);
        self
    }

    /// Use a custom contract reader.
    pub fn contract_reader<R: ContractReader + 'static>(mut self, reader: R) -> Self {
        self.contract_reader = Some(Arc::new(reader));
        self
    }

    /// Run callback-shaped calls on this runtime instead of the one current at
    /// invocation time.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the proxy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API was set, a method contract or
    /// handler chain is invalid, two methods share a name, or the default
    /// transport cannot be created.
    pub fn build(self) -> Result<RestifyProxy> {
        let api = self
            .api
            .ok_or_else(|| Error::configuration("an API declaration is required"))?;
        let target = match self.endpoint {
            Some(endpoint) => EndpointTarget::new(endpoint, api),
            None => EndpointTarget::without_endpoint(api),
        };

        let mut converters = MessageConverters::new();
        for converter in self.extra_converters {
            converters.register(converter);
        }
        for converter in self.converters.unwrap_or_else(MessageConverters::defaults).iter() {
            converters.register(converter.clone());
        }
        let converters = Arc::new(converters);

        let http_client = match self.http_client {
            Some(client) => client,
            None => Arc::new(HyperHttpClient::new()?),
        };

        let mut executor: Arc<dyn EndpointRequestExecutor> = Arc::new(DefaultEndpointRequestExecutor::new(
            RequestWriter::new(converters.clone()),
            http_client.clone(),
            ResponseReader::new(converters),
        ));
        if !self.interceptors.is_empty() {
            executor = Arc::new(InterceptingExecutor::new(self.interceptors, http_client, executor));
        }
        if !self.hooks.is_empty() {
            executor = Arc::new(RecoveringExecutor::new(self.hooks, executor));
        }

        let reader = self
            .contract_reader
            .unwrap_or_else(|| Arc::new(DefaultContractReader));
        let resolver = CallHandlerResolver::new(self.adapters, self.runtime);

        let mut methods = HashMap::new();
        for declaration in target.api().methods() {
            let method = reader.read(&target, declaration)?;
            let handler = resolver.resolve(&method)?;
            let name = method.name().to_string();
            let entry = ProxyMethod {
                method: Arc::new(method),
                handler,
            };
            if methods.insert(name.clone(), entry).is_some() {
                return Err(Error::configuration(format!(
                    "API [{}] declares method [{}] more than once",
                    target.api().name(),
                    name
                )));
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            api = target.api().name(),
            endpoint = target.endpoint().unwrap_or_default(),
            methods = methods.len(),
            "built restify proxy"
        );

        Ok(RestifyProxy::new(
            methods,
            executor,
            self.default_timeout,
            self.default_headers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Argument;
    use crate::executor::tests::StubClient;
    use restify_core::{MethodDeclaration, TypeDescriptor};
    use serde_json::{Value, json};
    use std::io::{Read, Write};

    fn api() -> ApiDeclaration {
        ApiDeclaration::new("Greetings")
            .method(MethodDeclaration::get("greet", "/greeting").returns("String"))
    }

    #[test]
    fn test_builder_requires_api() {
        let err = RestifyProxyBuilder::new()
            .http_client(StubClient::ok("text/plain", ""))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_duplicate_method_names() {
        let api = api().method(MethodDeclaration::post("greet", "/greeting"));
        let err = RestifyProxy::builder()
            .api(api)
            .http_client(StubClient::ok("text/plain", ""))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message().contains("greet"));
    }

    #[test]
    fn test_invalid_contract_fails_build() {
        let api = ApiDeclaration::new("Broken").method(MethodDeclaration::get("find", "/users/{id}"));
        let err = RestifyProxy::builder()
            .api(api)
            .http_client(StubClient::ok("text/plain", ""))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    struct Shouting;

    impl MessageConverter for Shouting {
        fn content_type(&self) -> &str {
            "text/plain"
        }

        fn can_read(&self, _expected: &TypeDescriptor) -> bool {
            true
        }

        fn read(&self, _expected: &TypeDescriptor, source: &mut dyn Read) -> Result<Value> {
            let mut text = String::new();
            source
                .read_to_string(&mut text)
                .map_err(|e| Error::decode(e.to_string()))?;
            Ok(json!(text.to_uppercase()))
        }

        fn write(&self, _value: &Value, _sink: &mut dyn Write) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_extra_converter_wins_over_defaults() {
        let proxy = RestifyProxy::builder()
            .endpoint("http://localhost")
            .api(api())
            .converter(Shouting)
            .http_client(StubClient::ok("text/plain", "hello"))
            .build()
            .unwrap();

        let greeting: String = proxy.invoke("greet", ()).unwrap().into_value().unwrap();
        assert_eq!(greeting, "HELLO");
    }

    #[test]
    fn test_builder_recovery_hook() {
        let proxy = RestifyProxy::builder()
            .endpoint("http://localhost")
            .api(api())
            .http_client(StubClient::refusing())
            .recover_kind(ErrorKind::Transport, |_| {
                EndpointResponse::success(http::StatusCode::OK, HeaderMap::new(), Some(json!("offline")))
            })
            .build()
            .unwrap();

        let greeting: String = proxy.invoke("greet", Vec::<Argument>::new()).unwrap().into_value().unwrap();
        assert_eq!(greeting, "offline");
    }
}
