//! Proxy dispatch table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use restify_core::{EndpointMethod, Error, Result};

use crate::argument::Arguments;
use crate::builder::RestifyProxyBuilder;
use crate::call::EndpointCall;
use crate::executor::EndpointRequestExecutor;
use crate::handler::{CallHandler, Returned};
use crate::options::CallOptions;
use crate::request::{EndpointRequest, EndpointRequestFactory};

/// A contract method with its resolved handler chain.
#[derive(Clone)]
pub(crate) struct ProxyMethod {
    pub(crate) method: Arc<EndpointMethod>,
    pub(crate) handler: Arc<dyn CallHandler>,
}

/// Declarative HTTP client for one API declaration.
///
/// The proxy maps each declared method name to its contract and handler chain,
/// both built once by [`RestifyProxyBuilder`]. Invoking a method builds the
/// request from the arguments, hands it to the handler chain and returns the
/// result in the declared shape.
///
/// # Example
///
/// ```ignore
/// use restify_client::{Argument, RestifyProxy};
/// use restify_core::{ApiDeclaration, MethodDeclaration, ParameterDeclaration};
///
/// let api = ApiDeclaration::new("Users").path("/users").method(
///     MethodDeclaration::get("find", "/{id}")
///         .param(ParameterDeclaration::new("id", "u64").path())
///         .returns("Optional<User>"),
/// );
///
/// let proxy = RestifyProxy::builder()
///     .endpoint("http://localhost:3000")
///     .api(api)
///     .build()?;
///
/// let user: Option<User> = proxy.invoke("find", vec![Argument::from(42)])?.into_optional()?;
/// ```
#[derive(Clone)]
pub struct RestifyProxy {
    methods: Arc<HashMap<String, ProxyMethod>>,
    executor: Arc<dyn EndpointRequestExecutor>,
    factory: EndpointRequestFactory,
    default_timeout: Option<Duration>,
    default_headers: HeaderMap,
}

impl RestifyProxy {
    /// Create a new proxy builder.
    pub fn builder() -> RestifyProxyBuilder {
        RestifyProxyBuilder::new()
    }

    pub(crate) fn new(
        methods: HashMap<String, ProxyMethod>,
        executor: Arc<dyn EndpointRequestExecutor>,
        default_timeout: Option<Duration>,
        default_headers: HeaderMap,
    ) -> Self {
        Self {
            methods: Arc::new(methods),
            executor,
            factory: EndpointRequestFactory,
            default_timeout,
            default_headers,
        }
    }

    /// The contract of a declared method.
    pub fn method(&self, name: &str) -> Option<&EndpointMethod> {
        self.methods.get(name).map(|entry| entry.method.as_ref())
    }

    /// The resolved handler chain of a declared method.
    pub fn handler(&self, name: &str) -> Option<&dyn CallHandler> {
        self.methods.get(name).map(|entry| entry.handler.as_ref())
    }

    /// Names of the declared methods, in no particular order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Invoke a declared method with the proxy defaults.
    pub fn invoke<A: Into<Arguments>>(&self, name: &str, args: A) -> Result<Returned> {
        self.invoke_with_options(name, args, CallOptions::default())
    }

    /// Invoke a declared method.
    ///
    /// An unknown method name or an argument count that does not match the
    /// declared parameters is a resolution error. Other failures surface the
    /// way the declared shape dictates: asynchronous shapes fail their future,
    /// stream or callback instead of this call.
    pub fn invoke_with_options<A: Into<Arguments>>(
        &self,
        name: &str,
        args: A,
        options: CallOptions,
    ) -> Result<Returned> {
        let entry = self
            .methods
            .get(name)
            .ok_or_else(|| Error::resolution(format!("no method named [{}] is declared", name)))?;

        let args = args.into();
        let expected = entry.method.parameters().len();
        if args.len() != expected {
            return Err(Error::resolution(format!(
                "method [{}] takes {} arguments, {} given",
                name,
                expected,
                args.len()
            )));
        }

        let call = match self.request(entry, &args, options) {
            Ok(request) => EndpointCall::new(self.executor.clone(), request),
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(method = name, "request could not be built: {}", error);
                EndpointCall::failed(error)
            }
        };

        #[cfg(feature = "tracing")]
        let call = call.instrument(tracing::debug_span!(
            "restify.call",
            http.method = %entry.method.method(),
            url.path = entry.method.path(),
            restify.method = name,
            otel.kind = "client",
        ));

        entry.handler.handle(call, &args)
    }

    fn request(&self, entry: &ProxyMethod, args: &Arguments, options: CallOptions) -> Result<EndpointRequest> {
        let request = self
            .factory
            .create(&entry.method, args, entry.handler.response_type().clone())?;

        let mut headers = request.headers().clone();
        for name in self.default_headers.keys() {
            if !headers.contains_key(name) {
                for value in self.default_headers.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        let request = request.with_headers(headers);
        Ok(match options.timeout.or(self.default_timeout) {
            Some(timeout) => request.with_timeout(timeout),
            None => request,
        })
    }
}

impl std::fmt::Debug for RestifyProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.method_names().collect();
        names.sort_unstable();
        f.debug_struct("RestifyProxy")
            .field("methods", &names)
            .field("default_timeout", &self.default_timeout)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Argument;
    use crate::executor::tests::StubClient;
    use http::{HeaderName, HeaderValue};
    use restify_core::{ApiDeclaration, MethodDeclaration, ParameterDeclaration};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    fn api() -> ApiDeclaration {
        ApiDeclaration::new("Users")
            .path("/users/")
            .header("accept", "application/json")
            .method(
                MethodDeclaration::get("find", "{id}")
                    .param(ParameterDeclaration::new("id", "u64").path())
                    .returns("Optional<User>"),
            )
            .method(
                MethodDeclaration::get("findAsync", "{id}")
                    .param(ParameterDeclaration::new("id", "u64").path())
                    .returns("Future<User>"),
            )
    }

    fn proxy(client: Arc<StubClient>) -> RestifyProxy {
        RestifyProxy::builder()
            .endpoint("http://localhost:3000")
            .api(api())
            .http_client(client)
            .default_timeout(Duration::from_secs(5))
            .default_header(
                HeaderName::from_static("x-client"),
                HeaderValue::from_static("restify"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_invoke_builds_request_and_decodes() {
        let client = Arc::new(StubClient::ok("application/json", r#"{"id":42,"name":"Ann"}"#));
        let proxy = proxy(client.clone());

        let user: Option<User> = proxy
            .invoke("find", vec![Argument::from(42)])
            .unwrap()
            .into_optional()
            .unwrap();
        assert_eq!(
            user,
            Some(User {
                id: 42,
                name: "Ann".into()
            })
        );

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].uri.to_string(), "http://localhost:3000/users/42");
        assert_eq!(seen[0].headers["accept"], "application/json");
        assert_eq!(seen[0].headers["x-client"], "restify");
        assert_eq!(
            seen[0].metadata.get::<crate::request::Timeout>().map(|t| t.0),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_options_override_defaults() {
        let client = Arc::new(StubClient::ok("application/json", "null"));
        let options = CallOptions::new()
            .timeout(Duration::from_millis(10))
            .try_header("x-client", "override")
            .unwrap();

        proxy(client.clone())
            .invoke_with_options("find", vec![Argument::from(1)], options)
            .unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].headers["x-client"], "override");
        assert_eq!(
            seen[0].metadata.get::<crate::request::Timeout>().map(|t| t.0),
            Some(Duration::from_millis(10))
        );
    }

    #[test]
    fn test_unknown_method_and_arity() {
        let proxy = proxy(Arc::new(StubClient::ok("text/plain", "")));
        assert!(proxy.invoke("missing", ()).unwrap_err().is_resolution());
        assert!(proxy.invoke("find", ()).unwrap_err().is_resolution());
    }

    #[test]
    fn test_missing_path_argument_fails_sync_call() {
        let client = Arc::new(StubClient::ok("text/plain", ""));
        let err = proxy(client.clone())
            .invoke("find", vec![Argument::Null])
            .unwrap_err();
        assert!(err.is_resolution());
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_path_argument_fails_future() {
        let returned = proxy(Arc::new(StubClient::ok("text/plain", "")))
            .invoke("findAsync", vec![Argument::Null])
            .unwrap();
        let err = returned.into_future().unwrap().await.unwrap_err();
        assert!(err.is_resolution());
    }

    #[test]
    fn test_introspection() {
        let proxy = proxy(Arc::new(StubClient::ok("text/plain", "")));
        assert_eq!(proxy.method("find").unwrap().path(), "http://localhost:3000/users/{id}");
        assert_eq!(
            proxy.handler("findAsync").unwrap().response_type(),
            &restify_core::TypeDescriptor::named("User")
        );
        assert_eq!(proxy.method_names().count(), 2);
    }
}
