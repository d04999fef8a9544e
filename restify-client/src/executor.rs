//! Request executors.
//!
//! An [`EndpointRequestExecutor`] sends an [`EndpointRequest`] and reads the
//! response. Executors are layered:
//!
//! - [`DefaultEndpointRequestExecutor`]: writes the body, sends it through the
//!   [`HttpClient`] and reads the response
//! - [`InterceptingExecutor`]: runs the interceptor chain first
//! - [`RecoveringExecutor`]: applies recovery hooks to failed responses
//!
//! Local mechanical failures (no writer for the body, an interceptor error) are
//! returned as `Err`. Anything that goes wrong once the request is on the wire
//! is an [`EndpointResponse::Failure`].

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use restify_core::Result;

use crate::interceptor::InterceptorChain;
use crate::request::{EndpointRequest, RequestWriter};
use crate::response::{EndpointResponse, RecoveryHooks, ResponseReader};
use crate::transport::HttpClient;

/// Executes endpoint requests, blocking or not.
pub trait EndpointRequestExecutor: Send + Sync {
    /// Execute on the calling thread.
    fn execute(&self, request: EndpointRequest) -> Result<EndpointResponse>;

    /// Execute without blocking.
    fn execute_async(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointResponse>>;
}

/// Writes, sends and reads.
#[derive(Clone)]
pub struct DefaultEndpointRequestExecutor {
    writer: RequestWriter,
    client: Arc<dyn HttpClient>,
    reader: ResponseReader,
}

impl DefaultEndpointRequestExecutor {
    pub fn new(writer: RequestWriter, client: Arc<dyn HttpClient>, reader: ResponseReader) -> Self {
        Self {
            writer,
            client,
            reader,
        }
    }
}

impl EndpointRequestExecutor for DefaultEndpointRequestExecutor {
    fn execute(&self, request: EndpointRequest) -> Result<EndpointResponse> {
        let expected = request.response_type().clone();
        let message = self.writer.write(request)?;

        Ok(match self.client.send(message) {
            Ok(response) => self.reader.read(response, &expected),
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("transport failure: {}", error);
                EndpointResponse::failure(error)
            }
        })
    }

    fn execute_async(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointResponse>> {
        let expected = request.response_type().clone();
        let message = match self.writer.write(request) {
            Ok(message) => message,
            Err(error) => return future::ready(Err(error)).boxed(),
        };

        let sent = self.client.send_async(message);
        let reader = self.reader.clone();
        async move {
            Ok(match sent.await {
                Ok(response) => reader.read(response, &expected),
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("transport failure: {}", error);
                    EndpointResponse::failure(error)
                }
            })
        }
        .boxed()
    }
}

impl std::fmt::Debug for DefaultEndpointRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultEndpointRequestExecutor")
            .field("writer", &self.writer)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

/// Runs the interceptor chain before delegating.
///
/// Blocking executions drive asynchronous interceptors through `runner`.
pub struct InterceptingExecutor {
    chain: InterceptorChain,
    runner: Arc<dyn HttpClient>,
    inner: Arc<dyn EndpointRequestExecutor>,
}

impl InterceptingExecutor {
    pub fn new(
        chain: InterceptorChain,
        runner: Arc<dyn HttpClient>,
        inner: Arc<dyn EndpointRequestExecutor>,
    ) -> Self {
        Self {
            chain,
            runner,
            inner,
        }
    }
}

impl EndpointRequestExecutor for InterceptingExecutor {
    fn execute(&self, request: EndpointRequest) -> Result<EndpointResponse> {
        let request = self.chain.apply_blocking(request, self.runner.as_ref())?;
        self.inner.execute(request)
    }

    fn execute_async(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointResponse>> {
        let intercepted = self.chain.apply_async(request);
        let inner = self.inner.clone();
        async move { inner.execute_async(intercepted.await?).await }.boxed()
    }
}

/// Applies recovery hooks to failed responses.
pub struct RecoveringExecutor {
    hooks: RecoveryHooks,
    inner: Arc<dyn EndpointRequestExecutor>,
}

impl RecoveringExecutor {
    pub fn new(hooks: RecoveryHooks, inner: Arc<dyn EndpointRequestExecutor>) -> Self {
        Self { hooks, inner }
    }
}

impl EndpointRequestExecutor for RecoveringExecutor {
    fn execute(&self, request: EndpointRequest) -> Result<EndpointResponse> {
        self.inner
            .execute(request)
            .map(|response| self.hooks.recover(response))
    }

    fn execute_async(&self, request: EndpointRequest) -> BoxFuture<'static, Result<EndpointResponse>> {
        let hooks = self.hooks.clone();
        self.inner
            .execute_async(request)
            .map(move |result| result.map(|response| hooks.recover(response)))
            .boxed()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::interceptor::Interceptor;
    use crate::response::RecoveryHook;
    use crate::transport::{HttpRequestMessage, HttpResponseMessage, ResponseBody};
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
    use restify_core::{Error, ErrorKind, MessageConverters, TypeDescriptor};
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every request with a fixed response and records what it saw.
    pub(crate) struct StubClient {
        pub status: StatusCode,
        pub content_type: &'static str,
        pub body: &'static str,
        pub fail: bool,
        pub seen: Mutex<Vec<HttpRequestMessage>>,
    }

    impl StubClient {
        pub(crate) fn ok(content_type: &'static str, body: &'static str) -> Self {
            Self {
                status: StatusCode::OK,
                content_type,
                body,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn status(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                ..Self::ok("text/plain", body)
            }
        }

        pub(crate) fn refusing() -> Self {
            Self {
                fail: true,
                ..Self::ok("text/plain", "")
            }
        }

        fn answer(&self, request: HttpRequestMessage) -> Result<HttpResponseMessage> {
            self.seen.lock().unwrap().push(request);
            if self.fail {
                return Err(Error::transport("connection refused"));
            }
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
            Ok(HttpResponseMessage::new(
                self.status,
                headers,
                ResponseBody::from_bytes(Bytes::from_static(self.body.as_bytes())),
            ))
        }
    }

    impl HttpClient for StubClient {
        fn send_async(&self, request: HttpRequestMessage) -> BoxFuture<'static, Result<HttpResponseMessage>> {
            future::ready(self.answer(request)).boxed()
        }
    }

    pub(crate) fn executor(client: Arc<StubClient>) -> Arc<dyn EndpointRequestExecutor> {
        let converters = Arc::new(MessageConverters::defaults());
        Arc::new(DefaultEndpointRequestExecutor::new(
            RequestWriter::new(converters.clone()),
            client,
            ResponseReader::new(converters),
        ))
    }

    fn request(response_type: TypeDescriptor) -> EndpointRequest {
        EndpointRequest::new(Method::GET, Uri::from_static("http://localhost/users/1"), response_type)
    }

    #[test]
    fn test_default_executor_reads_success() {
        let client = Arc::new(StubClient::ok("application/json", r#"{"id":42,"name":"Ann"}"#));
        let response = executor(client.clone())
            .execute(request(TypeDescriptor::named("User")))
            .unwrap();

        assert_eq!(response.body(), Some(&json!({"id": 42, "name": "Ann"})));
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_failed_response() {
        let response = executor(Arc::new(StubClient::refusing()))
            .execute_async(request(TypeDescriptor::string()))
            .await
            .unwrap();
        assert!(response.error().unwrap().is_transport());
    }

    #[test]
    fn test_interceptors_run_before_send() {
        let client = Arc::new(StubClient::ok("text/plain", "ok"));
        let mut chain = InterceptorChain::new();
        chain.push(Interceptor::new(|request: EndpointRequest| {
            Ok(request.with_header(
                HeaderName::from_static("authorization"),
                HeaderValue::from_static("Bearer token"),
            ))
        }));

        let executor = InterceptingExecutor::new(chain, client.clone(), executor(client.clone()));
        executor.execute(request(TypeDescriptor::string())).unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].headers["authorization"], "Bearer token");
    }

    #[tokio::test]
    async fn test_interceptor_failure_is_local_error() {
        let client = Arc::new(StubClient::ok("text/plain", "ok"));
        let mut chain = InterceptorChain::new();
        chain.push(Interceptor::new(|_request: EndpointRequest| {
            Err(Error::resolution("missing credentials"))
        }));

        let executor = InterceptingExecutor::new(chain, client.clone(), executor(client.clone()));
        let err = executor
            .execute_async(request(TypeDescriptor::string()))
            .await
            .unwrap_err();
        assert!(err.is_resolution());
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recovering_executor() {
        let mut hooks = RecoveryHooks::new();
        hooks.push(RecoveryHook::on_kind(ErrorKind::Remote, |error| {
            EndpointResponse::success(
                StatusCode::OK,
                HeaderMap::new(),
                Some(json!(format!("recovered {}", error.status().unwrap().as_u16()))),
            )
        }));

        let client = Arc::new(StubClient::status(StatusCode::NOT_FOUND, "missing"));
        let executor = RecoveringExecutor::new(hooks, executor(client));
        let response = executor.execute(request(TypeDescriptor::string())).unwrap();
        assert_eq!(response.body(), Some(&json!("recovered 404")));
    }
}
