//! Declarative HTTP client for Rust.
//!
//! This crate turns an API declaration from `restify-core` into a
//! [`RestifyProxy`]: each declared method becomes a named call that builds the
//! HTTP request from its arguments, sends it and returns the result in the
//! declared shape.
//!
//! ## Features
//!
//! - Path, query, header and body parameters
//! - Content negotiation through an ordered converter registry (text, JSON, form)
//! - Synchronous and asynchronous request interceptors
//! - Return shapes: plain values, `Optional`, `Iterator`, `Queue`,
//!   `EndpointResponse`, `Headers`, `StatusCode`, `Future`, `Stream` and
//!   success/failure callbacks, plus custom adapters
//! - Recovery hooks substituting responses for failures
//! - Hyper transport with TLS (rustls) and response decompression
//! - `restify.call` spans and debug events behind the `tracing` feature (on by default)
//!
//! ## Example
//!
//! ```ignore
//! use restify_client::{Argument, RestifyProxy};
//! use restify_core::{ApiDeclaration, MethodDeclaration, ParameterDeclaration};
//!
//! let api = ApiDeclaration::new("Users")
//!     .path("/users")
//!     .method(
//!         MethodDeclaration::get("find", "/{id}")
//!             .param(ParameterDeclaration::new("id", "u64").path())
//!             .returns("Optional<User>"),
//!     )
//!     .method(
//!         MethodDeclaration::get("search", "/")
//!             .param(ParameterDeclaration::new("name", "String").query())
//!             .returns("Future<Vec<User>>"),
//!     );
//!
//! let proxy = RestifyProxy::builder()
//!     .endpoint("http://localhost:3000")
//!     .api(api)
//!     .build()?;
//!
//! // Blocking call
//! let user: Option<User> = proxy.invoke("find", vec![Argument::from(42)])?.into_optional()?;
//!
//! // Asynchronous call
//! let users: Vec<User> = proxy
//!     .invoke("search", vec![Argument::from("Ann")])?
//!     .into_future()?
//!     .await?
//!     .into_vec()?;
//! ```
//!
//! ## Errors
//!
//! Contract problems are reported by [`RestifyProxyBuilder::build`] as
//! configuration errors. At invocation, failures that happen before the request
//! is sent surface immediately for synchronous shapes and as an already failed
//! future, stream or callback for asynchronous ones. Transport and remote
//! failures can be recovered with [`RestifyProxyBuilder::recover_if`] and
//! friends.

pub mod argument;
mod builder;
mod call;
pub mod executor;
pub mod handler;
pub mod interceptor;
mod options;
mod proxy;
pub mod request;
pub mod response;
pub mod transport;

pub use argument::{Argument, Arguments, FailureCallback, SuccessCallback};
pub use builder::RestifyProxyBuilder;
pub use call::EndpointCall;
pub use executor::EndpointRequestExecutor;
pub use handler::{CallHandler, EndpointCallHandlerAdapter, HandlerAdapter, Returned};
pub use interceptor::{
    AsyncInterceptor, AsyncRequestInterceptor, HeaderInterceptor, Interceptor, RequestInterceptor,
};
pub use options::CallOptions;
pub use proxy::RestifyProxy;
pub use request::{EndpointRequest, Timeout};
pub use response::{EndpointResponse, RecoveryHook};
pub use transport::{HttpClient, HyperHttpClient, HyperHttpClientBuilder, TlsClientConfig};

// Re-export core types for convenience
pub use restify_core::{
    ApiDeclaration, Error, ErrorKind, MessageConverter, MessageConverters, MethodDeclaration,
    ParameterDeclaration, Result, TypeDescriptor,
};

// Re-export commonly used external types
pub use serde_json::{Value, json};
