//! Endpoint requests.
//!
//! This module contains the request side of a call:
//! - [`EndpointRequest`]: A resolved request, before body encoding
//! - [`EndpointRequestFactory`]: Builds requests from a contract and arguments
//! - [`RequestWriter`]: Encodes the body and produces the transport message

mod builder;
mod writer;

pub use builder::EndpointRequestFactory;
pub use writer::RequestWriter;

use std::time::Duration;

use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use restify_core::TypeDescriptor;
use serde_json::Value;

/// Request metadata entry: a timeout the transport should honour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout(pub Duration);

/// A request body, still unencoded.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestBody {
    value: Value,
    ty: TypeDescriptor,
}

impl RequestBody {
    pub fn new(value: Value, ty: TypeDescriptor) -> Self {
        Self { value, ty }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The declared type of the body parameter.
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// The type used to pick a writer: the declared type, or the runtime shape
    /// of the value when nothing more precise was declared.
    pub fn write_type(&self) -> TypeDescriptor {
        match &self.ty {
            TypeDescriptor::Any | TypeDescriptor::Variable(_) => TypeDescriptor::of_value(&self.value),
            ty => ty.clone(),
        }
    }
}

/// A fully resolved request.
///
/// Requests are never mutated in place once built: interceptors produce a new
/// request with [`with_header`](Self::with_header) and friends.
#[derive(Clone, Debug)]
pub struct EndpointRequest {
    uri: Uri,
    method: Method,
    headers: HeaderMap,
    body: Option<RequestBody>,
    metadata: Extensions,
    response_type: TypeDescriptor,
}

impl EndpointRequest {
    pub fn new(method: Method, uri: Uri, response_type: TypeDescriptor) -> Self {
        Self {
            uri,
            method,
            headers: HeaderMap::new(),
            body: None,
            metadata: Extensions::new(),
            response_type,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn metadata(&self) -> &Extensions {
        &self.metadata
    }

    /// The type the response body is decoded into.
    pub fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.metadata.get::<Timeout>().map(|t| t.0)
    }

    /// A copy of this request with `name` set to `value`, replacing previous values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// A copy of this request with `value` added to the values of `name`.
    pub fn with_appended_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<RequestBody>) -> Self {
        self.body = body;
        self
    }

    /// A copy of this request with a metadata entry, keyed by its type.
    pub fn with_metadata<T: Clone + Send + Sync + 'static>(mut self, entry: T) -> Self {
        self.metadata.insert(entry);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_metadata(Timeout(timeout))
    }

    pub(crate) fn into_parts(self) -> (Method, Uri, HeaderMap, Option<RequestBody>, Extensions) {
        (self.method, self.uri, self.headers, self.body, self.metadata)
    }
}
