//! Values produced by the call handler chain.

use std::collections::VecDeque;
use std::fmt;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use http::{HeaderMap, StatusCode};
use restify_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::response::EndpointResponse;

/// What an invocation returns, shaped by the declared return type.
///
/// Each variant corresponds to one return shape; the `into_*` extractors
/// convert it into the caller's Rust type.
///
/// # Example
///
/// ```ignore
/// let user: Option<User> = proxy.invoke("find", args)?.into_optional()?;
///
/// let greeting: String = proxy
///     .invoke("greet", args)?
///     .into_future()?
///     .await?
///     .into_value()?;
/// ```
pub enum Returned {
    /// `()`.
    Unit,
    /// A decoded body, `null` when absent.
    Value(Value),
    Optional(Option<Box<Returned>>),
    Iterator(Box<dyn Iterator<Item = Value> + Send>),
    Queue(VecDeque<Value>),
    Response(EndpointResponse),
    Headers(HeaderMap),
    Status(StatusCode),
    Future(BoxFuture<'static, Result<Returned>>),
    Stream(BoxStream<'static, Result<Returned>>),
}

impl Returned {
    /// Name of the shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Returned::Unit => "unit",
            Returned::Value(_) => "value",
            Returned::Optional(_) => "optional",
            Returned::Iterator(_) => "iterator",
            Returned::Queue(_) => "queue",
            Returned::Response(_) => "response",
            Returned::Headers(_) => "headers",
            Returned::Status(_) => "status code",
            Returned::Future(_) => "future",
            Returned::Stream(_) => "stream",
        }
    }

    fn unexpected(self, expected: &str) -> Error {
        Error::resolution(format!("expected a {} result, got a {}", expected, self.shape()))
    }

    /// The raw value of a value-like result.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Returned::Unit | Returned::Optional(None) => Ok(Value::Null),
            Returned::Value(value) => Ok(value),
            Returned::Optional(Some(inner)) => inner.into_json(),
            Returned::Queue(queue) => Ok(Value::Array(queue.into())),
            Returned::Iterator(iter) => Ok(Value::Array(iter.collect())),
            other => Err(other.unexpected("value")),
        }
    }

    /// Deserialize a value-like result.
    pub fn into_value<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_json()?)?)
    }

    pub fn into_optional<T: DeserializeOwned>(self) -> Result<Option<T>> {
        match self {
            Returned::Optional(None) | Returned::Value(Value::Null) | Returned::Unit => Ok(None),
            Returned::Optional(Some(inner)) => inner.into_value().map(Some),
            other => other.into_value().map(Some),
        }
    }

    pub fn into_vec<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        match self.into_json()? {
            Value::Null => Ok(Vec::new()),
            value => Ok(serde_json::from_value(value)?),
        }
    }

    pub fn into_iterator(self) -> Result<Box<dyn Iterator<Item = Value> + Send>> {
        match self {
            Returned::Iterator(iter) => Ok(iter),
            other => Err(other.unexpected("iterator")),
        }
    }

    pub fn into_queue(self) -> Result<VecDeque<Value>> {
        match self {
            Returned::Queue(queue) => Ok(queue),
            other => Err(other.unexpected("queue")),
        }
    }

    pub fn into_response(self) -> Result<EndpointResponse> {
        match self {
            Returned::Response(response) => Ok(response),
            other => Err(other.unexpected("response")),
        }
    }

    pub fn into_headers(self) -> Result<HeaderMap> {
        match self {
            Returned::Headers(headers) => Ok(headers),
            other => Err(other.unexpected("headers")),
        }
    }

    pub fn into_status(self) -> Result<StatusCode> {
        match self {
            Returned::Status(status) => Ok(status),
            other => Err(other.unexpected("status code")),
        }
    }

    pub fn into_future(self) -> Result<BoxFuture<'static, Result<Returned>>> {
        match self {
            Returned::Future(future) => Ok(future),
            other => Err(other.unexpected("future")),
        }
    }

    pub fn into_stream(self) -> Result<BoxStream<'static, Result<Returned>>> {
        match self {
            Returned::Stream(stream) => Ok(stream),
            other => Err(other.unexpected("stream")),
        }
    }
}

impl fmt::Debug for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Unit => f.write_str("Unit"),
            Returned::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Returned::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Returned::Queue(queue) => f.debug_tuple("Queue").field(queue).finish(),
            Returned::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Returned::Headers(headers) => f.debug_tuple("Headers").field(headers).finish(),
            Returned::Status(status) => f.debug_tuple("Status").field(status).finish(),
            Returned::Iterator(_) | Returned::Future(_) | Returned::Stream(_) => {
                write!(f, "{}(..)", self.shape())
            }
        }
    }
}
