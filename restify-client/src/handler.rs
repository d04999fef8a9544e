//! Call handler chain.
//!
//! A [`CallHandler`] turns an [`EndpointCall`] into the shape the caller
//! declared. Handlers are nested: `Future<Optional<User>>` resolves to a
//! [`FutureHandler`] wrapping an [`OptionalHandler`] wrapping an
//! [`IdentityHandler`] for `User`. The innermost return type is the type the
//! response body is decoded into.
//!
//! Resolution starts at the declared return type and picks the first
//! [`HandlerAdapter`] supporting it; the adapter's unwrapped type is resolved
//! the same way until no adapter matches. User adapters
//! ([`EndpointCallHandlerAdapter`]) are tried before the built-in ones.
//!
//! # Built-in adapters
//!
//! | Declared type | Unwraps to | Returned |
//! |---------------|------------|----------|
//! | `Optional<T>` | `T` | [`Returned::Optional`] |
//! | `Iterator<T>` | `Vec<T>` | [`Returned::Iterator`] |
//! | `Queue<T>` | `Vec<T>` | [`Returned::Queue`] |
//! | `EndpointResponse<T>` | `T` | [`Returned::Response`] |
//! | `Headers` | `()` | [`Returned::Headers`] |
//! | `StatusCode` | `()` | [`Returned::Status`] |
//! | `Future<T>` | `T` | [`Returned::Future`] |
//! | `Stream<T>` | `T` | [`Returned::Stream`] |
//! | `()` with callback parameters | `T` of `SuccessCallback<T>` | [`Returned::Unit`] |

mod asynchronous;
mod returned;
mod sync;

pub use asynchronous::{CallbackHandler, FutureHandler, StreamHandler};
pub use returned::Returned;
pub use sync::{
    HeadersHandler, IdentityHandler, IteratorHandler, OptionalHandler, QueueHandler,
    ResponseHandler, StatusCodeHandler,
};

use std::fmt;
use std::sync::Arc;

use restify_core::{CallbackKind, EndpointMethod, Error, Result, TypeDescriptor, kinds};
use tokio::runtime::Handle;

use crate::argument::Arguments;
use crate::call::EndpointCall;

/// One link of a resolved handler chain.
pub trait CallHandler: Send + Sync {
    /// The return type this handler produces.
    fn return_type(&self) -> &TypeDescriptor;

    /// The handler this one delegates to, `None` for the terminal handler.
    fn inner(&self) -> Option<&dyn CallHandler> {
        None
    }

    /// The type the response body is decoded into.
    fn response_type(&self) -> &TypeDescriptor {
        match self.inner() {
            Some(inner) => inner.response_type(),
            None => self.return_type(),
        }
    }

    /// Execute the call (exactly once) and shape its outcome.
    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned>;
}

/// Third-party return shape.
///
/// `supports` and `unwrapped_return_type` see the method with its return type
/// replaced by the type currently being resolved.
///
/// # Example
///
/// ```ignore
/// struct Lazy;
///
/// impl EndpointCallHandlerAdapter for Lazy {
///     fn supports(&self, method: &EndpointMethod) -> bool {
///         method.return_type().is("Lazy")
///     }
///
///     fn unwrapped_return_type(&self, method: &EndpointMethod) -> TypeDescriptor {
///         method.return_type().argument_or_any(0)
///     }
///
///     fn adapt(&self, method: &EndpointMethod, inner: Arc<dyn CallHandler>) -> Arc<dyn CallHandler> {
///         Arc::new(LazyHandler::new(method.return_type().clone(), inner))
///     }
/// }
/// ```
pub trait EndpointCallHandlerAdapter: Send + Sync {
    fn supports(&self, method: &EndpointMethod) -> bool;

    fn unwrapped_return_type(&self, method: &EndpointMethod) -> TypeDescriptor;

    fn adapt(&self, method: &EndpointMethod, inner: Arc<dyn CallHandler>) -> Arc<dyn CallHandler>;
}

/// A return-shaping adapter.
#[derive(Clone)]
pub enum HandlerAdapter {
    Optional,
    Iterator,
    Queue,
    Response,
    Headers,
    StatusCode,
    Future,
    Stream,
    /// Success/failure callback pair; spawns on `runtime`, or on the runtime
    /// current at invocation time.
    Callback { runtime: Option<Handle> },
    Custom(Arc<dyn EndpointCallHandlerAdapter>),
}

impl HandlerAdapter {
    /// The built-in adapters in resolution order.
    pub fn builtins(runtime: Option<Handle>) -> Vec<HandlerAdapter> {
        vec![
            HandlerAdapter::Optional,
            HandlerAdapter::Iterator,
            HandlerAdapter::Queue,
            HandlerAdapter::Response,
            HandlerAdapter::Headers,
            HandlerAdapter::StatusCode,
            HandlerAdapter::Future,
            HandlerAdapter::Stream,
            HandlerAdapter::Callback { runtime },
        ]
    }

    pub fn custom<A: EndpointCallHandlerAdapter + 'static>(adapter: A) -> Self {
        HandlerAdapter::Custom(Arc::new(adapter))
    }

    fn is_callback(&self) -> bool {
        matches!(self, HandlerAdapter::Callback { .. })
    }

    pub fn supports(&self, method: &EndpointMethod) -> bool {
        let ty = method.return_type();
        match self {
            HandlerAdapter::Optional => ty.is(kinds::OPTIONAL),
            HandlerAdapter::Iterator => ty.is(kinds::ITERATOR),
            HandlerAdapter::Queue => ty.is(kinds::QUEUE),
            HandlerAdapter::Response => ty.is(kinds::RESPONSE),
            HandlerAdapter::Headers => ty.is(kinds::HEADERS),
            HandlerAdapter::StatusCode => ty.is(kinds::STATUS_CODE),
            HandlerAdapter::Future => ty.is(kinds::FUTURE),
            HandlerAdapter::Stream => ty.is(kinds::STREAM),
            HandlerAdapter::Callback { .. } => method.has_callbacks() && ty.is_void(),
            HandlerAdapter::Custom(adapter) => adapter.supports(method),
        }
    }

    pub fn unwrapped_return_type(&self, method: &EndpointMethod) -> TypeDescriptor {
        let ty = method.return_type();
        match self {
            HandlerAdapter::Optional
            | HandlerAdapter::Response
            | HandlerAdapter::Future
            | HandlerAdapter::Stream => ty.argument_or_any(0),
            HandlerAdapter::Iterator | HandlerAdapter::Queue => {
                TypeDescriptor::collection(ty.argument_or_any(0))
            }
            HandlerAdapter::Headers | HandlerAdapter::StatusCode => TypeDescriptor::Void,
            HandlerAdapter::Callback { .. } => method
                .callback(CallbackKind::Success)
                .map(|parameter| parameter.ty().argument_or_any(0))
                .unwrap_or(TypeDescriptor::Void),
            HandlerAdapter::Custom(adapter) => adapter.unwrapped_return_type(method),
        }
    }

    pub fn adapt(&self, method: &EndpointMethod, inner: Arc<dyn CallHandler>) -> Arc<dyn CallHandler> {
        let ty = method.return_type().clone();
        match self {
            HandlerAdapter::Optional => Arc::new(OptionalHandler::new(ty, inner)),
            HandlerAdapter::Iterator => Arc::new(IteratorHandler::new(ty, inner)),
            HandlerAdapter::Queue => Arc::new(QueueHandler::new(ty, inner)),
            HandlerAdapter::Response => Arc::new(ResponseHandler::new(ty, inner)),
            HandlerAdapter::Headers => Arc::new(HeadersHandler::new(ty, inner)),
            HandlerAdapter::StatusCode => Arc::new(StatusCodeHandler::new(ty, inner)),
            HandlerAdapter::Future => Arc::new(FutureHandler::new(ty, inner)),
            HandlerAdapter::Stream => Arc::new(StreamHandler::new(ty, inner)),
            HandlerAdapter::Callback { runtime } => Arc::new(CallbackHandler::new(
                ty,
                inner,
                method.callback(CallbackKind::Success).map(|p| p.position()),
                method.callback(CallbackKind::Failure).map(|p| p.position()),
                runtime.clone(),
            )),
            HandlerAdapter::Custom(adapter) => adapter.adapt(method, inner),
        }
    }
}

impl fmt::Debug for HandlerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerAdapter::Optional => f.write_str("Optional"),
            HandlerAdapter::Iterator => f.write_str("Iterator"),
            HandlerAdapter::Queue => f.write_str("Queue"),
            HandlerAdapter::Response => f.write_str("Response"),
            HandlerAdapter::Headers => f.write_str("Headers"),
            HandlerAdapter::StatusCode => f.write_str("StatusCode"),
            HandlerAdapter::Future => f.write_str("Future"),
            HandlerAdapter::Stream => f.write_str("Stream"),
            HandlerAdapter::Callback { .. } => f.write_str("Callback"),
            HandlerAdapter::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Builds handler chains from an ordered adapter list.
#[derive(Clone, Debug)]
pub struct CallHandlerResolver {
    adapters: Vec<HandlerAdapter>,
}

impl Default for CallHandlerResolver {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

impl CallHandlerResolver {
    /// User adapters first, then the built-ins.
    pub fn new(custom: Vec<Arc<dyn EndpointCallHandlerAdapter>>, runtime: Option<Handle>) -> Self {
        let adapters = custom
            .into_iter()
            .map(HandlerAdapter::Custom)
            .chain(HandlerAdapter::builtins(runtime))
            .collect();
        Self { adapters }
    }

    /// A resolver using exactly `adapters`, in order.
    pub fn with_adapters(adapters: Vec<HandlerAdapter>) -> Self {
        Self { adapters }
    }

    pub fn resolve(&self, method: &EndpointMethod) -> Result<Arc<dyn CallHandler>> {
        if method.has_callbacks() && !method.return_type().is_void() {
            return Err(Error::configuration(format!(
                "method [{}] declares callback parameters but returns [{}]; callback methods return ()",
                method.name(),
                method.return_type()
            )));
        }

        let handler = self.resolve_type(method, method.return_type().clone(), method.has_callbacks())?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = method.name(),
            return_type = %method.return_type(),
            response_type = %handler.response_type(),
            "resolved call handler chain"
        );
        Ok(handler)
    }

    fn resolve_type(
        &self,
        method: &EndpointMethod,
        current: TypeDescriptor,
        callbacks_pending: bool,
    ) -> Result<Arc<dyn CallHandler>> {
        let candidate = method.with_return_type(current.clone());
        let matching: Vec<&HandlerAdapter> = self
            .adapters
            .iter()
            .filter(|adapter| (callbacks_pending || !adapter.is_callback()) && adapter.supports(&candidate))
            .collect();

        let Some(adapter) = matching.first().copied() else {
            return Ok(Arc::new(IdentityHandler::new(current)));
        };

        if matching.len() > 1 && matching.iter().any(|a| a.is_callback()) {
            return Err(Error::configuration(format!(
                "callback parameters of method [{}] conflict with the {:?} adapter for [{}]",
                method.name(),
                matching.iter().find(|a| !a.is_callback()).unwrap_or(&adapter),
                current
            )));
        }

        let unwrapped = adapter.unwrapped_return_type(&candidate);
        if unwrapped == current && !adapter.is_callback() {
            return Err(Error::configuration(format!(
                "{:?} adapter does not unwrap [{}] of method [{}]",
                adapter,
                current,
                method.name()
            )));
        }

        let inner = self.resolve_type(method, unwrapped, callbacks_pending && !adapter.is_callback())?;
        Ok(adapter.adapt(&candidate, inner))
    }
}
