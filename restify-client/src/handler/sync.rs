//! Synchronous call handlers.

use std::collections::VecDeque;
use std::sync::Arc;

use restify_core::{Error, Result, TypeDescriptor};
use serde_json::Value;

use super::{CallHandler, Returned};
use crate::argument::Arguments;
use crate::call::EndpointCall;

/// Terminal handler: executes the call and returns the decoded body.
#[derive(Clone, Debug)]
pub struct IdentityHandler {
    return_type: TypeDescriptor,
}

impl IdentityHandler {
    pub fn new(return_type: TypeDescriptor) -> Self {
        Self { return_type }
    }
}

impl CallHandler for IdentityHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn handle(&self, call: EndpointCall, _args: &Arguments) -> Result<Returned> {
        // `()` still executes the call and surfaces its failure.
        let body = call.execute()?.into_body()?;
        if self.return_type.is_void() {
            return Ok(Returned::Unit);
        }
        Ok(Returned::Value(body.unwrap_or(Value::Null)))
    }
}

macro_rules! wrapping_handler {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name {
            return_type: TypeDescriptor,
            inner: Arc<dyn CallHandler>,
        }

        impl $name {
            pub fn new(return_type: TypeDescriptor, inner: Arc<dyn CallHandler>) -> Self {
                Self { return_type, inner }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("return_type", &self.return_type)
                    .finish_non_exhaustive()
            }
        }
    };
}

pub(super) use wrapping_handler;

wrapping_handler!(
    /// `Optional<T>`: an absent body becomes `None`.
    OptionalHandler
);

impl CallHandler for OptionalHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned> {
        Ok(match self.inner.handle(call, args)? {
            Returned::Unit | Returned::Value(Value::Null) => Returned::Optional(None),
            other => Returned::Optional(Some(Box::new(other))),
        })
    }
}

/// Elements of an array body; an absent body has none.
fn elements(returned: Returned) -> Result<Vec<Value>> {
    match returned.into_json()? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::decode(format!(
            "expected an array body, got {}",
            TypeDescriptor::of_value(&other)
        ))),
    }
}

wrapping_handler!(
    /// `Iterator<T>`: iterates the elements of an array body.
    IteratorHandler
);

impl CallHandler for IteratorHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned> {
        let items = elements(self.inner.handle(call, args)?)?;
        Ok(Returned::Iterator(Box::new(items.into_iter())))
    }
}

wrapping_handler!(
    /// `Queue<T>`: the elements of an array body, in order.
    QueueHandler
);

impl CallHandler for QueueHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned> {
        let items = elements(self.inner.handle(call, args)?)?;
        Ok(Returned::Queue(VecDeque::from(items)))
    }
}

wrapping_handler!(
    /// `EndpointResponse<T>`: the response itself, failures included, so the
    /// caller can recover on its own. The inner chain only fixes the body type.
    ResponseHandler
);

impl CallHandler for ResponseHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, _args: &Arguments) -> Result<Returned> {
        call.execute().map(Returned::Response)
    }
}

wrapping_handler!(
    /// `Headers`: the response headers; the body is not decoded.
    HeadersHandler
);

impl CallHandler for HeadersHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, _args: &Arguments) -> Result<Returned> {
        let (_, headers, _) = call.execute()?.into_parts()?;
        Ok(Returned::Headers(headers))
    }
}

wrapping_handler!(
    /// `StatusCode`: the response status; the body is not decoded.
    StatusCodeHandler
);

impl CallHandler for StatusCodeHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, _args: &Arguments) -> Result<Returned> {
        let (status, _, _) = call.execute()?.into_parts()?;
        Ok(Returned::Status(status))
    }
}
