//! Asynchronous call handlers.
//!
//! Each handler executes the call without blocking and runs its inner,
//! synchronous handler on the completed response inside the same continuation.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use restify_core::{Error, Result, TypeDescriptor};
use tokio::runtime::Handle;

use super::sync::wrapping_handler;
use super::{CallHandler, Returned};
use crate::argument::Arguments;
use crate::call::EndpointCall;

/// Execute `call` without blocking, then shape the response with `inner`.
fn complete(
    call: EndpointCall,
    inner: Arc<dyn CallHandler>,
    args: Arguments,
) -> BoxFuture<'static, Result<Returned>> {
    let response = call.execute_async();
    async move {
        let response = response.await?;
        inner.handle(EndpointCall::completed(response), &args)
    }
    .boxed()
}

wrapping_handler!(
    /// `Future<T>`: a future of the inner result. Local failures yield an
    /// already failed future, never an error at invocation.
    FutureHandler
);

impl CallHandler for FutureHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned> {
        Ok(Returned::Future(complete(call, self.inner.clone(), args.clone())))
    }
}

wrapping_handler!(
    /// `Stream<T>`: a single-item stream of the inner result.
    StreamHandler
);

impl CallHandler for StreamHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned> {
        let item = complete(call, self.inner.clone(), args.clone());
        Ok(Returned::Stream(stream::once(item).boxed()))
    }
}

/// `()` with a success/failure callback pair.
///
/// The call runs as a task on the configured runtime, or on the runtime
/// current at invocation time; invoking without either is a resolution error.
pub struct CallbackHandler {
    return_type: TypeDescriptor,
    inner: Arc<dyn CallHandler>,
    success: Option<usize>,
    failure: Option<usize>,
    runtime: Option<Handle>,
}

impl CallbackHandler {
    pub fn new(
        return_type: TypeDescriptor,
        inner: Arc<dyn CallHandler>,
        success: Option<usize>,
        failure: Option<usize>,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            return_type,
            inner,
            success,
            failure,
            runtime,
        }
    }
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("return_type", &self.return_type)
            .field("success", &self.success)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl CallHandler for CallbackHandler {
    fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    fn inner(&self) -> Option<&dyn CallHandler> {
        Some(self.inner.as_ref())
    }

    fn handle(&self, call: EndpointCall, args: &Arguments) -> Result<Returned> {
        let runtime = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current().map_err(|_| {
                Error::resolution(
                    "callback calls need a tokio runtime: invoke from within one or configure one on the proxy builder",
                )
            })?,
        };

        let success = self.success.and_then(|position| args.success_callback(position));
        let failure = self.failure.and_then(|position| args.failure_callback(position));
        let outcome = complete(call, self.inner.clone(), args.clone());

        runtime.spawn(async move {
            match outcome.await {
                Ok(returned) => {
                    if let Some(success) = success {
                        success(returned);
                    }
                }
                Err(error) => match failure {
                    Some(failure) => failure(error),
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("call failed without a failure callback: {}", error);
                    }
                },
            }
        });

        Ok(Returned::Unit)
    }
}
