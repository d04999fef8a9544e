//! A single, not yet executed, endpoint call.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use restify_core::{Error, Result};
#[cfg(feature = "tracing")]
use tracing::{Instrument, Span};

use crate::executor::EndpointRequestExecutor;
use crate::request::EndpointRequest;
use crate::response::EndpointResponse;

/// One invocation, handed to the call handler chain.
///
/// A call is consumed by [`execute`](Self::execute) or
/// [`execute_async`](Self::execute_async), so it runs at most once. A call
/// whose request could not be built carries that failure instead; a call
/// created from a response replays it without touching the network, which is
/// how asynchronous handlers run synchronous ones on a completed result.
pub struct EndpointCall {
    state: CallState,
}

enum CallState {
    Pending {
        executor: Arc<dyn EndpointRequestExecutor>,
        request: EndpointRequest,
        #[cfg(feature = "tracing")]
        span: Span,
    },
    Failed(Error),
    Completed(EndpointResponse),
}

impl EndpointCall {
    pub fn new(executor: Arc<dyn EndpointRequestExecutor>, request: EndpointRequest) -> Self {
        Self {
            state: CallState::Pending {
                executor,
                request,
                #[cfg(feature = "tracing")]
                span: Span::none(),
            },
        }
    }

    /// Run the call inside `span`.
    #[cfg(feature = "tracing")]
    pub fn instrument(mut self, span: Span) -> Self {
        if let CallState::Pending { span: current, .. } = &mut self.state {
            *current = span;
        }
        self
    }

    /// A call whose request could not be built.
    pub fn failed(error: Error) -> Self {
        Self {
            state: CallState::Failed(error),
        }
    }

    /// A call that already has its response.
    pub fn completed(response: EndpointResponse) -> Self {
        Self {
            state: CallState::Completed(response),
        }
    }

    /// The request to be sent, if the call is still pending.
    pub fn request(&self) -> Option<&EndpointRequest> {
        match &self.state {
            CallState::Pending { request, .. } => Some(request),
            _ => None,
        }
    }

    /// Execute on the calling thread.
    pub fn execute(self) -> Result<EndpointResponse> {
        match self.state {
            #[cfg(feature = "tracing")]
            CallState::Pending {
                executor,
                request,
                span,
            } => span.in_scope(|| executor.execute(request)),
            #[cfg(not(feature = "tracing"))]
            CallState::Pending { executor, request } => executor.execute(request),
            CallState::Failed(error) => Err(error),
            CallState::Completed(response) => Ok(response),
        }
    }

    /// Execute without blocking. Local failures yield an already failed future.
    pub fn execute_async(self) -> BoxFuture<'static, Result<EndpointResponse>> {
        match self.state {
            #[cfg(feature = "tracing")]
            CallState::Pending {
                executor,
                request,
                span,
            } => span
                .in_scope(|| executor.execute_async(request))
                .instrument(span)
                .boxed(),
            #[cfg(not(feature = "tracing"))]
            CallState::Pending { executor, request } => executor.execute_async(request),
            CallState::Failed(error) => future::ready(Err(error)).boxed(),
            CallState::Completed(response) => future::ready(Ok(response)).boxed(),
        }
    }
}

impl fmt::Debug for EndpointCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            CallState::Pending { request, .. } => f
                .debug_struct("EndpointCall::Pending")
                .field("request", request)
                .finish_non_exhaustive(),
            CallState::Failed(error) => f.debug_tuple("EndpointCall::Failed").field(error).finish(),
            CallState::Completed(response) => f
                .debug_tuple("EndpointCall::Completed")
                .field(response)
                .finish(),
        }
    }
}
