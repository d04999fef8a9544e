//! Recovery hooks applied to failed responses.

use std::fmt;
use std::sync::Arc;

use restify_core::{Error, ErrorKind};

use super::EndpointResponse;

type Predicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;
type Recover = Arc<dyn Fn(&Error) -> EndpointResponse + Send + Sync>;

/// Substitutes a response for a failure matching a predicate.
#[derive(Clone)]
pub struct RecoveryHook {
    predicate: Predicate,
    recover: Recover,
}

impl RecoveryHook {
    /// A hook recovering every failure.
    pub fn always<F>(recover: F) -> Self
    where
        F: Fn(&Error) -> EndpointResponse + Send + Sync + 'static,
    {
        Self::when(|_| true, recover)
    }

    /// A hook recovering failures matching `predicate`.
    pub fn when<P, F>(predicate: P, recover: F) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
        F: Fn(&Error) -> EndpointResponse + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            recover: Arc::new(recover),
        }
    }

    /// A hook recovering failures of one kind.
    pub fn on_kind<F>(kind: ErrorKind, recover: F) -> Self
    where
        F: Fn(&Error) -> EndpointResponse + Send + Sync + 'static,
    {
        Self::when(move |error| error.kind() == kind, recover)
    }

    pub fn matches(&self, error: &Error) -> bool {
        (self.predicate)(error)
    }

    pub fn apply(&self, error: &Error) -> EndpointResponse {
        (self.recover)(error)
    }
}

impl fmt::Debug for RecoveryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryHook").finish_non_exhaustive()
    }
}

/// Ordered recovery hooks; the first hook matching a failure wins.
#[derive(Clone, Debug, Default)]
pub struct RecoveryHooks {
    hooks: Vec<RecoveryHook>,
}

impl RecoveryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: RecoveryHook) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Apply the first matching hook to a failure. Successes pass through.
    pub fn recover(&self, response: EndpointResponse) -> EndpointResponse {
        let EndpointResponse::Failure(error) = response else {
            return response;
        };

        match self.hooks.iter().find(|hook| hook.matches(&error)) {
            Some(hook) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(kind = ?error.kind(), "recovering failed response");
                hook.apply(&error)
            }
            None => EndpointResponse::Failure(error),
        }
    }
}
