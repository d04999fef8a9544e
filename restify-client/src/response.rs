//! Endpoint responses.
//!
//! This module contains the response side of a call:
//! - [`EndpointResponse`]: A decoded response, or the failure that replaced it
//! - [`ResponseReader`]: Turns a transport response into an [`EndpointResponse`]
//! - [`RecoveryHook`]: Substitutes a response for a matching failure

mod reader;
mod recovery;

pub use reader::ResponseReader;
pub use recovery::{RecoveryHook, RecoveryHooks};

use http::{HeaderMap, StatusCode};
use restify_core::{Error, ErrorKind, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of one executed call.
///
/// A response is either a decoded success or a failure wrapping the error that
/// ended the exchange (non-2xx status, transport or decode failure). Failures
/// travel as values so they can be recovered before reaching the caller.
///
/// # Example
///
/// ```ignore
/// use restify_client::EndpointResponse;
///
/// let response = call.execute()?
///     .recover_if(|e| e.status() == Some(StatusCode::NOT_FOUND), |_| {
///         EndpointResponse::success(StatusCode::OK, HeaderMap::new(), None)
///     });
/// ```
#[derive(Clone, Debug)]
pub enum EndpointResponse {
    Success {
        status: StatusCode,
        headers: HeaderMap,
        /// Decoded body, `None` when nothing was decoded.
        body: Option<Value>,
    },
    Failure(Error),
}

impl EndpointResponse {
    pub fn success(status: StatusCode, headers: HeaderMap, body: Option<Value>) -> Self {
        EndpointResponse::Success {
            status,
            headers,
            body,
        }
    }

    pub fn failure(error: Error) -> Self {
        EndpointResponse::Failure(error)
    }

    /// The response status; for failures, the status of a remote error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            EndpointResponse::Success { status, .. } => Some(*status),
            EndpointResponse::Failure(error) => error.status(),
        }
    }

    /// The response headers; for failures, the headers of a remote error.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            EndpointResponse::Success { headers, .. } => Some(headers),
            EndpointResponse::Failure(error) => error.headers(),
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            EndpointResponse::Success { body, .. } => body.as_ref(),
            EndpointResponse::Failure(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EndpointResponse::Success { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            EndpointResponse::Success { .. } => None,
            EndpointResponse::Failure(error) => Some(error),
        }
    }

    /// Split a success into its parts, or return the failure.
    pub fn into_parts(self) -> Result<(StatusCode, HeaderMap, Option<Value>)> {
        match self {
            EndpointResponse::Success {
                status,
                headers,
                body,
            } => Ok((status, headers, body)),
            EndpointResponse::Failure(error) => Err(error),
        }
    }

    /// The decoded body of a success, or the failure.
    pub fn into_body(self) -> Result<Option<Value>> {
        self.into_parts().map(|(_, _, body)| body)
    }

    /// Deserialize the body of a success into `T`.
    ///
    /// A missing body deserializes from `null`, so `Option<T>` targets accept it.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.into_body()?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(body)?)
    }

    /// Replace any failure with the response produced by `recover`.
    pub fn recover<F>(self, recover: F) -> Self
    where
        F: FnOnce(&Error) -> EndpointResponse,
    {
        self.recover_if(|_| true, recover)
    }

    /// Replace a failure matching `predicate` with the response produced by `recover`.
    pub fn recover_if<P, F>(self, predicate: P, recover: F) -> Self
    where
        P: FnOnce(&Error) -> bool,
        F: FnOnce(&Error) -> EndpointResponse,
    {
        match self {
            EndpointResponse::Failure(error) if predicate(&error) => recover(&error),
            response => response,
        }
    }

    /// Replace a failure of the given kind with the response produced by `recover`.
    pub fn recover_kind<F>(self, kind: ErrorKind, recover: F) -> Self
    where
        F: FnOnce(&Error) -> EndpointResponse,
    {
        self.recover_if(|error| error.kind() == kind, recover)
    }
}

impl From<Error> for EndpointResponse {
    fn from(error: Error) -> Self {
        EndpointResponse::failure(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn not_found() -> EndpointResponse {
        EndpointResponse::failure(Error::remote(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            "user not found",
        ))
    }

    fn fallback(_: &Error) -> EndpointResponse {
        EndpointResponse::success(StatusCode::OK, HeaderMap::new(), Some(json!("fallback")))
    }

    #[test]
    fn test_failure_exposes_remote_status() {
        let response = not_found();
        assert!(!response.is_success());
        assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
        assert!(response.body().is_none());
        assert!(response.into_body().unwrap_err().is_remote());
    }

    #[test]
    fn test_recover_if_matching_predicate() {
        let response = not_found().recover_if(|e| e.status() == Some(StatusCode::NOT_FOUND), fallback);
        assert!(response.is_success());
        assert_eq!(response.body(), Some(&json!("fallback")));
    }

    #[test]
    fn test_recover_if_non_matching_predicate() {
        let response = not_found().recover_if(|e| e.is_transport(), fallback);
        assert!(response.error().unwrap().is_remote());
    }

    #[test]
    fn test_recover_kind() {
        let response = EndpointResponse::failure(Error::transport("refused"))
            .recover_kind(ErrorKind::Remote, fallback);
        assert!(response.error().unwrap().is_transport());

        let response = response.recover_kind(ErrorKind::Transport, fallback);
        assert!(response.is_success());
    }

    #[test]
    fn test_success_is_never_recovered() {
        let response = EndpointResponse::success(StatusCode::OK, HeaderMap::new(), Some(json!(1)))
            .recover(|_| panic!("must not be called"));
        assert_eq!(response.body(), Some(&json!(1)));
    }

    #[test]
    fn test_deserialize_missing_body_as_option() {
        let response = EndpointResponse::success(StatusCode::NO_CONTENT, HeaderMap::new(), None);
        let value: Option<u32> = response.deserialize().unwrap();
        assert_eq!(value, None);
    }
}
