//! Error types shared by every stage of the call pipeline.
//!
//! [`Error`] distinguishes the failure families a caller needs to tell apart:
//!
//! - [`Error::Configuration`]: a contract or handler chain that can never work,
//!   raised while a proxy is being built.
//! - [`Error::Resolution`]: a per-call mechanical failure (missing path argument,
//!   no converter for a content type).
//! - [`Error::Transport`]: the wire failed; carries the original cause.
//! - [`Error::Remote`]: the server answered with a non-2xx status.
//! - [`Error::Encode`] / [`Error::Decode`]: a converter could not write or read a body.

use std::sync::Arc;

use http::{HeaderMap, StatusCode};

/// Boxed cause carried by transport failures.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout restify.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure raised while building or executing an endpoint call.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The declared contract or handler chain is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The call could not be resolved into a request or a decoder.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Transport-level failure (connection refused, reset, timeout, ...).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP status code: {status}\n{message}")]
    Remote {
        status: StatusCode,
        headers: HeaderMap,
        message: String,
    },

    /// A message converter failed to write a request body.
    #[error("encode error: {0}")]
    Encode(String),

    /// A message converter failed to read a response body.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Discriminant of [`Error`], used by recovery hooks to match a failure family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Transport,
    Remote,
    Encode,
    Decode,
}

impl Error {
    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Error::Configuration(message.into())
    }

    /// Create a resolution error.
    pub fn resolution<S: Into<String>>(message: S) -> Self {
        Error::Resolution(message.into())
    }

    /// Create a transport error without an underlying cause.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Error::Transport {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a transport error wrapping the original cause.
    pub fn transport_caused_by<S, E>(message: S, cause: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Create a remote error for a non-2xx response.
    pub fn remote<S: Into<String>>(status: StatusCode, headers: HeaderMap, message: S) -> Self {
        Error::Remote {
            status,
            headers,
            message: message.into(),
        }
    }

    /// Create an encode error.
    pub fn encode<S: Into<String>>(message: S) -> Self {
        Error::Encode(message.into())
    }

    /// Create a decode error.
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Error::Decode(message.into())
    }

    /// Get the failure family of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Resolution(_) => ErrorKind::Resolution,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Remote { .. } => ErrorKind::Remote,
            Error::Encode(_) => ErrorKind::Encode,
            Error::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Get the HTTP status of a remote error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the response headers of a remote error.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::Remote { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Get the human readable message, without the family prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Configuration(msg)
            | Error::Resolution(msg)
            | Error::Encode(msg)
            | Error::Decode(msg) => msg,
            Error::Transport { message, .. } | Error::Remote { message, .. } => message,
        }
    }

    /// Get the original cause of a transport error.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Error::Transport { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_resolution(&self) -> bool {
        self.kind() == ErrorKind::Resolution
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub fn is_remote(&self) -> bool {
        self.kind() == ErrorKind::Remote
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(format!("JSON conversion failed: {}", err))
    }
}
