//! Call options for per-invocation configuration.
//!
//! This module provides [`CallOptions`] for configuring individual calls with
//! a timeout and extra headers.

use http::{HeaderMap, HeaderName, HeaderValue};
use restify_core::{Error, Result};
use std::time::Duration;

/// Options for configuring one invocation.
///
/// Use this to set a per-call timeout or custom headers that differ from the
/// proxy defaults. Option headers replace default headers of the same name.
///
/// # Example
///
/// ```ignore
/// use restify_client::CallOptions;
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .try_header("x-request-id", "abc-123")?;
///
/// let user = proxy.invoke_with_options("find", args, options)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Timeout for this specific call.
    /// If set, overrides the proxy's default timeout.
    pub(crate) timeout: Option<Duration>,
    /// Custom headers for this specific call.
    pub(crate) headers: HeaderMap,
}

impl CallOptions {
    /// Create new default call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this call.
    ///
    /// The timeout is attached to the request metadata; the bundled hyper
    /// transport bounds the whole exchange with it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the configured timeout, if any.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Add a custom header for this call.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Parse and add a custom header for this call.
    ///
    /// Returns a resolution error if the header name or value is invalid.
    pub fn try_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::resolution(format!("invalid header name: {}", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| Error::resolution(format!("invalid header value for {}", name)))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Set all custom headers for this call, replacing any existing headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Get a reference to the custom headers.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the custom headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}
