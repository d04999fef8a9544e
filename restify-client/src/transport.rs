//! HTTP transport boundary.
//!
//! The engine hands an [`HttpRequestMessage`] to an [`HttpClient`] and gets an
//! [`HttpResponseMessage`] back. Any transport can be plugged in by implementing
//! [`HttpClient`]; [`HyperHttpClient`] is the default, using hyper_util's legacy
//! client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//! - The [`Timeout`](crate::request::Timeout) request metadata entry
//! - gzip/deflate response decoding (feature-gated)
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//! - `compression-gzip` / `compression-deflate` - Response decoding
//!
//! # Example
//!
//! ```ignore
//! use restify_client::transport::HyperHttpClient;
//! use std::time::Duration;
//!
//! let client = HyperHttpClient::builder()
//!     .http2_only(true)
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//! ```

mod connector;
mod hyper;

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub use connector::default_tls_config;
pub use connector::{build_https_connector, has_tls_support};
pub use hyper::{HyperHttpClient, HyperHttpClientBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Extensions, HeaderMap, Method, StatusCode, Uri};
use restify_core::Result;

/// A request as handed to the transport: the body is already encoded.
#[derive(Debug)]
pub struct HttpRequestMessage {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub metadata: Extensions,
}

/// A response as returned by the transport.
///
/// Headers are complete; the body is exposed as a byte stream.
#[derive(Debug)]
pub struct HttpResponseMessage {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl HttpResponseMessage {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

/// A response byte stream, released exactly once.
///
/// The underlying reader is dropped on [`close`](Self::close), on end of
/// stream, or when the body is dropped, whichever comes first. Reads after
/// close return end of stream.
pub struct ResponseBody {
    reader: Option<Box<dyn Read + Send>>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { reader: None }
    }

    pub fn from_bytes(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::from_reader(io::Cursor::new(bytes))
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Some(Box::new(reader)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Release the underlying stream. Idempotent.
    pub fn close(&mut self) {
        self.reader.take();
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };
        match reader.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.close();
                Ok(0)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
            read => read,
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A pluggable HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Send a request without blocking.
    fn send_async(&self, request: HttpRequestMessage) -> BoxFuture<'static, Result<HttpResponseMessage>>;

    /// Send a request, blocking the calling thread until headers and body are available.
    fn send(&self, request: HttpRequestMessage) -> Result<HttpResponseMessage> {
        futures::executor::block_on(self.send_async(request))
    }

    /// Run `task` to completion on the runtime backing blocking sends.
    ///
    /// The default polls it on the calling thread, which only suits tasks that
    /// need no tokio reactor.
    fn block_on(&self, task: BoxFuture<'static, ()>) -> Result<()> {
        futures::executor::block_on(task);
        Ok(())
    }
}

impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    fn send_async(&self, request: HttpRequestMessage) -> BoxFuture<'static, Result<HttpResponseMessage>> {
        (**self).send_async(request)
    }

    fn send(&self, request: HttpRequestMessage) -> Result<HttpResponseMessage> {
        (**self).send(request)
    }

    fn block_on(&self, task: BoxFuture<'static, ()>) -> Result<()> {
        (**self).block_on(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        inner: io::Cursor<Vec<u8>>,
        drops: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for CountingReader {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_body_released_once_at_end_of_stream() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut body = ResponseBody::from_reader(CountingReader {
            inner: io::Cursor::new(b"payload".to_vec()),
            drops: drops.clone(),
        });

        let mut content = String::new();
        body.read_to_string(&mut content).unwrap();
        assert_eq!(content, "payload");
        assert!(body.is_closed());

        body.close();
        drop(body);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_body_released_on_drop() {
        let drops = Arc::new(AtomicUsize::new(0));
        let body = ResponseBody::from_reader(CountingReader {
            inner: io::Cursor::new(b"unread".to_vec()),
            drops: drops.clone(),
        });
        drop(body);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_bytes_are_closed() {
        let mut body = ResponseBody::from_bytes(Bytes::new());
        assert!(body.is_closed());
        let mut buf = [0u8; 4];
        assert_eq!(body.read(&mut buf).unwrap(), 0);
    }
}
