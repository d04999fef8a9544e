//! Reading transport responses.

use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use http::StatusCode;
use http::header::CONTENT_TYPE;
use restify_core::converter::TEXT_PLAIN;
use restify_core::{Error, MessageConverters, TypeDescriptor};

use super::EndpointResponse;
use crate::transport::{HttpResponseMessage, ResponseBody};

/// Decodes transport responses with the registered converters.
///
/// - non-2xx: the body is read as lossy text and becomes a remote failure
/// - `()` expected, `204 No Content` or an empty body: nothing is decoded
/// - otherwise the converter is chosen by `Content-Type` (default `text/plain`)
///
/// The body is released exactly once on every path.
#[derive(Clone, Debug)]
pub struct ResponseReader {
    converters: Arc<MessageConverters>,
}

impl ResponseReader {
    pub fn new(converters: Arc<MessageConverters>) -> Self {
        Self { converters }
    }

    pub fn read(&self, response: HttpResponseMessage, expected: &TypeDescriptor) -> EndpointResponse {
        let HttpResponseMessage {
            status,
            headers,
            mut body,
        } = response;

        // Nothing is read for `()`, whatever the status.
        if expected.is_void() {
            body.close();
            return EndpointResponse::success(status, headers, None);
        }

        if !status.is_success() {
            let message = error_message(&mut body);
            #[cfg(feature = "tracing")]
            tracing::warn!(status = status.as_u16(), "endpoint answered with an error status");
            return EndpointResponse::failure(Error::remote(status, headers, message));
        }

        if status == StatusCode::NO_CONTENT {
            body.close();
            return EndpointResponse::success(status, headers, None);
        }

        let mut source = BufReader::new(body);
        match source.fill_buf() {
            Ok([]) => return EndpointResponse::success(status, headers, None),
            Ok(_) => {}
            Err(e) => {
                return EndpointResponse::failure(Error::transport_caused_by(
                    format!("failed to read response body: {}", e),
                    e,
                ));
            }
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(TEXT_PLAIN)
            .to_string();

        let decoded = self
            .converters
            .reader_of(&content_type, expected)
            .and_then(|converter| {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    content_type = converter.content_type(),
                    expected = %expected,
                    "reading response body"
                );
                converter.read(expected, &mut source)
            });
        source.into_inner().close();

        match decoded {
            Ok(value) => EndpointResponse::success(status, headers, Some(value)),
            Err(error) => EndpointResponse::failure(error),
        }
    }
}

/// Best-effort text of an error body.
fn error_message(body: &mut ResponseBody) -> String {
    let mut bytes = Vec::new();
    if let Err(e) = body.read_to_end(&mut bytes) {
        #[cfg(feature = "tracing")]
        tracing::debug!("failed to read error body: {}", e);
    }
    body.close();
    String::from_utf8_lossy(&bytes).into_owned()
}
