//! Encoding request bodies into transport messages.

use std::sync::Arc;

use bytes::Bytes;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use restify_core::{Error, MessageConverters, Result};

use super::EndpointRequest;
use crate::transport::HttpRequestMessage;

/// Writes the body of an [`EndpointRequest`] with the converter matching its
/// final content type.
///
/// When the request carries no `Content-Type`, the first registered writer
/// accepting the body type is used and its content type is set on the message.
#[derive(Clone, Debug)]
pub struct RequestWriter {
    converters: Arc<MessageConverters>,
}

impl RequestWriter {
    pub fn new(converters: Arc<MessageConverters>) -> Self {
        Self { converters }
    }

    pub fn write(&self, request: EndpointRequest) -> Result<HttpRequestMessage> {
        let (method, uri, mut headers, body, metadata) = request.into_parts();

        let body = match body {
            None => None,
            Some(body) => {
                let ty = body.write_type();
                let declared = headers
                    .get(CONTENT_TYPE)
                    .map(|value| {
                        value.to_str().map(str::to_string).map_err(|_| {
                            Error::resolution("Content-Type header is not valid text")
                        })
                    })
                    .transpose()?;

                let writer = match declared {
                    Some(content_type) => self.converters.writer_of(&content_type, &ty)?,
                    None => {
                        let writer = self.converters.any_writer_of(&ty)?;
                        let content_type = HeaderValue::from_str(writer.content_type())
                            .map_err(|_| {
                                Error::resolution(format!(
                                    "converter content type [{}] is not a valid header",
                                    writer.content_type()
                                ))
                            })?;
                        headers.insert(CONTENT_TYPE, content_type);
                        writer
                    }
                };

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    content_type = writer.content_type(),
                    body_type = %ty,
                    "writing request body"
                );

                let mut buffer = Vec::new();
                writer.write(body.value(), &mut buffer)?;
                Some(Bytes::from(buffer))
            }
        };

        Ok(HttpRequestMessage {
            method,
            uri,
            headers,
            body,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestBody;
    use http::{Method, Uri};
    use restify_core::TypeDescriptor;
    use serde_json::json;

    fn writer() -> RequestWriter {
        RequestWriter::new(Arc::new(MessageConverters::defaults()))
    }

    fn request(body: Option<RequestBody>) -> EndpointRequest {
        EndpointRequest::new(
            Method::POST,
            Uri::from_static("http://localhost/users"),
            TypeDescriptor::Void,
        )
        .with_body(body)
    }

    #[test]
    fn test_default_content_type_is_first_accepting_writer() {
        let message = writer()
            .write(request(Some(RequestBody::new(
                json!({"id": 42, "name": "Ann"}),
                TypeDescriptor::named("User"),
            ))))
            .unwrap();

        assert_eq!(message.headers[CONTENT_TYPE], "application/json");
        let written: serde_json::Value =
            serde_json::from_slice(message.body.as_ref().unwrap()).unwrap();
        assert_eq!(written, json!({"id": 42, "name": "Ann"}));
    }

    #[test]
    fn test_string_body_defaults_to_text_plain() {
        let message = writer()
            .write(request(Some(RequestBody::new(json!("hello"), TypeDescriptor::Any))))
            .unwrap();
        assert_eq!(message.headers[CONTENT_TYPE], "text/plain");
        assert_eq!(message.body.unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_declared_content_type_is_honoured() {
        let request = request(Some(RequestBody::new(
            json!({"name": "Ann"}),
            TypeDescriptor::named("User"),
        )))
        .with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let message = writer().write(request).unwrap();
        assert_eq!(message.body.unwrap(), Bytes::from_static(b"name=Ann"));
    }

    #[test]
    fn test_unknown_content_type_fails_fast() {
        let request = request(Some(RequestBody::new(json!({}), TypeDescriptor::named("User"))))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        assert!(writer().write(request).unwrap_err().is_resolution());
    }

    #[test]
    fn test_no_body() {
        let message = writer().write(request(None)).unwrap();
        assert!(message.body.is_none());
        assert!(message.headers.get(CONTENT_TYPE).is_none());
    }
}
