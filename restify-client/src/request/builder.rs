//! Building requests from a contract and actual arguments.

use http::{HeaderMap, HeaderName, HeaderValue, Uri};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use restify_core::{
    EndpointMethod, EndpointMethodParameter, Error, ParameterRole, Result, TypeDescriptor,
};
use serde_json::Value;

use super::{EndpointRequest, RequestBody};
use crate::argument::Arguments;

/// Characters escaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a query name or value.
const QUERY_COMPONENT: &AsciiSet = &PATH_SEGMENT
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'\'')
    .add(b'|');

/// Builds an [`EndpointRequest`] per invocation.
///
/// - path placeholders are replaced by URL-encoded arguments
/// - query parameters are appended, nulls omitted and collections repeated
/// - header arguments override static headers
/// - the body is carried unencoded
#[derive(Clone, Copy, Debug, Default)]
pub struct EndpointRequestFactory;

impl EndpointRequestFactory {
    pub fn create(
        &self,
        method: &EndpointMethod,
        args: &Arguments,
        response_type: TypeDescriptor,
    ) -> Result<EndpointRequest> {
        let mut target = self.expand_path(method, args)?;

        let query = self.query_string(method, args);
        if !query.is_empty() {
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&query);
        }

        let uri: Uri = target.parse().map_err(|e| {
            Error::resolution(format!(
                "method [{}] resolved to an invalid URI [{}]: {}",
                method.name(),
                target,
                e
            ))
        })?;

        let headers = self.headers(method, args)?;

        let body = method.body_parameter().and_then(|parameter| {
            args.value(parameter.position())
                .map(|value| RequestBody::new(value.clone(), parameter.ty().clone()))
        });

        Ok(EndpointRequest::new(method.method().clone(), uri, response_type)
            .with_headers(headers)
            .with_body(body))
    }

    fn expand_path(&self, method: &EndpointMethod, args: &Arguments) -> Result<String> {
        let mut path = method.path().to_string();
        for parameter in method.parameters_of(ParameterRole::Path) {
            let value = args
                .value(parameter.position())
                .and_then(|value| string_form(parameter, value))
                .ok_or_else(|| {
                    Error::resolution(format!(
                        "path argument [{}] of method [{}] is missing",
                        parameter.name(),
                        method.name()
                    ))
                })?;
            let encoded = utf8_percent_encode(&value, PATH_SEGMENT).to_string();
            path = path.replace(&format!("{{{}}}", parameter.name()), &encoded);
        }
        Ok(path)
    }

    fn query_string(&self, method: &EndpointMethod, args: &Arguments) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();

        for parameter in method.parameters_of(ParameterRole::Query) {
            let Some(value) = args.value(parameter.position()) else {
                continue;
            };

            if let Some(serializer) = parameter.serializer() {
                if let Some(serialized) = serializer.serialize(parameter.name(), value) {
                    pairs.push((parameter.name().to_string(), serialized));
                }
                continue;
            }

            match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(item) = scalar_string(item) {
                            pairs.push((parameter.name().to_string(), item));
                        }
                    }
                }
                Value::Object(entries) => {
                    for (name, item) in entries {
                        if let Some(item) = scalar_string(item) {
                            pairs.push((name.clone(), item));
                        }
                    }
                }
                value => {
                    if let Some(value) = scalar_string(value) {
                        pairs.push((parameter.name().to_string(), value));
                    }
                }
            }
        }

        pairs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, QUERY_COMPONENT),
                    utf8_percent_encode(value, QUERY_COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    fn headers(&self, method: &EndpointMethod, args: &Arguments) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for header in method.headers().iter() {
            let value = match header.placeholder() {
                Some(placeholder) => {
                    match method.parameters().iter().find(|p| p.name() == placeholder) {
                        Some(parameter) => {
                            match args
                                .value(parameter.position())
                                .and_then(|value| string_form(parameter, value))
                            {
                                Some(value) => value,
                                None => continue,
                            }
                        }
                        None => header.value().to_string(),
                    }
                }
                None => header.value().to_string(),
            };
            headers.append(header_name(header.name())?, header_value(header.name(), &value)?);
        }

        for parameter in method.parameters_of(ParameterRole::Header) {
            let Some(value) = args.value(parameter.position()) else {
                continue;
            };
            let name = header_name(parameter.name())?;

            let values: Vec<String> = match (parameter.serializer(), value) {
                (None, Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
                _ => string_form(parameter, value).into_iter().collect(),
            };

            headers.remove(&name);
            for value in values {
                headers.append(name.clone(), header_value(parameter.name(), &value)?);
            }
        }

        Ok(headers)
    }
}

/// The string form of an argument, honouring a custom serializer.
fn string_form(parameter: &EndpointMethodParameter, value: &Value) -> Option<String> {
    match parameter.serializer() {
        Some(serializer) => serializer.serialize(parameter.name(), value),
        None => match value {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(scalar_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            value => scalar_string(value),
        },
    }
}

/// Strings without quotes, other scalars as JSON, objects as compact JSON.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::resolution(format!("invalid header name [{}]", name)))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::resolution(format!("invalid value for header [{}]", name)))
}
