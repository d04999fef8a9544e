//! Contract model: immutable description of one remote call.

use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::declaration::ApiDeclaration;
use crate::types::{TypeDescriptor, kinds};

/// Base endpoint plus the declaration being proxied.
#[derive(Clone, Debug)]
pub struct EndpointTarget {
    endpoint: Option<String>,
    api: ApiDeclaration,
}

impl EndpointTarget {
    pub fn new<S: Into<String>>(endpoint: S, api: ApiDeclaration) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            api,
        }
    }

    /// A target without a base endpoint; method paths must then be absolute URIs.
    pub fn without_endpoint(api: ApiDeclaration) -> Self {
        Self {
            endpoint: None,
            api,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn api(&self) -> &ApiDeclaration {
        &self.api
    }
}

/// Static header declared on a type or a method.
///
/// The value may be a `{param}` placeholder resolved from an argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointHeader {
    name: String,
    value: String,
}

impl EndpointHeader {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The parameter name when the value is a `{param}` placeholder.
    pub fn placeholder(&self) -> Option<&str> {
        self.value
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .filter(|name| !name.is_empty())
    }

    fn same_as(&self, other: &EndpointHeader) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.value == other.value
    }
}

/// Ordered set of static headers; duplicates are collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointHeaders {
    headers: Vec<EndpointHeader>,
}

impl EndpointHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header unless an identical one is already present.
    pub fn insert(&mut self, header: EndpointHeader) {
        if !self.headers.iter().any(|h| h.same_as(&header)) {
            self.headers.push(header);
        }
    }

    /// Headers named `name`, compared case-insensitively.
    pub fn get<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EndpointHeader> + 'a {
        self.headers
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
    }

    pub fn first<'a>(&'a self, name: &'a str) -> Option<&'a EndpointHeader> {
        self.get(name).next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointHeader> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl FromIterator<EndpointHeader> for EndpointHeaders {
    fn from_iter<I: IntoIterator<Item = EndpointHeader>>(iter: I) -> Self {
        let mut headers = EndpointHeaders::new();
        for header in iter {
            headers.insert(header);
        }
        headers
    }
}

/// Custom string form of a parameter argument.
///
/// Returning `None` omits the parameter from the request.
pub trait ParameterSerializer: Send + Sync {
    fn serialize(&self, name: &str, value: &Value) -> Option<String>;
}

impl<F> ParameterSerializer for F
where
    F: Fn(&str, &Value) -> Option<String> + Send + Sync,
{
    fn serialize(&self, name: &str, value: &Value) -> Option<String> {
        self(name, value)
    }
}

/// Which callback slot a callback parameter fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Success,
    Failure,
}

impl CallbackKind {
    pub fn of(ty: &TypeDescriptor) -> Self {
        if ty.is(kinds::FAILURE_CALLBACK) {
            CallbackKind::Failure
        } else {
            CallbackKind::Success
        }
    }
}

/// Role of a parameter in the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterRole {
    Path,
    Query,
    Header,
    Body,
    Callback(CallbackKind),
}

/// One parameter of an [`EndpointMethod`].
#[derive(Clone)]
pub struct EndpointMethodParameter {
    position: usize,
    name: String,
    ty: TypeDescriptor,
    role: ParameterRole,
    serializer: Option<Arc<dyn ParameterSerializer>>,
}

impl EndpointMethodParameter {
    pub fn new<S: Into<String>>(
        position: usize,
        name: S,
        ty: TypeDescriptor,
        role: ParameterRole,
        serializer: Option<Arc<dyn ParameterSerializer>>,
    ) -> Self {
        Self {
            position,
            name: name.into(),
            ty,
            role,
            serializer,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn role(&self) -> ParameterRole {
        self.role
    }

    pub fn serializer(&self) -> Option<&Arc<dyn ParameterSerializer>> {
        self.serializer.as_ref()
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.role, ParameterRole::Callback(_))
    }
}

impl fmt::Debug for EndpointMethodParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointMethodParameter")
            .field("position", &self.position)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("role", &self.role)
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

/// Contract model of one declared call. Built once and shared.
#[derive(Clone, Debug)]
pub struct EndpointMethod {
    name: String,
    path: String,
    method: Method,
    parameters: Vec<EndpointMethodParameter>,
    headers: EndpointHeaders,
    return_type: TypeDescriptor,
}

impl EndpointMethod {
    pub fn new<N: Into<String>, P: Into<String>>(
        name: N,
        path: P,
        method: Method,
        parameters: Vec<EndpointMethodParameter>,
        headers: EndpointHeaders,
        return_type: TypeDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method,
            parameters,
            headers,
            return_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path template, with `{name}` placeholders.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn parameters(&self) -> &[EndpointMethodParameter] {
        &self.parameters
    }

    pub fn parameter(&self, position: usize) -> Option<&EndpointMethodParameter> {
        self.parameters.get(position)
    }

    pub fn headers(&self) -> &EndpointHeaders {
        &self.headers
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    pub fn with_return_type(&self, return_type: TypeDescriptor) -> Self {
        Self {
            return_type,
            ..self.clone()
        }
    }

    pub fn parameters_of(
        &self,
        role: ParameterRole,
    ) -> impl Iterator<Item = &EndpointMethodParameter> {
        self.parameters.iter().filter(move |p| p.role == role)
    }

    pub fn body_parameter(&self) -> Option<&EndpointMethodParameter> {
        self.parameters_of(ParameterRole::Body).next()
    }

    pub fn callback(&self, kind: CallbackKind) -> Option<&EndpointMethodParameter> {
        self.parameters_of(ParameterRole::Callback(kind)).next()
    }

    pub fn has_callbacks(&self) -> bool {
        self.parameters.iter().any(|p| p.is_callback())
    }

    /// Names of the `{name}` placeholders of the path template, in order.
    pub fn path_placeholders(&self) -> Vec<&str> {
        placeholders(&self.path)
    }
}

pub(crate) fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_collapse_duplicates_and_keep_order() {
        let headers: EndpointHeaders = [
            EndpointHeader::new("Accept", "application/json"),
            EndpointHeader::new("X-Trace", "1"),
            EndpointHeader::new("accept", "application/json"),
            EndpointHeader::new("Accept", "text/plain"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.len(), 3);
        let accepts: Vec<_> = headers.get("ACCEPT").map(|h| h.value()).collect();
        assert_eq!(accepts, vec!["application/json", "text/plain"]);
        assert_eq!(headers.iter().next().unwrap().name(), "Accept");
    }

    #[test]
    fn test_header_placeholder() {
        assert_eq!(EndpointHeader::new("X-Token", "{token}").placeholder(), Some("token"));
        assert_eq!(EndpointHeader::new("X-Token", "token").placeholder(), None);
        assert_eq!(EndpointHeader::new("X-Token", "{}").placeholder(), None);
    }

    #[test]
    fn test_path_placeholders() {
        assert_eq!(placeholders("/users/{id}/posts/{post}"), vec!["id", "post"]);
        assert!(placeholders("/users").is_empty());
        assert!(placeholders("/users/{broken").is_empty());
    }

    #[test]
    fn test_closure_serializer() {
        let serializer = |_: &str, value: &Value| value.as_array().map(|a| a.len().to_string());
        assert_eq!(serializer.serialize("ids", &json!([1, 2])), Some("2".to_string()));
    }

    #[test]
    fn test_callback_kind_of_type() {
        let failure = TypeDescriptor::named(kinds::FAILURE_CALLBACK);
        let success = TypeDescriptor::parameterized(kinds::SUCCESS_CALLBACK, [TypeDescriptor::string()]);
        assert_eq!(CallbackKind::of(&failure), CallbackKind::Failure);
        assert_eq!(CallbackKind::of(&success), CallbackKind::Success);
    }
}
