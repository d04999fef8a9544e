//! Builder API used to declare a remote API.
//!
//! A declaration is the interface-shaped description a proxy is generated from:
//! type-level path segments and headers, and one [`MethodDeclaration`] per call.
//!
//! ```
//! use restify_core::{ApiDeclaration, MethodDeclaration, ParameterDeclaration};
//!
//! let api = ApiDeclaration::new("UserApi")
//!     .path("/users/")
//!     .header("Accept", "application/json")
//!     .method(
//!         MethodDeclaration::get("find", "{id}")
//!             .param(ParameterDeclaration::new("id", "u64").path())
//!             .returns("Optional<User>"),
//!     );
//! assert_eq!(api.methods().len(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::contract::{EndpointHeader, ParameterSerializer};
use crate::error::Result;
use crate::types::TypeDescriptor;

/// A type as written in a declaration, either already built or still textual.
///
/// Textual types are parsed when the contract is read, so a malformed type
/// surfaces as a configuration error at proxy build time.
#[derive(Clone, Debug, PartialEq)]
pub enum DeclaredType {
    Resolved(TypeDescriptor),
    Text(String),
}

impl DeclaredType {
    pub fn descriptor(&self) -> Result<TypeDescriptor> {
        match self {
            DeclaredType::Resolved(ty) => Ok(ty.clone()),
            DeclaredType::Text(text) => TypeDescriptor::parse(text),
        }
    }
}

impl From<TypeDescriptor> for DeclaredType {
    fn from(ty: TypeDescriptor) -> Self {
        DeclaredType::Resolved(ty)
    }
}

impl From<&str> for DeclaredType {
    fn from(text: &str) -> Self {
        DeclaredType::Text(text.to_string())
    }
}

impl From<String> for DeclaredType {
    fn from(text: String) -> Self {
        DeclaredType::Text(text)
    }
}

/// Interface-level declaration.
#[derive(Clone, Debug)]
pub struct ApiDeclaration {
    name: String,
    paths: Vec<String>,
    headers: Vec<EndpointHeader>,
    bindings: BTreeMap<String, DeclaredType>,
    methods: Vec<MethodDeclaration>,
}

impl ApiDeclaration {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            headers: Vec::new(),
            bindings: BTreeMap::new(),
            methods: Vec::new(),
        }
    }

    /// Add a type-level path segment. Segments are concatenated in order.
    pub fn path<S: Into<String>>(mut self, segment: S) -> Self {
        self.paths.push(segment.into());
        self
    }

    /// Add a static header sent by every method.
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push(EndpointHeader::new(name, value));
        self
    }

    /// Bind a type variable used in method signatures, e.g. `T` to `User`.
    pub fn bind<S: Into<String>, T: Into<DeclaredType>>(mut self, variable: S, ty: T) -> Self {
        self.bindings.insert(variable.into(), ty.into());
        self
    }

    pub fn method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn headers(&self) -> &[EndpointHeader] {
        &self.headers
    }

    pub fn bindings(&self) -> &BTreeMap<String, DeclaredType> {
        &self.bindings
    }

    pub fn methods(&self) -> &[MethodDeclaration] {
        &self.methods
    }
}

/// Declaration of a single remote call.
#[derive(Clone, Debug)]
pub struct MethodDeclaration {
    name: String,
    verb: String,
    path: String,
    headers: Vec<EndpointHeader>,
    parameters: Vec<ParameterDeclaration>,
    return_type: DeclaredType,
    asynchronous: bool,
}

impl MethodDeclaration {
    /// A method using `verb`. The verb is validated when the contract is read.
    pub fn new<N, V, P>(name: N, verb: V, path: P) -> Self
    where
        N: Into<String>,
        V: Into<String>,
        P: Into<String>,
    {
        Self {
            name: name.into(),
            verb: verb.into(),
            path: path.into(),
            headers: Vec::new(),
            parameters: Vec::new(),
            return_type: DeclaredType::Resolved(TypeDescriptor::Void),
            asynchronous: false,
        }
    }

    pub fn get<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        Self::new(name, "GET", path)
    }

    pub fn post<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        Self::new(name, "POST", path)
    }

    pub fn put<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        Self::new(name, "PUT", path)
    }

    pub fn patch<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        Self::new(name, "PATCH", path)
    }

    pub fn delete<N: Into<String>, P: Into<String>>(name: N, path: P) -> Self {
        Self::new(name, "DELETE", path)
    }

    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push(EndpointHeader::new(name, value));
        self
    }

    pub fn param(mut self, parameter: ParameterDeclaration) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns<T: Into<DeclaredType>>(mut self, ty: T) -> Self {
        self.return_type = ty.into();
        self
    }

    /// Mark the method as asynchronous-capable: unmarked parameters become callbacks.
    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn path_value(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[EndpointHeader] {
        &self.headers
    }

    pub fn parameters(&self) -> &[ParameterDeclaration] {
        &self.parameters
    }

    pub fn return_type(&self) -> &DeclaredType {
        &self.return_type
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }
}

/// Role marker attached to a parameter. An optional name overrides the parameter name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterMarker {
    Path(Option<String>),
    Header(Option<String>),
    Body,
    Query(Option<String>),
}

/// Declaration of a single parameter.
#[derive(Clone)]
pub struct ParameterDeclaration {
    name: String,
    ty: DeclaredType,
    markers: Vec<ParameterMarker>,
    serializer: Option<Arc<dyn ParameterSerializer>>,
}

impl ParameterDeclaration {
    pub fn new<N: Into<String>, T: Into<DeclaredType>>(name: N, ty: T) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            markers: Vec::new(),
            serializer: None,
        }
    }

    pub fn path(self) -> Self {
        self.marker(ParameterMarker::Path(None))
    }

    pub fn path_named<S: Into<String>>(self, name: S) -> Self {
        self.marker(ParameterMarker::Path(Some(name.into())))
    }

    pub fn header(self) -> Self {
        self.marker(ParameterMarker::Header(None))
    }

    pub fn header_named<S: Into<String>>(self, name: S) -> Self {
        self.marker(ParameterMarker::Header(Some(name.into())))
    }

    pub fn body(self) -> Self {
        self.marker(ParameterMarker::Body)
    }

    pub fn query(self) -> Self {
        self.marker(ParameterMarker::Query(None))
    }

    pub fn query_named<S: Into<String>>(self, name: S) -> Self {
        self.marker(ParameterMarker::Query(Some(name.into())))
    }

    pub fn marker(mut self, marker: ParameterMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Replace the default string form of this parameter's argument.
    pub fn serializer<S: ParameterSerializer + 'static>(mut self, serializer: S) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &DeclaredType {
        &self.ty
    }

    pub fn markers(&self) -> &[ParameterMarker] {
        &self.markers
    }

    pub fn custom_serializer(&self) -> Option<&Arc<dyn ParameterSerializer>> {
        self.serializer.as_ref()
    }
}

impl fmt::Debug for ParameterDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDeclaration")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("markers", &self.markers)
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}
