//! Reading declarations into contract models.

use std::collections::BTreeMap;

use http::Method;

use crate::contract::{
    CallbackKind, EndpointHeaders, EndpointMethod, EndpointMethodParameter, EndpointTarget,
    ParameterRole, placeholders,
};
use crate::declaration::{MethodDeclaration, ParameterDeclaration, ParameterMarker};
use crate::error::{Error, Result};
use crate::types::TypeDescriptor;

/// Turns a method declaration into an [`EndpointMethod`].
pub trait ContractReader: Send + Sync {
    fn read(&self, target: &EndpointTarget, method: &MethodDeclaration) -> Result<EndpointMethod>;

    /// Read every method of the target's declaration, in declaration order.
    fn read_all(&self, target: &EndpointTarget) -> Result<Vec<EndpointMethod>> {
        target
            .api()
            .methods()
            .iter()
            .map(|method| self.read(target, method))
            .collect()
    }
}

/// The default reader.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultContractReader;

impl ContractReader for DefaultContractReader {
    fn read(&self, target: &EndpointTarget, method: &MethodDeclaration) -> Result<EndpointMethod> {
        let api = target.api();
        let bindings = bindings_of(target)?;

        let path = format!(
            "{}{}{}",
            target
                .endpoint()
                .map(|endpoint| endpoint.strip_suffix('/').unwrap_or(endpoint))
                .unwrap_or(""),
            type_path(api.paths()),
            method_path(method.path_value())
        );

        let verb = method.verb().to_ascii_uppercase();
        let http_method = Method::from_bytes(verb.as_bytes()).map_err(|_| {
            Error::configuration(format!(
                "method [{}] declares an invalid HTTP verb [{}]",
                method.name(),
                method.verb()
            ))
        })?;

        let return_type = method
            .return_type()
            .descriptor()
            .map_err(|e| in_method(method, e))?
            .resolve(&bindings);

        let asynchronous = method.is_asynchronous() || return_type.is_void();
        let parameters = read_parameters(method, &bindings, asynchronous)?;

        for placeholder in placeholders(&path) {
            let bound = parameters
                .iter()
                .any(|p| p.role() == ParameterRole::Path && p.name() == placeholder);
            if !bound {
                return Err(Error::configuration(format!(
                    "path placeholder {{{}}} of method [{}] has no path parameter",
                    placeholder,
                    method.name()
                )));
            }
        }

        let headers: EndpointHeaders = api
            .headers()
            .iter()
            .chain(method.headers())
            .cloned()
            .collect();

        tracing::debug!(
            method = method.name(),
            http.method = %http_method,
            path = %path,
            return_type = %return_type,
            "read endpoint method"
        );

        Ok(EndpointMethod::new(
            method.name(),
            path,
            http_method,
            parameters,
            headers,
            return_type,
        ))
    }
}

fn bindings_of(target: &EndpointTarget) -> Result<BTreeMap<String, TypeDescriptor>> {
    target
        .api()
        .bindings()
        .iter()
        .map(|(name, ty)| Ok((name.clone(), ty.descriptor()?)))
        .collect()
}

/// Each segment contributes exactly one leading slash and no trailing one.
fn type_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| segment.trim_end_matches('/'))
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.contains("://") {
                segment.to_string()
            } else {
                format!("/{}", segment.trim_start_matches('/'))
            }
        })
        .collect()
}

fn method_path(path: &str) -> String {
    if path.starts_with('/') || path.contains("://") {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn in_method(method: &MethodDeclaration, err: Error) -> Error {
    Error::configuration(format!("method [{}]: {}", method.name(), err.message()))
}

fn read_parameters(
    method: &MethodDeclaration,
    bindings: &BTreeMap<String, TypeDescriptor>,
    asynchronous: bool,
) -> Result<Vec<EndpointMethodParameter>> {
    let mut parameters: Vec<EndpointMethodParameter> = Vec::new();

    for (position, declaration) in method.parameters().iter().enumerate() {
        let ty = declaration
            .ty()
            .descriptor()
            .map_err(|e| in_method(method, e))?
            .resolve(bindings);

        let (role, name) = role_of(method, declaration, &ty, asynchronous)?;

        match role {
            ParameterRole::Body if parameters.iter().any(|p| p.role() == ParameterRole::Body) => {
                return Err(Error::configuration(format!(
                    "method [{}] declares more than one body parameter",
                    method.name()
                )));
            }
            ParameterRole::Callback(kind) if parameters.iter().any(|p| p.role() == role) => {
                return Err(Error::configuration(format!(
                    "method [{}] declares more than one {:?} callback parameter",
                    method.name(),
                    kind
                )));
            }
            _ => {}
        }

        parameters.push(EndpointMethodParameter::new(
            position,
            name,
            ty,
            role,
            declaration.custom_serializer().cloned(),
        ));
    }

    Ok(parameters)
}

fn role_of(
    method: &MethodDeclaration,
    declaration: &ParameterDeclaration,
    ty: &TypeDescriptor,
    asynchronous: bool,
) -> Result<(ParameterRole, String)> {
    let markers = declaration.markers();
    let named = |name: &Option<String>| {
        name.clone()
            .unwrap_or_else(|| declaration.name().to_string())
    };

    let path = markers.iter().find_map(|m| match m {
        ParameterMarker::Path(name) => Some(named(name)),
        _ => None,
    });
    if let Some(name) = path {
        return Ok((ParameterRole::Path, name));
    }

    let header = markers.iter().find_map(|m| match m {
        ParameterMarker::Header(name) => Some(named(name)),
        _ => None,
    });
    if let Some(name) = header {
        return Ok((ParameterRole::Header, name));
    }

    if markers.contains(&ParameterMarker::Body) {
        return Ok((ParameterRole::Body, declaration.name().to_string()));
    }

    let query = markers.iter().find_map(|m| match m {
        ParameterMarker::Query(name) => Some(named(name)),
        _ => None,
    });
    if let Some(name) = query {
        return Ok((ParameterRole::Query, name));
    }

    if asynchronous {
        return Ok((
            ParameterRole::Callback(CallbackKind::of(ty)),
            declaration.name().to_string(),
        ));
    }

    Err(Error::configuration(format!(
        "parameter [{}] of method [{}] has no role and the method is not asynchronous",
        declaration.name(),
        method.name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{ApiDeclaration, ParameterDeclaration};
    use crate::types::kinds;

    fn read(endpoint: &str, api: ApiDeclaration) -> Result<EndpointMethod> {
        let target = EndpointTarget::new(endpoint, api);
        let method = target.api().methods()[0].clone();
        DefaultContractReader.read(&target, &method)
    }

    #[test]
    fn test_path_concatenation_ignores_slashes() {
        let shapes = [
            ("http://api", "/users/", "/{id}"),
            ("http://api", "/users", "{id}"),
            ("http://api", "/users/", "{id}"),
            ("http://api", "/users", "/{id}"),
            ("http://api/", "/users/", "{id}"),
            ("http://api", "users", "{id}"),
            ("http://api", "users/", "/{id}"),
            ("http://api/", "users", "{id}"),
        ];
        for (endpoint, type_path, method_path) in shapes {
            let api = ApiDeclaration::new("Api").path(type_path).method(
                MethodDeclaration::get("find", method_path)
                    .param(ParameterDeclaration::new("id", "u64").path())
                    .returns("User"),
            );
            let method = read(endpoint, api).unwrap();
            assert_eq!(method.path(), "http://api/users/{id}");
        }
    }

    #[test]
    fn test_multiple_type_segments() {
        let api = ApiDeclaration::new("Api")
            .path("/v1/")
            .path("/users/")
            .method(MethodDeclaration::get("all", "").returns("Vec<User>"));
        let method = read("", api).unwrap();
        assert_eq!(method.path(), "/v1/users/");

        let api = ApiDeclaration::new("Api")
            .path("v1")
            .path("users/")
            .method(MethodDeclaration::get("all", "").returns("Vec<User>"));
        assert_eq!(read("", api).unwrap().path(), "/v1/users/");
    }

    #[test]
    fn test_verb_is_uppercased() {
        let api = ApiDeclaration::new("Api").method(MethodDeclaration::new("x", "patch", "/x"));
        assert_eq!(read("", api).unwrap().method(), &Method::PATCH);

        let api = ApiDeclaration::new("Api").method(MethodDeclaration::new("x", "not a verb", "/x"));
        assert!(read("", api).unwrap_err().is_configuration());
    }

    #[test]
    fn test_role_priority() {
        let api = ApiDeclaration::new("Api").method(
            MethodDeclaration::post("save", "/{id}")
                .param(ParameterDeclaration::new("id", "u64").query().path())
                .param(ParameterDeclaration::new("token", "String").query().header_named("X-Token"))
                .param(ParameterDeclaration::new("user", "User").query().body())
                .param(ParameterDeclaration::new("page", "u32").query())
                .returns("User"),
        );
        let method = read("http://api", api).unwrap();
        let roles: Vec<_> = method.parameters().iter().map(|p| p.role()).collect();
        assert_eq!(
            roles,
            vec![
                ParameterRole::Path,
                ParameterRole::Header,
                ParameterRole::Body,
                ParameterRole::Query
            ]
        );
        assert_eq!(method.parameters()[1].name(), "X-Token");
        assert_eq!(method.body_parameter().unwrap().position(), 2);
    }

    #[test]
    fn test_duplicate_body_is_rejected() {
        let api = ApiDeclaration::new("Api").method(
            MethodDeclaration::post("save", "/")
                .param(ParameterDeclaration::new("a", "User").body())
                .param(ParameterDeclaration::new("b", "User").body()),
        );
        assert!(read("", api).unwrap_err().is_configuration());
    }

    #[test]
    fn test_callbacks_on_asynchronous_methods() {
        let api = ApiDeclaration::new("Api").method(
            MethodDeclaration::get("find", "/")
                .param(ParameterDeclaration::new("ok", "SuccessCallback<User>"))
                .param(ParameterDeclaration::new("err", kinds::FAILURE_CALLBACK)),
        );
        let method = read("", api).unwrap();
        assert!(method.callback(CallbackKind::Success).is_some());
        assert!(method.callback(CallbackKind::Failure).is_some());

        let api = ApiDeclaration::new("Api").method(
            MethodDeclaration::get("find", "/")
                .param(ParameterDeclaration::new("a", "SuccessCallback<User>"))
                .param(ParameterDeclaration::new("b", "SuccessCallback<User>")),
        );
        assert!(read("", api).unwrap_err().is_configuration());
    }

    #[test]
    fn test_unmarked_parameter_on_synchronous_method() {
        let api = ApiDeclaration::new("Api").method(
            MethodDeclaration::get("find", "/")
                .param(ParameterDeclaration::new("id", "u64"))
                .returns("User"),
        );
        assert!(read("", api).unwrap_err().is_configuration());

        let api = ApiDeclaration::new("Api").method(
            MethodDeclaration::get("find", "/")
                .asynchronous()
                .param(ParameterDeclaration::new("cb", "SuccessCallback<User>"))
                .returns("User"),
        );
        assert!(read("", api).is_ok());
    }

    #[test]
    fn test_unbound_placeholder_is_rejected() {
        let api = ApiDeclaration::new("Api")
            .method(MethodDeclaration::get("find", "/{id}").returns("User"));
        assert!(read("", api).unwrap_err().is_configuration());
    }

    #[test]
    fn test_headers_are_merged() {
        let api = ApiDeclaration::new("Api")
            .header("Accept", "application/json")
            .method(
                MethodDeclaration::get("find", "/")
                    .header("Accept", "application/json")
                    .header("X-Api", "1")
                    .returns("User"),
            );
        let method = read("", api).unwrap();
        let names: Vec<_> = method.headers().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["Accept", "X-Api"]);
    }

    #[test]
    fn test_generic_bindings_are_resolved() {
        let api = ApiDeclaration::new("Api").bind("T", "User").method(
            MethodDeclaration::post("save", "/")
                .param(ParameterDeclaration::new("entity", "T").body())
                .returns("Optional<T>"),
        );
        let method = read("", api).unwrap();
        assert_eq!(
            method.return_type(),
            &TypeDescriptor::optional(TypeDescriptor::named("User"))
        );
        assert_eq!(method.parameters()[0].ty(), &TypeDescriptor::named("User"));
    }

    #[test]
    fn test_malformed_return_type() {
        let api = ApiDeclaration::new("Api")
            .method(MethodDeclaration::get("find", "/").returns("Optional<User"));
        let err = read("", api).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message().contains("find"));
    }
}
