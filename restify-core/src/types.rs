//! Semantic type descriptors.
//!
//! A [`TypeDescriptor`] is the explicit stand-in for a declared Rust/remote type:
//! a primitive, a named type, or a parameterized type with ordered arguments.
//! It is built once when a contract is read and then passed through every layer,
//! so converters and call handlers never have to rediscover the shape of a type.
//!
//! ```
//! use restify_core::TypeDescriptor;
//!
//! let ty = TypeDescriptor::parse("Optional<Vec<User>>").unwrap();
//! assert!(ty.is(restify_core::kinds::OPTIONAL));
//! assert_eq!(ty.to_string(), "Optional<Vec<User>>");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

/// Raw names of the parameterized shapes the engine knows about.
pub mod kinds {
    pub const OPTIONAL: &str = "Optional";
    pub const COLLECTION: &str = "Vec";
    pub const ITERATOR: &str = "Iterator";
    pub const QUEUE: &str = "Queue";
    pub const MAP: &str = "Map";
    pub const FUTURE: &str = "Future";
    pub const STREAM: &str = "Stream";
    pub const RESPONSE: &str = "EndpointResponse";
    pub const HEADERS: &str = "Headers";
    pub const STATUS_CODE: &str = "StatusCode";
    pub const SUCCESS_CALLBACK: &str = "SuccessCallback";
    pub const FAILURE_CALLBACK: &str = "FailureCallback";
}

/// Scalar types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    String,
}

impl Primitive {
    fn as_str(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::String => "String",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" | "boolean" => Some(Primitive::Bool),
            "int" | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "usize"
            | "isize" | "long" => Some(Primitive::Int),
            "float" | "f32" | "f64" | "double" => Some(Primitive::Float),
            "String" | "string" | "str" => Some(Primitive::String),
            _ => None,
        }
    }
}

/// Explicit description of a declared type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// No value (`()` / `void`).
    Void,
    /// Any value; the shape is only known at runtime.
    Any,
    /// A scalar.
    Primitive(Primitive),
    /// A named, non-generic type such as `User`.
    Named(String),
    /// A generic type applied to arguments, such as `Optional<User>`.
    Parameterized {
        raw: String,
        args: Vec<TypeDescriptor>,
    },
    /// An unbound type variable such as `T`, resolved against generic bindings.
    Variable(String),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        TypeDescriptor::Primitive(Primitive::String)
    }

    pub fn int() -> Self {
        TypeDescriptor::Primitive(Primitive::Int)
    }

    pub fn float() -> Self {
        TypeDescriptor::Primitive(Primitive::Float)
    }

    pub fn bool() -> Self {
        TypeDescriptor::Primitive(Primitive::Bool)
    }

    pub fn named<S: Into<String>>(name: S) -> Self {
        TypeDescriptor::Named(name.into())
    }

    pub fn variable<S: Into<String>>(name: S) -> Self {
        TypeDescriptor::Variable(name.into())
    }

    /// A parameterized type, e.g. `parameterized("Optional", [named("User")])`.
    pub fn parameterized<S, I>(raw: S, args: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = TypeDescriptor>,
    {
        TypeDescriptor::Parameterized {
            raw: raw.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::parameterized(kinds::OPTIONAL, [inner])
    }

    pub fn collection(inner: TypeDescriptor) -> Self {
        Self::parameterized(kinds::COLLECTION, [inner])
    }

    pub fn future(inner: TypeDescriptor) -> Self {
        Self::parameterized(kinds::FUTURE, [inner])
    }

    /// Parse a textual descriptor such as `Future<Optional<User>>`.
    ///
    /// Scalars map to [`Primitive`], `()`/`void` to [`TypeDescriptor::Void`], `Any`/`Object`
    /// to [`TypeDescriptor::Any`] and single upper-case letters to type variables.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            input,
            position: 0,
        };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.position != input.len() {
            return Err(Error::configuration(format!(
                "unexpected trailing input in type descriptor [{}] at offset {}",
                input, parser.position
            )));
        }
        Ok(ty)
    }

    /// The raw name of this type (`Optional` for `Optional<User>`).
    pub fn raw_name(&self) -> &str {
        match self {
            TypeDescriptor::Void => "()",
            TypeDescriptor::Any => "Any",
            TypeDescriptor::Primitive(p) => p.as_str(),
            TypeDescriptor::Named(name) => name,
            TypeDescriptor::Parameterized { raw, .. } => raw,
            TypeDescriptor::Variable(name) => name,
        }
    }

    /// Whether the raw name of this type is `raw`, parameterized or not.
    pub fn is(&self, raw: &str) -> bool {
        match self {
            TypeDescriptor::Named(name) => name == raw,
            TypeDescriptor::Parameterized { raw: r, .. } => r == raw,
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Void)
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, TypeDescriptor::Parameterized { .. })
    }

    /// Type arguments, empty for non-parameterized types.
    pub fn arguments(&self) -> &[TypeDescriptor] {
        match self {
            TypeDescriptor::Parameterized { args, .. } => args,
            _ => &[],
        }
    }

    /// The type argument at `index`, or [`TypeDescriptor::Any`] when the type is raw.
    pub fn argument_or_any(&self, index: usize) -> TypeDescriptor {
        self.arguments()
            .get(index)
            .cloned()
            .unwrap_or(TypeDescriptor::Any)
    }

    /// Substitute bound type variables.
    ///
    /// Unbound variables are left in place.
    pub fn resolve(&self, bindings: &BTreeMap<String, TypeDescriptor>) -> TypeDescriptor {
        match self {
            TypeDescriptor::Variable(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeDescriptor::Parameterized { raw, args } => TypeDescriptor::Parameterized {
                raw: raw.clone(),
                args: args.iter().map(|a| a.resolve(bindings)).collect(),
            },
            other => other.clone(),
        }
    }

    /// The runtime shape of a dynamic value.
    pub fn of_value(value: &Value) -> TypeDescriptor {
        match value {
            Value::Null => TypeDescriptor::Void,
            Value::Bool(_) => TypeDescriptor::bool(),
            Value::Number(n) if n.is_f64() => TypeDescriptor::float(),
            Value::Number(_) => TypeDescriptor::int(),
            Value::String(_) => TypeDescriptor::string(),
            Value::Array(_) => TypeDescriptor::collection(TypeDescriptor::Any),
            Value::Object(_) => {
                TypeDescriptor::parameterized(kinds::MAP, [TypeDescriptor::string(), TypeDescriptor::Any])
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Parameterized { raw, args } => {
                write!(f, "{}<", raw)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            other => f.write_str(other.raw_name()),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.position += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.position += c.len_utf8();
                Ok(())
            }
            found => Err(Error::configuration(format!(
                "expected '{}' in type descriptor [{}] at offset {}, found {:?}",
                expected, self.input, self.position, found
            ))),
        }
    }

    fn parse_identifier(&mut self) -> Result<&str> {
        self.skip_whitespace();
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == ':' || c == '.' {
                self.position += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.position {
            return Err(Error::configuration(format!(
                "expected a type name in [{}] at offset {}",
                self.input, start
            )));
        }
        Ok(&self.input[start..self.position])
    }

    fn parse_type(&mut self) -> Result<TypeDescriptor> {
        self.skip_whitespace();
        if self.input[self.position..].starts_with("()") {
            self.position += 2;
            return Ok(TypeDescriptor::Void);
        }

        let name = self.parse_identifier()?.to_string();
        self.skip_whitespace();

        if self.peek() == Some('<') {
            self.position += 1;
            let mut args = vec![self.parse_type()?];
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => {
                        self.position += 1;
                        args.push(self.parse_type()?);
                    }
                    _ => break,
                }
            }
            self.expect('>')?;
            return Ok(TypeDescriptor::Parameterized { raw: name, args });
        }

        if let Some(primitive) = Primitive::from_name(&name) {
            return Ok(TypeDescriptor::Primitive(primitive));
        }

        Ok(match name.as_str() {
            "void" | "Void" => TypeDescriptor::Void,
            "Any" | "Object" => TypeDescriptor::Any,
            n if n.len() == 1 && n.chars().all(|c| c.is_ascii_uppercase()) => {
                TypeDescriptor::Variable(name)
            }
            _ => TypeDescriptor::Named(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_named_and_primitive() {
        assert_eq!(TypeDescriptor::parse("User").unwrap(), TypeDescriptor::named("User"));
        assert_eq!(TypeDescriptor::parse("String").unwrap(), TypeDescriptor::string());
        assert_eq!(TypeDescriptor::parse("u64").unwrap(), TypeDescriptor::int());
        assert_eq!(TypeDescriptor::parse("()").unwrap(), TypeDescriptor::Void);
        assert_eq!(TypeDescriptor::parse("Object").unwrap(), TypeDescriptor::Any);
        assert_eq!(TypeDescriptor::parse("T").unwrap(), TypeDescriptor::variable("T"));
    }

    #[test]
    fn test_parse_nested_parameterized() {
        let ty = TypeDescriptor::parse("Future< Optional<Map<String, User>> >").unwrap();
        assert!(ty.is(kinds::FUTURE));

        let optional = &ty.arguments()[0];
        assert!(optional.is(kinds::OPTIONAL));

        let map = &optional.arguments()[0];
        assert_eq!(
            map,
            &TypeDescriptor::parameterized(
                kinds::MAP,
                [TypeDescriptor::string(), TypeDescriptor::named("User")]
            )
        );
        assert_eq!(ty.to_string(), "Future<Optional<Map<String, User>>>");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TypeDescriptor::parse("Optional<User").is_err());
        assert!(TypeDescriptor::parse("Optional<>").is_err());
        assert!(TypeDescriptor::parse("User>").is_err());
        assert!(TypeDescriptor::parse("").is_err());
    }

    #[test]
    fn test_argument_or_any_for_raw_type() {
        let raw = TypeDescriptor::named(kinds::OPTIONAL);
        assert!(raw.is(kinds::OPTIONAL));
        assert_eq!(raw.argument_or_any(0), TypeDescriptor::Any);

        let parameterized = TypeDescriptor::optional(TypeDescriptor::string());
        assert_eq!(parameterized.argument_or_any(0), TypeDescriptor::string());
    }

    #[test]
    fn test_resolve_generic_bindings() {
        let declared = TypeDescriptor::parse("Optional<T>").unwrap();
        let mut bindings = BTreeMap::new();
        bindings.insert("T".to_string(), TypeDescriptor::named("User"));

        assert_eq!(
            declared.resolve(&bindings),
            TypeDescriptor::optional(TypeDescriptor::named("User"))
        );

        let unbound = TypeDescriptor::variable("R");
        assert_eq!(unbound.resolve(&bindings), unbound);
    }

    #[test]
    fn test_of_value() {
        assert_eq!(TypeDescriptor::of_value(&json!("a")), TypeDescriptor::string());
        assert_eq!(TypeDescriptor::of_value(&json!(1)), TypeDescriptor::int());
        assert_eq!(TypeDescriptor::of_value(&json!(1.5)), TypeDescriptor::float());
        assert!(TypeDescriptor::of_value(&json!([1])).is(kinds::COLLECTION));
        assert!(TypeDescriptor::of_value(&json!({"a": 1})).is(kinds::MAP));
        assert!(TypeDescriptor::of_value(&Value::Null).is_void());
    }
}
