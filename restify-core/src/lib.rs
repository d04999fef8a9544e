//! Core types for restify.
//!
//! This crate holds everything that does not depend on a transport:
//!
//! ## Modules
//!
//! - [`error`]: Error kinds shared by the whole call pipeline
//! - [`types`]: Semantic type descriptors and their textual parser
//! - [`declaration`]: Builder API for declaring a remote API
//! - [`contract`]: Contract model of a declared call
//! - [`reader`]: Reading declarations into contract models
//! - [`converter`]: Message converter SPI, registry and built-in converters
//! - [`encoding`]: `Content-Encoding` decoding of response bodies

pub mod contract;
pub mod converter;
pub mod declaration;
pub mod encoding;
pub mod error;
pub mod reader;
pub mod types;

pub use contract::{
    CallbackKind, EndpointHeader, EndpointHeaders, EndpointMethod, EndpointMethodParameter,
    EndpointTarget, ParameterRole, ParameterSerializer,
};
pub use converter::{
    FormUrlEncodedMessageConverter, JsonMessageConverter, MessageConverter, MessageConverters,
    TextPlainMessageConverter,
};
pub use declaration::{
    ApiDeclaration, DeclaredType, MethodDeclaration, ParameterDeclaration, ParameterMarker,
};
pub use encoding::ContentEncoding;
pub use error::{Cause, Error, ErrorKind, Result};
pub use reader::{ContractReader, DefaultContractReader};
pub use types::{Primitive, TypeDescriptor, kinds};
