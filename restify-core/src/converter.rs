//! Message converters and the converter registry.
//!
//! A [`MessageConverter`] writes a request body to a sink or reads a response
//! body from a source, for one content type. [`MessageConverters`] keeps them in
//! registration order and resolves the first match.

mod form;
mod json;
mod text;

pub use form::FormUrlEncodedMessageConverter;
pub use json::JsonMessageConverter;
pub use text::TextPlainMessageConverter;

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::TypeDescriptor;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Converts bodies of one content type.
///
/// Every operation has a refusing default so a converter only implements the
/// direction it supports.
pub trait MessageConverter: Send + Sync {
    /// The media type handled, e.g. `application/json`.
    fn content_type(&self) -> &str;

    fn can_write(&self, _ty: &TypeDescriptor) -> bool {
        false
    }

    fn write(&self, _value: &Value, _sink: &mut dyn Write) -> Result<()> {
        Err(Error::encode(format!(
            "converter for {} cannot write",
            self.content_type()
        )))
    }

    fn can_read(&self, _expected: &TypeDescriptor) -> bool {
        false
    }

    fn read(&self, _expected: &TypeDescriptor, _source: &mut dyn Read) -> Result<Value> {
        Err(Error::decode(format!(
            "converter for {} cannot read",
            self.content_type()
        )))
    }
}

/// The media-type essence of a content type: lower-cased, parameters dropped.
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn same_media_type(a: &str, b: &str) -> bool {
    media_type_essence(a) == media_type_essence(b)
}

/// Ordered converter registry. First registered match wins.
#[derive(Clone, Default)]
pub struct MessageConverters {
    converters: Vec<Arc<dyn MessageConverter>>,
}

impl MessageConverters {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in converters: text/plain, JSON, form-urlencoded.
    pub fn defaults() -> Self {
        Self::new()
            .with(TextPlainMessageConverter)
            .with(JsonMessageConverter)
            .with(FormUrlEncodedMessageConverter)
    }

    pub fn with<C: MessageConverter + 'static>(mut self, converter: C) -> Self {
        self.register(Arc::new(converter));
        self
    }

    pub fn register(&mut self, converter: Arc<dyn MessageConverter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Registered converters in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MessageConverter>> {
        self.converters.iter()
    }

    /// The first writer of `content_type` accepting `ty`.
    pub fn writer_of(&self, content_type: &str, ty: &TypeDescriptor) -> Result<Arc<dyn MessageConverter>> {
        self.converters
            .iter()
            .find(|c| same_media_type(c.content_type(), content_type) && c.can_write(ty))
            .cloned()
            .ok_or_else(|| {
                Error::resolution(format!(
                    "no converter can write type [{}] as [{}]",
                    ty, content_type
                ))
            })
    }

    /// The first writer of any content type accepting `ty`.
    pub fn any_writer_of(&self, ty: &TypeDescriptor) -> Result<Arc<dyn MessageConverter>> {
        self.converters
            .iter()
            .find(|c| c.can_write(ty))
            .cloned()
            .ok_or_else(|| Error::resolution(format!("no converter can write type [{}]", ty)))
    }

    /// The first reader of `content_type` accepting `expected`.
    pub fn reader_of(&self, content_type: &str, expected: &TypeDescriptor) -> Result<Arc<dyn MessageConverter>> {
        self.converters
            .iter()
            .find(|c| same_media_type(c.content_type(), content_type) && c.can_read(expected))
            .cloned()
            .ok_or_else(|| {
                Error::resolution(format!(
                    "no converter can read type [{}] from [{}]",
                    expected, content_type
                ))
            })
    }
}

impl fmt::Debug for MessageConverters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.converters.iter().map(|c| c.content_type()))
            .finish()
    }
}
