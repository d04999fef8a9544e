use std::io::{Read, Write};

use serde_json::Value;

use super::{MessageConverter, TEXT_PLAIN};
use crate::error::{Error, Result};
use crate::types::{Primitive, TypeDescriptor};

/// `text/plain` converter for string bodies.
///
/// Reads also accept [`TypeDescriptor::Any`], yielding a string value.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextPlainMessageConverter;

impl MessageConverter for TextPlainMessageConverter {
    fn content_type(&self) -> &str {
        TEXT_PLAIN
    }

    fn can_write(&self, ty: &TypeDescriptor) -> bool {
        matches!(ty, TypeDescriptor::Primitive(Primitive::String))
    }

    fn write(&self, value: &Value, sink: &mut dyn Write) -> Result<()> {
        let text = value
            .as_str()
            .ok_or_else(|| Error::encode(format!("text/plain body must be a string, got {}", value)))?;
        sink.write_all(text.as_bytes())
            .map_err(|e| Error::encode(format!("failed to write text/plain body: {}", e)))
    }

    fn can_read(&self, expected: &TypeDescriptor) -> bool {
        matches!(
            expected,
            TypeDescriptor::Primitive(Primitive::String) | TypeDescriptor::Any
        )
    }

    fn read(&self, _expected: &TypeDescriptor, source: &mut dyn Read) -> Result<Value> {
        let mut content = String::new();
        source
            .read_to_string(&mut content)
            .map_err(|e| Error::decode(format!("failed to read text/plain body: {}", e)))?;
        Ok(Value::String(content))
    }
}
