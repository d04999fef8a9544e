use std::io::{Read, Write};

use serde_json::Value;

use super::{APPLICATION_FORM_URLENCODED, MessageConverter};
use crate::error::{Error, Result};
use crate::types::{TypeDescriptor, kinds};

/// `application/x-www-form-urlencoded` converter for object-shaped bodies.
///
/// Nested objects and arrays use bracket notation (`user[name]=Ann`).
#[derive(Clone, Copy, Debug, Default)]
pub struct FormUrlEncodedMessageConverter;

fn is_form_shaped(ty: &TypeDescriptor) -> bool {
    matches!(ty, TypeDescriptor::Named(_) | TypeDescriptor::Any) || ty.is(kinds::MAP)
}

impl MessageConverter for FormUrlEncodedMessageConverter {
    fn content_type(&self) -> &str {
        APPLICATION_FORM_URLENCODED
    }

    fn can_write(&self, ty: &TypeDescriptor) -> bool {
        is_form_shaped(ty)
    }

    fn write(&self, value: &Value, sink: &mut dyn Write) -> Result<()> {
        if !value.is_object() {
            return Err(Error::encode(format!(
                "form body must be an object, got {}",
                value
            )));
        }
        let encoded = serde_qs::to_string(value)
            .map_err(|e| Error::encode(format!("form serialization failed: {}", e)))?;
        sink.write_all(encoded.as_bytes())
            .map_err(|e| Error::encode(format!("failed to write form body: {}", e)))
    }

    fn can_read(&self, expected: &TypeDescriptor) -> bool {
        is_form_shaped(expected)
    }

    /// Every leaf is read back as a string.
    fn read(&self, expected: &TypeDescriptor, source: &mut dyn Read) -> Result<Value> {
        let mut content = Vec::new();
        source
            .read_to_end(&mut content)
            .map_err(|e| Error::decode(format!("failed to read form body: {}", e)))?;
        serde_qs::from_bytes(&content)
            .map_err(|e| Error::decode(format!("cannot read [{}] from form: {}", expected, e)))
    }
}
