use std::io::{Read, Write};

use serde_json::Value;

use super::{APPLICATION_JSON, MessageConverter};
use crate::error::{Error, Result};
use crate::types::TypeDescriptor;

/// `application/json` converter backed by serde_json.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonMessageConverter;

impl MessageConverter for JsonMessageConverter {
    fn content_type(&self) -> &str {
        APPLICATION_JSON
    }

    fn can_write(&self, ty: &TypeDescriptor) -> bool {
        !ty.is_void()
    }

    fn write(&self, value: &Value, sink: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(sink, value)
            .map_err(|e| Error::encode(format!("JSON serialization failed: {}", e)))
    }

    fn can_read(&self, expected: &TypeDescriptor) -> bool {
        !expected.is_void()
    }

    fn read(&self, expected: &TypeDescriptor, source: &mut dyn Read) -> Result<Value> {
        serde_json::from_reader(source)
            .map_err(|e| Error::decode(format!("cannot read [{}] from JSON: {}", expected, e)))
    }
}
