//! Actual arguments of a proxy invocation.
//!
//! Arguments are positional and line up with the declared parameters. Plain
//! values are carried as [`serde_json::Value`]; callback parameters take a
//! closure instead.
//!
//! ```ignore
//! use restify_client::{Argument, Arguments};
//!
//! let args = Arguments::from(vec![
//!     Argument::from(42),
//!     Argument::from("Ann"),
//!     Argument::Null,
//! ]);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::handler::Returned;
use restify_core::{Error, Result};

/// Receives the adapted result of a callback-shaped call.
pub type SuccessCallback = Arc<dyn Fn(Returned) + Send + Sync>;

/// Receives the failure of a callback-shaped call.
pub type FailureCallback = Arc<dyn Fn(Error) + Send + Sync>;

/// One actual argument.
#[derive(Clone, Default)]
pub enum Argument {
    /// Absent value.
    #[default]
    Null,
    Value(Value),
    Success(SuccessCallback),
    Failure(FailureCallback),
}

impl Argument {
    /// Serialize any value into an argument.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Argument::from)
            .map_err(|e| Error::encode(format!("cannot serialize argument: {}", e)))
    }

    pub fn json(value: Value) -> Self {
        Argument::from(value)
    }

    pub fn success<F>(callback: F) -> Self
    where
        F: Fn(Returned) + Send + Sync + 'static,
    {
        Argument::Success(Arc::new(callback))
    }

    pub fn failure<F>(callback: F) -> Self
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        Argument::Failure(Arc::new(callback))
    }

    /// The plain value, `None` for nulls and callbacks.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Argument::Value(Value::Null) => None,
            Argument::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value().is_none() && !self.is_callback()
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, Argument::Success(_) | Argument::Failure(_))
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Argument::Null,
            value => Argument::Value(value),
        }
    }
}

macro_rules! argument_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::from(Value::from(value))
                }
            }
        )*
    };
}

argument_from!(&str, String, bool, i32, i64, u32, u64, f64);

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Argument::Null)
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Null => f.write_str("Null"),
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::Success(_) => f.write_str("Success(<callback>)"),
            Argument::Failure(_) => f.write_str("Failure(<callback>)"),
        }
    }
}

/// Positional arguments of one invocation. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    values: Arc<Vec<Argument>>,
}

impl Arguments {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, position: usize) -> Option<&Argument> {
        self.values.get(position)
    }

    /// The plain value at `position`, `None` when absent or null.
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.get(position).and_then(Argument::value)
    }

    pub fn success_callback(&self, position: usize) -> Option<SuccessCallback> {
        match self.get(position) {
            Some(Argument::Success(callback)) => Some(callback.clone()),
            _ => None,
        }
    }

    pub fn failure_callback(&self, position: usize) -> Option<FailureCallback> {
        match self.get(position) {
            Some(Argument::Failure(callback)) => Some(callback.clone()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(values: Vec<Argument>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }
}

impl From<()> for Arguments {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}
