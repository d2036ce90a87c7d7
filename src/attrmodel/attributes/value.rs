//! Runtime value types shared by the resolution pipeline.
//!
//! Values are plain `serde_json::Value`s and records are ordered
//! `serde_json::Map`s, so any data a host already holds as JSON can be
//! wrapped without conversion. A key missing from a record is "absent";
//! `Value::Null` is a present value.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// A keyed record: the base object, and every resolved value.
pub type Record = Map<String, Value>;

/// Coerces a raw value into an attribute's canonical representation.
pub type CastFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Derives a value from the resolved record.
pub type CalcFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// How an attribute declares its type.
///
/// A named type is looked up in the schema's cast registry when a value is
/// resolved, so the name may be registered after the attribute is declared.
#[derive(Clone)]
pub enum AttrType {
    /// A key into the cast registry (e.g. `"integer"`).
    Named(String),

    /// A cast function given directly as the type.
    Func(CastFn),
}

impl AttrType {
    pub fn named(name: impl Into<String>) -> Self {
        AttrType::Named(name.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        AttrType::Func(Arc::new(f))
    }

    /// The registry key, if this is a named type.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            AttrType::Named(name) => Some(name),
            AttrType::Func(_) => None,
        }
    }
}

impl fmt::Debug for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Named(name) => f.debug_tuple("Named").field(name).finish(),
            AttrType::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// One accepted write, as recorded in an instance's change log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub name: String,
    pub value: Value,
}

impl Change {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
