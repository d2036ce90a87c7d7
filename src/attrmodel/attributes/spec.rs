//! Attribute declarations.
//!
//! [`AttrOptions`] describes one attribute: whether it can be written, what
//! it defaults to, and how its values are coerced. Options are assembled
//! with chained setters, or deserialized from JSON-Schema-style documents
//! (`{"type": "integer", "default": 0, "readOnly": true}`).

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::value::AttrType;
use crate::error::Result;

/// Declaration options for a single attribute.
#[derive(Debug, Clone)]
pub struct AttrOptions {
    /// Read-only attributes resolve from base and default only; writes are ignored.
    pub read_only: bool,

    /// Value used when the attribute is absent.
    ///
    /// `Some(Value::Null)` is a null default, distinct from `None` (no default).
    pub default: Option<Value>,

    /// Implicit cast. Never replaces a cast already registered for the name.
    pub kind: Option<AttrType>,
}

impl Default for AttrOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AttrOptions {
    pub fn new() -> Self {
        Self {
            read_only: false,
            default: None,
            kind: None,
        }
    }

    /// Mark the attribute read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set the default value (including `Value::Null`).
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Cast through the registry entry `name`.
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.kind = Some(AttrType::named(name));
        self
    }

    /// Cast through `f`, given directly as the attribute's type.
    pub fn cast_with<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.kind = Some(AttrType::func(f));
        self
    }
}

// A present `"default": null` must survive as `Some(Value::Null)`; plain
// `Option<Value>` would collapse it to `None`.
impl<'de> Deserialize<'de> for AttrOptions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let helper = AttrOptionsHelper::deserialize(deserializer)?;

        Ok(AttrOptions {
            read_only: helper.read_only,
            default: helper.default,
            kind: helper.kind.map(AttrType::Named),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttrOptionsHelper {
    #[serde(default)]
    read_only: bool,
    #[serde(default, deserialize_with = "present")]
    default: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
