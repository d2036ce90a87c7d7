//! # Schema Configuration Documents
//!
//! Attribute declarations can live in JSON instead of code. Two shapes are
//! accepted:
//!
//! ```text
//! { "properties": { "count": { "type": "integer", "default": 0 } } }
//! { "count": { "type": "integer", "default": 0 } }
//! ```
//!
//! A top-level `properties` key holding an object selects the first shape.
//! Attributes are applied in document order.
//!
//! ## Options
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `type` | none | Cast registry key |
//! | `default` | none | Default value; `null` is a real default |
//! | `readOnly` | `false` | Ignore writes to the attribute |
//!
//! An attribute given as `null` or `{}` is declared with no options.
//! Cast and calculation functions are code and are registered on the
//! [`SchemaBuilder`](crate::SchemaBuilder) directly.

use serde_json::Value;

use crate::attributes::AttrOptions;
use crate::error::{ModelError, Result};

const PROPERTIES_KEY: &str = "properties";

/// Attribute declarations loaded from a document.
#[derive(Debug, Clone, Default)]
pub struct SchemaConfig {
    attributes: Vec<(String, AttrOptions)>,
}

impl SchemaConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut document) = value else {
            return Err(ModelError::InvalidDocument(
                "expected an object of attribute declarations".to_string(),
            ));
        };

        if matches!(document.get(PROPERTIES_KEY), Some(Value::Object(_))) {
            if let Some(Value::Object(properties)) = document.remove(PROPERTIES_KEY) {
                document = properties;
            }
        }

        let attributes = document
            .into_iter()
            .map(|(name, opts)| {
                let opts = match opts {
                    Value::Null => AttrOptions::new(),
                    Value::Object(_) => serde_json::from_value(opts)?,
                    other => {
                        return Err(ModelError::InvalidDocument(format!(
                            "attribute `{name}` must be an object, got {other}"
                        )))
                    }
                };
                Ok((name, opts))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[(String, AttrOptions)] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl IntoIterator for SchemaConfig {
    type Item = (String, AttrOptions);
    type IntoIter = std::vec::IntoIter<(String, AttrOptions)>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}
