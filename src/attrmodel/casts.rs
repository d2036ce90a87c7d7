//! # Cast Registry
//!
//! Maps type names to cast functions. Every schema owns its own registry,
//! seeded from the built-in table below and extended with
//! [`SchemaBuilder::define_type`](crate::SchemaBuilder::define_type).
//! Registries never shrink.
//!
//! ## Built-in Types
//!
//! | Name | Coercion |
//! |------|----------|
//! | `array` | arrays unchanged, anything else wrapped as `[value]` |
//! | `boolean` | truthiness: `false`, `0`, `""` and `null` are false |
//! | `integer` | truncating parse (`"42px"` → 42, `"4.7"` → 4, `4.7` → 4) |
//! | `number` | numeric parse, `""`/`null` → 0, booleans → 1/0 |
//! | `null` | always `null` |
//! | `object` | objects and arrays unchanged, `null` → `{}` |
//! | `string` | textual form (`1.0` → `"1"`, `[1, null]` → `"1,"`) |
//!
//! Values with no sensible coercion (`"abc"` as `integer`, `true` as
//! `object`) fail with [`ModelError::CastFailed`] rather than passing through.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;
use once_cell::sync::Lazy;
use serde_json::{Map, Number, Value};

use crate::attributes::CastFn;
use crate::error::{ModelError, Result};

/// Seed table copied into every new registry.
static BUILTIN_CASTS: Lazy<BTreeMap<&'static str, CastFn>> = Lazy::new(|| {
    let mut table: BTreeMap<&'static str, CastFn> = BTreeMap::new();
    table.insert("array", Arc::new(to_array));
    table.insert("boolean", Arc::new(to_boolean));
    table.insert("integer", Arc::new(to_integer));
    table.insert("number", Arc::new(to_number));
    table.insert("null", Arc::new(to_null));
    table.insert("object", Arc::new(to_object));
    table.insert("string", Arc::new(to_string));
    table
});

/// Names of the built-in cast types.
pub fn builtin_types() -> impl Iterator<Item = &'static str> {
    BUILTIN_CASTS.keys().copied()
}

/// Type name to cast function lookup, owned by one schema.
#[derive(Clone)]
pub struct CastRegistry {
    casts: BTreeMap<String, CastFn>,
}

impl Default for CastRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CastRegistry {
    /// A registry seeded with the built-in types.
    pub fn with_builtins() -> Self {
        let casts = BUILTIN_CASTS
            .iter()
            .map(|(name, cast)| (name.to_string(), Arc::clone(cast)))
            .collect();
        Self { casts }
    }

    /// Register (or replace) the cast for `type_name`.
    pub fn register(&mut self, type_name: impl Into<String>, cast: CastFn) {
        self.casts.insert(type_name.into(), cast);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.casts.contains_key(type_name)
    }

    pub fn get(&self, type_name: &str) -> Option<&CastFn> {
        self.casts.get(type_name)
    }

    /// Sorted registered type names.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.casts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.casts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }

    /// Cast `value` through the registry entry `type_name`.
    ///
    /// Unknown type names fail; the value is never passed through unchanged.
    pub fn cast(&self, type_name: &str, value: Value) -> Result<Value> {
        match self.casts.get(type_name) {
            Some(cast) => cast(value),
            None => {
                warn!("event=cast_unknown_type module=casts type={type_name}");
                Err(ModelError::UnknownCastType(type_name.to_string()))
            }
        }
    }
}

fn to_array(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Array(_) => value,
        other => Value::Array(vec![other]),
    })
}

fn to_boolean(value: Value) -> Result<Value> {
    Ok(Value::Bool(is_truthy(&value)))
}

fn to_integer(value: Value) -> Result<Value> {
    let parsed = match &value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::Number(n.clone())),
        Value::Number(n) => n.as_f64().and_then(truncated_integer),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    };
    parsed.ok_or_else(|| ModelError::cast_failed("integer", value))
}

fn to_number(value: Value) -> Result<Value> {
    let parsed = match &value {
        Value::Number(_) => Some(value.clone()),
        Value::Bool(b) => Some(Value::from(u8::from(*b))),
        Value::Null => Some(Value::from(0)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(Value::from(0))
            } else {
                trimmed.parse::<f64>().ok().and_then(float_value)
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    };
    parsed.ok_or_else(|| ModelError::cast_failed("number", value))
}

fn to_null(_value: Value) -> Result<Value> {
    Ok(Value::Null)
}

fn to_object(value: Value) -> Result<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(ModelError::cast_failed("object", other)),
    }
}

fn to_string(value: Value) -> Result<Value> {
    Ok(match value {
        Value::String(_) => value,
        other => Value::String(display(&other)),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Integral floats become integer values; non-finite floats have no JSON form.
fn float_value(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Truncates toward zero; results outside the i64 range stay floats.
fn truncated_integer(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    let f = f.trunc();
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        return Some(Value::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Leading-integer parse: skips leading whitespace, accepts a sign, a `0x`
/// prefix, then reads digits until the first non-digit.
fn parse_int_prefix(s: &str) -> Option<Value> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }

    if let Ok(n) = i64::from_str_radix(digits, radix) {
        return Some(Value::from(if negative { -n } else { n }));
    }

    // Too wide for i64; keep the approximate magnitude.
    let magnitude = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    truncated_integer(if negative { -magnitude } else { magnitude })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => display_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn display_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}
