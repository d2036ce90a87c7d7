//! # Value Resolution
//!
//! Pure functions that layer a record, stage by stage:
//!
//! ```text
//! base ──► defaults ──► changes ──► casts ──► calcs
//!          (fill        (overlay,   (coerce    (derive from the
//!           absent)      in order)   present)   cast record)
//! ```
//!
//! Every stage works on an owned copy; instance state is only ever read.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::attributes::{AttrType, CalcFn, CastFn, Change, Record};
use crate::casts::CastRegistry;
use crate::error::Result;

/// The cast attached to one attribute.
#[derive(Clone)]
pub(crate) enum CastResolver {
    /// Registered with `cast()`; replaces any previous cast for the name.
    Explicit(CastFn),

    /// Declared through `attr()` options; only set when no cast exists yet.
    Implicit(AttrType),
}

impl CastResolver {
    pub(crate) fn apply(&self, value: Value, registry: &CastRegistry) -> Result<Value> {
        match self {
            CastResolver::Explicit(cast) | CastResolver::Implicit(AttrType::Func(cast)) => {
                cast(value)
            }
            CastResolver::Implicit(AttrType::Named(type_name)) => registry.cast(type_name, value),
        }
    }

    pub(crate) fn type_name(&self) -> Option<&str> {
        match self {
            CastResolver::Implicit(kind) => kind.type_name(),
            CastResolver::Explicit(_) => None,
        }
    }
}

/// Fill every absent key that has a default, in declaration order.
pub(crate) fn apply_defaults(record: &mut Record, defaults: &Record) {
    for (name, default) in defaults {
        if !record.contains_key(name) {
            record.insert(name.clone(), default.clone());
        }
    }
}

/// Overlay change-log entries in order; later writes win.
pub(crate) fn apply_changes(record: &mut Record, changes: &[Change]) {
    for change in changes {
        record.insert(change.name.clone(), change.value.clone());
    }
}

/// Coerce keys that are present. Absent keys stay absent.
pub(crate) fn apply_casts(
    record: &mut Record,
    casts: &BTreeMap<String, CastResolver>,
    registry: &CastRegistry,
) -> Result<()> {
    for (name, resolver) in casts {
        if let Some(slot) = record.get_mut(name) {
            let raw = std::mem::take(slot);
            *slot = resolver.apply(raw, registry)?;
        }
    }
    Ok(())
}

/// Write every calculation. Each one sees the record as it was before any
/// calculation ran. New keys land in registration order.
pub(crate) fn apply_calcs(record: &mut Record, calcs: &[(String, CalcFn)]) {
    if calcs.is_empty() {
        return;
    }
    let snapshot = record.clone();
    for (name, calc) in calcs {
        record.insert(name.clone(), calc(&snapshot));
    }
}
