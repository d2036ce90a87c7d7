//! # Schema Declaration
//!
//! A schema is declared once with a [`SchemaBuilder`], then frozen into a
//! [`Schema`] that acts as the instance factory.
//!
//! ## Declaration Rules
//!
//! - `attr(name, opts)` always sets writability (`!opts.read_only`).
//! - A default is recorded only when the options carry one; `Value::Null`
//!   counts.
//! - An attribute's type becomes its cast only if the name has no cast yet.
//! - `cast(name, f)` always replaces the cast for `name`, so an explicit cast
//!   wins over any type declared before or after it.
//! - `define_type(type_name, f)` extends this schema's cast registry. Type
//!   names are looked up when values are resolved, so attributes may name a
//!   type before it is defined.
//! - `calc(name, f)` derives `name` from the resolved record. Calculated
//!   fields are never writable.
//!
//! ## Configure, Then Freeze
//!
//! [`SchemaBuilder::build`] checks that every named type is registered and
//! moves the tables behind an `Arc`. Instances share them read-only; only the
//! class-scope subscription list stays mutable.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};
use serde_json::Value;

use crate::attributes::{AttrOptions, CalcFn, CastFn, Change, Record};
use crate::casts::CastRegistry;
use crate::config::SchemaConfig;
use crate::error::{ModelError, Result};
use crate::events::{ClassHandler, Event, EventKind, Listeners};
use crate::instance::Instance;
use crate::resolve::{apply_calcs, apply_casts, apply_changes, apply_defaults, CastResolver};

/// Start declaring a schema.
pub fn define_schema() -> SchemaBuilder {
    SchemaBuilder::new()
}

/// Mutable declaration tables.
#[derive(Clone, Default)]
pub struct SchemaBuilder {
    attributes: Vec<String>,
    writable: BTreeMap<String, bool>,
    defaults: Record,
    casts: BTreeMap<String, CastResolver>,
    calcs: Vec<(String, CalcFn)>,
    registry: CastRegistry,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute. Re-declaring updates writability and default
    /// but never replaces an existing cast.
    pub fn attr(mut self, name: impl Into<String>, opts: AttrOptions) -> Self {
        let name = name.into();
        if !self.writable.contains_key(&name) {
            self.attributes.push(name.clone());
        }
        self.writable.insert(name.clone(), !opts.read_only);
        if let Some(default) = opts.default {
            self.defaults.insert(name.clone(), default);
        }
        if let Some(kind) = opts.kind {
            self.casts
                .entry(name)
                .or_insert(CastResolver::Implicit(kind));
        }
        self
    }

    /// Declare several attributes, in iteration order.
    pub fn attrs<I, K>(self, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, AttrOptions)>,
        K: Into<String>,
    {
        attrs
            .into_iter()
            .fold(self, |builder, (name, opts)| builder.attr(name, opts))
    }

    /// Apply the attributes of a loaded configuration document.
    pub fn configure(self, config: SchemaConfig) -> Self {
        self.attrs(config)
    }

    /// Register the cast for attribute `name`, replacing any earlier one.
    pub fn cast<F>(self, name: impl Into<String>, cast: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.cast_fn(name, Arc::new(cast))
    }

    /// Register several attribute casts.
    pub fn casts<I, K>(self, casts: I) -> Self
    where
        I: IntoIterator<Item = (K, CastFn)>,
        K: Into<String>,
    {
        casts
            .into_iter()
            .fold(self, |builder, (name, cast)| builder.cast_fn(name, cast))
    }

    fn cast_fn(mut self, name: impl Into<String>, cast: CastFn) -> Self {
        self.casts.insert(name.into(), CastResolver::Explicit(cast));
        self
    }

    /// Add a named type to this schema's cast registry.
    pub fn define_type<F>(mut self, type_name: impl Into<String>, cast: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.register(type_name, Arc::new(cast));
        self
    }

    /// Register a calculated field.
    pub fn calc<F>(self, name: impl Into<String>, calc: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.calc_fn(name, Arc::new(calc))
    }

    /// Register several calculated fields.
    pub fn calcs<I, K>(self, calcs: I) -> Self
    where
        I: IntoIterator<Item = (K, CalcFn)>,
        K: Into<String>,
    {
        calcs
            .into_iter()
            .fold(self, |builder, (name, calc)| builder.calc_fn(name, calc))
    }

    /// Re-registering a name replaces its calculation in place.
    fn calc_fn(mut self, name: impl Into<String>, calc: CalcFn) -> Self {
        let name = name.into();
        match self.calcs.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = calc,
            None => self.calcs.push((name, calc)),
        }
        self
    }

    /// Freeze the declaration.
    ///
    /// # Errors
    /// - `UnknownCastType` when an attribute names a type the registry lacks.
    pub fn build(self) -> Result<Schema> {
        for resolver in self.casts.values() {
            if let Some(type_name) = resolver.type_name() {
                if !self.registry.contains(type_name) {
                    return Err(ModelError::UnknownCastType(type_name.to_string()));
                }
            }
        }

        debug!(
            "event=schema_built module=schema attrs={} casts={} calcs={} types={}",
            self.attributes.len(),
            self.casts.len(),
            self.calcs.len(),
            self.registry.len()
        );

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                attributes: self.attributes,
                writable: self.writable,
                defaults: self.defaults,
                casts: self.casts,
                calcs: self.calcs,
                registry: self.registry,
                listeners: Mutex::new(Listeners::default()),
            }),
        })
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("attributes", &self.attributes)
            .field("defaults", &self.defaults)
            .field("casts", &self.casts.keys().collect::<Vec<_>>())
            .field("calcs", &self.calcs.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish()
    }
}

/// Which layers a resolution includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Base, defaults, changes, casts, calcs.
    Value,
    /// Defaults, changes and casts over an empty base.
    Change,
}

/// A frozen schema: the instance factory. Cloning is cheap and shares the
/// declaration and the class-scope subscriptions.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

struct SchemaInner {
    attributes: Vec<String>,
    writable: BTreeMap<String, bool>,
    defaults: Record,
    casts: BTreeMap<String, CastResolver>,
    calcs: Vec<(String, CalcFn)>,
    registry: CastRegistry,
    listeners: Mutex<Listeners<ClassHandler>>,
}

impl Schema {
    /// Wrap `base` in a new instance with an empty change log.
    pub fn instance(&self, base: Record) -> Instance {
        Instance::new(self.clone(), base)
    }

    pub fn empty_instance(&self) -> Instance {
        self.instance(Record::new())
    }

    /// Subscribe to `kind` for every instance of this schema.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> &Self
    where
        F: Fn(&Instance, &Event<'_>) + Send + Sync + 'static,
    {
        self.listeners().add(kind, Arc::new(handler));
        self
    }

    /// Subscribe by event name.
    ///
    /// # Errors
    /// - `UnknownEvent` for names other than `setting`, `set`, `resetting`, `reset`.
    pub fn on_named<F>(&self, name: &str, handler: F) -> Result<&Self>
    where
        F: Fn(&Instance, &Event<'_>) + Send + Sync + 'static,
    {
        let kind: EventKind = name.parse()?;
        Ok(self.on(kind, handler))
    }

    /// Declared attribute names, in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.inner.attributes.iter().map(String::as_str)
    }

    /// True for declared, non-read-only, non-calculated attributes.
    pub fn is_writable(&self, name: &str) -> bool {
        self.inner.writable.get(name).copied().unwrap_or(false) && !self.is_calculated(name)
    }

    pub fn is_calculated(&self, name: &str) -> bool {
        self.inner.calcs.iter().any(|(calc, _)| calc == name)
    }

    pub fn registry(&self) -> &CastRegistry {
        &self.inner.registry
    }

    pub(crate) fn resolve(&self, base: &Record, changes: &[Change], stage: Stage) -> Result<Record> {
        let inner = &self.inner;
        let mut record = match stage {
            Stage::Value => base.clone(),
            Stage::Change => Record::new(),
        };
        apply_defaults(&mut record, &inner.defaults);
        apply_changes(&mut record, changes);
        apply_casts(&mut record, &inner.casts, &inner.registry)?;
        if stage == Stage::Value {
            apply_calcs(&mut record, &inner.calcs);
        }
        trace!(
            "event=resolved module=schema stage={:?} keys={}",
            stage,
            record.len()
        );
        Ok(record)
    }

    pub(crate) fn emit(&self, instance: &Instance, event: &Event<'_>) {
        // The guard drops here; handlers run unlocked.
        let handlers = self.listeners().snapshot(event.kind());
        for handler in handlers {
            handler(instance, event);
        }
    }

    // A handler that panicked leaves the list intact; keep dispatching.
    fn listeners(&self) -> MutexGuard<'_, Listeners<ClassHandler>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("attributes", &self.inner.attributes)
            .field("defaults", &self.inner.defaults)
            .field("casts", &self.inner.casts.keys().collect::<Vec<_>>())
            .field("calcs", &self.inner.calcs.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field(
                "listeners",
                &self.inner.listeners.try_lock().map(|l| l.len()).ok(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attr_records_declaration_order() {
        let schema = define_schema()
            .attr("b", AttrOptions::new())
            .attr("a", AttrOptions::new())
            .attr("b", AttrOptions::new().read_only())
            .build()
            .unwrap();
        let names: Vec<_> = schema.attribute_names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn redeclaring_updates_writability() {
        let schema = define_schema()
            .attr("a", AttrOptions::new().read_only())
            .attr("a", AttrOptions::new())
            .build()
            .unwrap();
        assert!(schema.is_writable("a"));
    }

    #[test]
    fn undeclared_and_read_only_are_not_writable() {
        let schema = define_schema()
            .attr("ro", AttrOptions::new().read_only())
            .build()
            .unwrap();
        assert!(!schema.is_writable("ro"));
        assert!(!schema.is_writable("nope"));
    }

    #[test]
    fn calculated_fields_are_never_writable() {
        let schema = define_schema()
            .attr("total", AttrOptions::new())
            .calc("total", |_| json!(0))
            .build()
            .unwrap();
        assert!(schema.is_calculated("total"));
        assert!(!schema.is_writable("total"));
    }

    #[test]
    fn build_rejects_unknown_type() {
        let err = define_schema()
            .attr("x", AttrOptions::new().type_name("upcase"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownCastType(ref t) if t == "upcase"));
    }

    #[test]
    fn types_may_be_defined_after_use() {
        let schema = define_schema()
            .attr("x", AttrOptions::new().type_name("upcase"))
            .define_type("upcase", |v| {
                Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))
            })
            .build()
            .unwrap();
        assert!(schema.registry().contains("upcase"));
    }

    #[test]
    fn explicit_cast_beats_type_declared_later() {
        let builder = define_schema()
            .cast("n", |_| Ok(json!("explicit")))
            .attr("n", AttrOptions::new().type_name("integer"));
        assert!(matches!(
            builder.casts.get("n"),
            Some(CastResolver::Explicit(_))
        ));
    }

    #[test]
    fn explicit_cast_replaces_type_declared_earlier() {
        let builder = define_schema()
            .attr("n", AttrOptions::new().type_name("integer"))
            .cast("n", |_| Ok(json!("explicit")));
        assert!(matches!(
            builder.casts.get("n"),
            Some(CastResolver::Explicit(_))
        ));
    }

    #[test]
    fn first_declared_type_is_kept() {
        let builder = define_schema()
            .attr("n", AttrOptions::new().type_name("integer"))
            .attr("n", AttrOptions::new().type_name("string"));
        let kept = builder.casts.get("n").and_then(|r| r.type_name());
        assert_eq!(kept, Some("integer"));
    }

    #[test]
    fn on_named_rejects_unknown_events() {
        let schema = define_schema().build().unwrap();
        let err = schema.on_named("changed", |_, _| {}).unwrap_err();
        assert!(matches!(err, ModelError::UnknownEvent(_)));
        assert!(schema.on_named("set", |_, _| {}).is_ok());
    }

    #[test]
    fn mapping_forms_register_each_entry() {
        let double: CalcFn = Arc::new(|r: &Record| json!(r["a"].as_i64().unwrap_or(0) * 2));
        let to_text: CastFn = Arc::new(|v: Value| Ok(json!(v.to_string())));
        let schema = define_schema()
            .attrs([
                ("a", AttrOptions::new()),
                ("b", AttrOptions::new().default_value(1)),
            ])
            .casts([("b", to_text)])
            .calcs([("double", double)])
            .build()
            .unwrap();
        let names: Vec<_> = schema.attribute_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(schema.is_calculated("double"));
    }

    #[test]
    fn recalc_replaces_in_place() {
        let builder = define_schema()
            .calc("first", |_| json!(1))
            .calc("second", |_| json!(2))
            .calc("first", |_| json!(3));
        let names: Vec<_> = builder.calcs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!((builder.calcs[0].1)(&Record::new()), json!(3));
    }
}
