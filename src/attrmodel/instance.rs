//! # Model Instances
//!
//! An [`Instance`] wraps a base record with an ordered change log. Reads
//! recompute the full pipeline every call; nothing is cached.
//!
//! ## States
//!
//! ```text
//!            set (writable)
//!   clean ─────────────────► dirty ──┐ set (writable)
//!     ▲                        │  ◄──┘
//!     └──────── reset ─────────┘
//! ```
//!
//! Writes to read-only, calculated or undeclared attributes are ignored
//! without notification.

use std::fmt;

use log::{debug, trace};
use serde_json::Value;
use uuid::Uuid;

use crate::attributes::{Change, Record};
use crate::error::Result;
use crate::events::{Event, EventKind, InstanceHandler, Listeners};
use crate::schema::{Schema, Stage};

pub struct Instance {
    id: Uuid,
    schema: Schema,
    base: Record,
    changes: Vec<Change>,
    listeners: Listeners<InstanceHandler>,
}

impl Instance {
    pub(crate) fn new(schema: Schema, base: Record) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema,
            base,
            changes: Vec::new(),
            listeners: Listeners::default(),
        }
    }

    /// Identifies this instance to class-scope handlers.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The record this instance was created (or last reset) with.
    pub fn base(&self) -> &Record {
        &self.base
    }

    /// One resolved attribute.
    ///
    /// Resolves the whole record; prefer [`Instance::value`] when reading
    /// several attributes.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.value()?.remove(name))
    }

    /// Record a write to `name`.
    ///
    /// Fires `setting`, appends to the change log, then fires `set`. Writes
    /// to attributes that are not writable are dropped silently.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        if !self.schema.is_writable(name) {
            let reason = if self.schema.is_calculated(name) {
                "calculated"
            } else if self.schema.attribute_names().any(|attr| attr == name) {
                "read_only"
            } else {
                "unknown"
            };
            debug!("event=set_ignored module=instance attr={name} reason={reason}");
            return self;
        }

        let value = value.into();
        let event = Event::Setting {
            name,
            value: &value,
        };
        self.listeners.emit(&event);
        self.schema.emit(self, &event);

        self.changes.push(Change::new(name, value.clone()));
        trace!(
            "event=set module=instance attr={name} changes={}",
            self.changes.len()
        );

        let event = Event::Set {
            name,
            value: &value,
        };
        self.listeners.emit(&event);
        self.schema.emit(self, &event);
        self
    }

    /// [`Instance::set`] for each entry, in iteration order.
    pub fn set_many<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value);
        }
        self
    }

    /// The resolved record: base, defaults, changes, casts, then calculations.
    ///
    /// # Errors
    /// - `UnknownCastType` or `CastFailed` from a cast. Instance state is
    ///   untouched either way.
    pub fn value(&self) -> Result<Record> {
        self.schema.resolve(&self.base, &self.changes, Stage::Value)
    }

    /// Defaults and changes only, cast but not merged with the base and
    /// without calculations.
    pub fn change(&self) -> Result<Record> {
        self.schema.resolve(&self.base, &self.changes, Stage::Change)
    }

    /// [`Instance::value`] restricted to writable attributes.
    pub fn changed_value(&self) -> Result<Record> {
        let mut record = self.value()?;
        record.retain(|name, _| self.schema.is_writable(name));
        Ok(record)
    }

    /// The raw change log, in call order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Clear the change log, keeping the base.
    pub fn reset(&mut self) -> &mut Self {
        self.reset_with(None)
    }

    /// Clear the change log and replace the base.
    pub fn reset_to(&mut self, base: Record) -> &mut Self {
        self.reset_with(Some(base))
    }

    fn reset_with(&mut self, base: Option<Record>) -> &mut Self {
        let event = Event::Resetting {
            base: base.as_ref(),
        };
        self.listeners.emit(&event);
        self.schema.emit(self, &event);

        let discarded = self.changes.len();
        let replaced = base.is_some();
        self.changes.clear();
        if let Some(base) = base {
            self.base = base;
        }
        debug!(
            "event=reset module=instance discarded={discarded} base_replaced={replaced}"
        );

        let event = Event::Reset { base: &self.base };
        self.listeners.emit(&event);
        self.schema.emit(self, &event);
        self
    }

    /// Subscribe to `kind` on this instance only.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        self.listeners.add(kind, Box::new(handler));
        self
    }

    /// Subscribe by event name.
    ///
    /// # Errors
    /// - `UnknownEvent` for names other than `setting`, `set`, `resetting`, `reset`.
    pub fn on_named<F>(&mut self, name: &str, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        let kind: EventKind = name.parse()?;
        Ok(self.on(kind, handler))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("base", &self.base)
            .field("changes", &self.changes)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
