//! # Change Notifications
//!
//! Instances publish four events:
//!
//! | Event | When | Payload |
//! |-------|------|---------|
//! | `setting` | before a write is recorded | attribute name and value |
//! | `set` | after a write is recorded | attribute name and value |
//! | `resetting` | before the change log is cleared | incoming base, if any |
//! | `reset` | after the change log is cleared | base now in effect |
//!
//! Handlers subscribe at instance scope ([`Instance::on`]) or class scope
//! ([`Schema::on`], fired by every instance of the schema, with the instance
//! as first argument). Delivery is synchronous and in registration order:
//! instance handlers first, then class handlers.
//!
//! Class-scope handlers are shared `Fn`s. Dispatch copies the matching
//! handlers out of the schema's subscription list before calling them, so a
//! handler may subscribe to the schema or write to other instances of it.
//! Handlers subscribed during a dispatch first run on the next event.
//!
//! [`Instance::on`]: crate::Instance::on
//! [`Schema::on`]: crate::Schema::on

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::attributes::Record;
use crate::error::ModelError;
use crate::instance::Instance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Setting,
    Set,
    Resetting,
    Reset,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Setting,
        EventKind::Set,
        EventKind::Resetting,
        EventKind::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Setting => "setting",
            EventKind::Set => "set",
            EventKind::Resetting => "resetting",
            EventKind::Reset => "reset",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownEvent(s.to_string()))
    }
}

/// A notification and its payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    Setting { name: &'a str, value: &'a Value },
    Set { name: &'a str, value: &'a Value },
    /// `base` is `None` when the reset keeps the current base.
    Resetting { base: Option<&'a Record> },
    Reset { base: &'a Record },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Setting { .. } => EventKind::Setting,
            Event::Set { .. } => EventKind::Set,
            Event::Resetting { .. } => EventKind::Resetting,
            Event::Reset { .. } => EventKind::Reset,
        }
    }

    /// Attribute name, for `setting`/`set`.
    pub fn name(&self) -> Option<&str> {
        match self {
            Event::Setting { name, .. } | Event::Set { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Written value, for `setting`/`set`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Event::Setting { value, .. } | Event::Set { value, .. } => Some(*value),
            _ => None,
        }
    }
}

pub type InstanceHandler = Box<dyn FnMut(&Event<'_>) + Send>;
pub type ClassHandler = Arc<dyn Fn(&Instance, &Event<'_>) + Send + Sync>;

/// Ordered, append-only subscription list.
pub(crate) struct Listeners<H> {
    entries: Vec<(EventKind, H)>,
}

impl<H> Default for Listeners<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> Listeners<H> {
    pub(crate) fn add(&mut self, kind: EventKind, handler: H) {
        self.entries.push((kind, handler));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Handlers subscribed to `kind`, in registration order.
    pub(crate) fn matching(&mut self, kind: EventKind) -> impl Iterator<Item = &mut H> {
        self.entries
            .iter_mut()
            .filter(move |entry| entry.0 == kind)
            .map(|(_, handler)| handler)
    }
}

impl Listeners<InstanceHandler> {
    pub(crate) fn emit(&mut self, event: &Event<'_>) {
        for handler in self.matching(event.kind()) {
            handler(event);
        }
    }
}

impl Listeners<ClassHandler> {
    /// Shared handles to the handlers subscribed to `kind`, in registration order.
    pub(crate) fn snapshot(&self, kind: EventKind) -> Vec<ClassHandler> {
        self.entries
            .iter()
            .filter(|entry| entry.0 == kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}
