//! # attrmodel Architecture
//!
//! attrmodel declares a named set of attributes (defaults, casts, read-only
//! flags, calculated fields) and wraps plain JSON records so that reads are
//! resolved consistently and writes are tracked as an ordered change log with
//! synchronous notifications.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Declaration (schema.rs, attributes/, config.rs)            │
//! │  - SchemaBuilder: attr / cast / define_type / calc          │
//! │  - build() freezes the tables into a shared Schema          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Instances (instance.rs, events.rs)                         │
//! │  - base record + change log + instance-scope handlers       │
//! │  - set / reset fire setting, set, resetting, reset          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Resolution (resolve.rs, casts.rs)                          │
//! │  - base → defaults → changes → casts → calcs                │
//! │  - pure functions over owned copies                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use attrmodel::{define_schema, AttrOptions};
//! use serde_json::json;
//!
//! let schema = define_schema()
//!     .attr("x", AttrOptions::new())
//!     .attr("y", AttrOptions::new().read_only().default_value(5))
//!     .build()?;
//!
//! let mut item = schema.empty_instance();
//! item.set("x", 1).set("y", 9);
//! assert_eq!(serde_json::Value::Object(item.value()?), json!({ "x": 1, "y": 5 }));
//! # Ok::<(), attrmodel::ModelError>(())
//! ```
//!
//! ## Key Principle: No I/O
//!
//! Nothing here touches files, the network, or the terminal. Diagnostics go
//! through the `log` facade; the host decides whether and where they land.
//!
//! ## Threading
//!
//! Schemas are `Send + Sync` and instances are `Send`. Configure a schema
//! fully, then build it; a built schema's declaration never changes.
//!
//! ## Module Overview
//!
//! - [`schema`]: Declaration builder and the frozen instance factory
//! - [`instance`]: Change-tracked instances
//! - [`events`]: Event kinds, payloads and dispatch
//! - [`attributes`]: Attribute options and value types
//! - [`casts`]: Built-in and registered cast types
//! - [`config`]: Declarations loaded from JSON documents
//! - [`error`]: Error types

pub mod attributes;
pub mod casts;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
mod resolve;
pub mod schema;

pub use attributes::{AttrOptions, AttrType, CalcFn, CastFn, Change, Record};
pub use casts::CastRegistry;
pub use config::SchemaConfig;
pub use error::{ModelError, Result};
pub use events::{Event, EventKind};
pub use instance::Instance;
pub use schema::{define_schema, Schema, SchemaBuilder};
