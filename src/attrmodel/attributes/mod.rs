//! # Attribute Declarations
//!
//! The building blocks a schema is declared from:
//!
//! - **Options** ([`AttrOptions`]): read-only flag, default, and implicit type
//! - **Types** ([`AttrType`]): a cast registry key or a cast function
//! - **Values**: [`Record`] for keyed data, [`Change`] for change-log entries
//!
//! ## Usage
//!
//! ```ignore
//! let schema = define_schema()
//!     .attr("count", AttrOptions::new().type_name("integer").default_value(0))
//!     .attr("id", AttrOptions::new().read_only())
//!     .build()?;
//! ```

mod spec;
mod value;

pub use spec::AttrOptions;
pub use value::{AttrType, CalcFn, CastFn, Change, Record};
