//! Schema subsystem
//!
//! A schema is a recursive tree of [`SchemaNode`]s built once from service
//! configuration and shared read-only by every validation call.
//!
//! # Design Principles
//!
//! - Tagged-variant tree: kind-specific data lives on the [`FieldKind`] variant
//! - Construction-time checks: malformed trees never reach the validator
//! - Presence is explicit: an absent field is `None`, never a zero value
//! - Validation is pure and deterministic

mod errors;
mod format;
mod types;
mod validator;

pub use errors::{ValidationError, ValidationErrorKind, ValidationResult};
pub use format::DateFormat;
pub use types::{FieldKind, FieldRule, SchemaNode, TYPE_NAMES};
pub use validator::{validate, validate_payload};
