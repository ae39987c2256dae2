//! Payload validation against a schema tree
//!
//! Validation semantics:
//! - An absent value fails only when the node is required; otherwise nothing
//!   else is checked
//! - Present values must match the node kind exactly (no coercion), except
//!   that ints arrive as JSON numbers and only need an integral value
//! - Object children are validated in name order; undeclared keys are ignored
//! - Array elements are always present and are validated against `items`
//! - The first failure aborts validation
//!
//! Validation is a pure function of (node, value, presence); it holds no
//! state and never logs.

use std::collections::BTreeMap;

use lettre::message::Mailbox;
use serde_json::{Map, Value};

use super::errors::{ValidationError, ValidationErrorKind, ValidationResult};
use super::format::DateFormat;
use super::types::{FieldKind, FieldRule, SchemaNode};

/// Validates `value` against `node`.
///
/// `None` means the field is absent from its enclosing object, which is
/// different from a present `null`.
pub fn validate(node: &SchemaNode, value: Option<&Value>) -> ValidationResult<()> {
    let value = match value {
        Some(value) => value,
        None if node.is_required() => return Err(ValidationError::missing(&node.name)),
        None => return Ok(()),
    };

    match &node.kind {
        FieldKind::Object { children } => {
            let object = value
                .as_object()
                .ok_or_else(|| type_error(node, value))?;
            validate_object(node, children, object)
        }
        FieldKind::Array { items } => {
            let elements = value.as_array().ok_or_else(|| type_error(node, value))?;
            validate_array_length(node, elements.len())?;
            for (index, element) in elements.iter().enumerate() {
                validate(items, Some(element)).map_err(|e| e.at_index(index))?;
            }
            Ok(())
        }
        FieldKind::String => {
            let text = value.as_str().ok_or_else(|| type_error(node, value))?;
            validate_string(node, text)
        }
        FieldKind::Date { format } => {
            let text = value.as_str().ok_or_else(|| type_error(node, value))?;
            validate_date(node, format, text)
        }
        FieldKind::Int => {
            let number = value.as_f64().ok_or_else(|| type_error(node, value))?;
            if !number.is_finite() || number.fract() != 0.0 {
                return Err(ValidationError::new(
                    &node.name,
                    ValidationErrorKind::NotAnInteger { value: number },
                ));
            }
            validate_bounds(node, number)
        }
        FieldKind::Float => {
            let number = value.as_f64().ok_or_else(|| type_error(node, value))?;
            validate_bounds(node, number)
        }
    }
}

/// Validates a whole payload against a service's root node.
pub fn validate_payload(root: &SchemaNode, payload: &Value) -> ValidationResult<()> {
    validate(root, Some(payload))
}

fn validate_object(
    node: &SchemaNode,
    children: &BTreeMap<String, SchemaNode>,
    object: &Map<String, Value>,
) -> ValidationResult<()> {
    for (name, child) in children {
        validate(child, object.get(name)).map_err(|e| e.within(&node.name))?;
    }
    Ok(())
}

fn validate_array_length(node: &SchemaNode, len: usize) -> ValidationResult<()> {
    let len = len as i64;

    // a required array must not be empty
    let mut min = node.min.unwrap_or(0);
    if node.is_required() && min < 1 {
        min = 1;
    }

    if len < min {
        return Err(ValidationError::new(
            &node.name,
            ValidationErrorKind::TooFewItems { min },
        ));
    }

    if let Some(max) = node.max.filter(|max| *max > 0) {
        if len > max {
            return Err(ValidationError::new(
                &node.name,
                ValidationErrorKind::TooManyItems { max },
            ));
        }
    }

    Ok(())
}

/// Length bounds count Unicode scalar values, not UTF-8 bytes.
fn validate_string(node: &SchemaNode, value: &str) -> ValidationResult<()> {
    let length = value.chars().count() as i64;

    if node.is_required() && length == 0 {
        return Err(ValidationError::missing(&node.name));
    }

    if let Some(min) = node.min.filter(|min| *min > 0) {
        if length < min {
            return Err(ValidationError::new(
                &node.name,
                ValidationErrorKind::TooShort { min },
            ));
        }
    }

    if let Some(max) = node.max.filter(|max| *max > 0) {
        if length > max {
            return Err(ValidationError::new(
                &node.name,
                ValidationErrorKind::TooLong { max },
            ));
        }
    }

    match node.rule {
        Some(FieldRule::Email) if length > 0 => {
            if value.parse::<Mailbox>().is_err() {
                return Err(ValidationError::invalid_format(
                    &node.name,
                    "valid email address required",
                ));
            }
        }
        _ => {}
    }

    Ok(())
}

fn validate_date(node: &SchemaNode, format: &DateFormat, value: &str) -> ValidationResult<()> {
    if node.is_required() && value.is_empty() {
        return Err(ValidationError::missing(&node.name));
    }

    if format.is_empty() {
        return Err(ValidationError::invalid_format(
            &node.name,
            "format is required for date type",
        ));
    }

    if !value.is_empty() && !format.matches(value) {
        return Err(ValidationError::invalid_format(
            &node.name,
            format!("could not parse date {:?} using format {:?}", value, format.source()),
        ));
    }

    Ok(())
}

fn validate_bounds(node: &SchemaNode, value: f64) -> ValidationResult<()> {
    if let Some(min) = node.min {
        if value < min as f64 {
            return Err(ValidationError::new(
                &node.name,
                ValidationErrorKind::BelowMinimum { min },
            ));
        }
    }

    if let Some(max) = node.max {
        if value > max as f64 {
            return Err(ValidationError::new(
                &node.name,
                ValidationErrorKind::AboveMaximum { max },
            ));
        }
    }

    Ok(())
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a type mismatch error.
fn type_error(node: &SchemaNode, actual: &Value) -> ValidationError {
    ValidationError::type_mismatch(&node.name, node.kind.type_name(), json_type_name(actual))
}
