//! Validation error types
//!
//! Every failure names the innermost offending field. While the error unwinds
//! through enclosing objects and arrays the enclosing names are prepended to
//! a best-effort path (`address.city`, `tags[2]`).

use std::fmt;

use thiserror::Error;

/// What was wrong with a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationErrorKind {
    #[error("required")]
    MissingRequiredField,

    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("could not convert {value} to int")]
    NotAnInteger { value: f64 },

    #[error("min '{min}' length required")]
    TooShort { min: i64 },

    #[error("max '{max}' length allowed")]
    TooLong { max: i64 },

    #[error("at least {min} item(s) required")]
    TooFewItems { min: i64 },

    #[error("at most {max} item(s) allowed")]
    TooManyItems { max: i64 },

    #[error("minimum is {min}")]
    BelowMinimum { min: i64 },

    #[error("maximum is {max}")]
    AboveMaximum { max: i64 },

    #[error("{reason}")]
    InvalidFormat { reason: String },
}

impl ValidationErrorKind {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::NotAnInteger { .. } => "NOT_AN_INTEGER",
            Self::TooShort { .. } => "TOO_SHORT",
            Self::TooLong { .. } => "TOO_LONG",
            Self::TooFewItems { .. } => "TOO_FEW_ITEMS",
            Self::TooManyItems { .. } => "TOO_MANY_ITEMS",
            Self::BelowMinimum { .. } => "BELOW_MINIMUM",
            Self::AboveMaximum { .. } => "ABOVE_MAXIMUM",
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
        }
    }
}

/// A payload failed validation against a schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Innermost field name
    field: String,
    /// Enclosing path segments, outermost first, ending with `field`
    path: Vec<String>,
    /// Failure kind
    kind: ValidationErrorKind,
}

impl ValidationError {
    /// Creates an error for `field`
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        let field = field.into();
        let path = if field.is_empty() {
            Vec::new()
        } else {
            vec![field.clone()]
        };
        Self { field, path, kind }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::MissingRequiredField)
    }

    pub fn type_mismatch(field: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::new(field, ValidationErrorKind::TypeMismatch { expected, actual })
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidFormat {
                reason: reason.into(),
            },
        )
    }

    /// Prepends an enclosing segment to the path. Empty segments (the
    /// synthetic root) are skipped.
    pub(crate) fn within(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if !segment.is_empty() {
            self.path.insert(0, segment);
        }
        self
    }

    /// Marks the error as raised by element `index` of the enclosing
    /// array. Array items carry the array's name, so the leading segment
    /// becomes `name[index]`.
    pub(crate) fn at_index(mut self, index: usize) -> Self {
        match self.path.first_mut() {
            Some(first) => first.push_str(&format!("[{index}]")),
            None => self.path.push(format!("[{index}]")),
        }
        self
    }

    /// Returns the innermost field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the dotted path to the field
    pub fn path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }

    /// Returns the failure kind
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Status code for the HTTP layer
    pub fn status_code(&self) -> u16 {
        400
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {:?}: {}", self.path(), self.kind)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;
