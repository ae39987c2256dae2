//! Schema type definitions
//!
//! Supported kinds:
//! - object: nested mapping with named child nodes
//! - array: homogeneous sequence with a single item node
//! - string: UTF-8 string with optional length bounds and rule
//! - int: integral number with optional value bounds
//! - float: number with optional value bounds
//! - date: string parsed against a configured date format
//!
//! A tree is built once at startup and shared read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;

use super::format::DateFormat;

/// Field kind with the kind-specific payload attached to the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Mapping with named child nodes
    Object {
        /// Child nodes keyed by field name
        children: BTreeMap<String, SchemaNode>,
    },
    /// Sequence where every element matches `items`
    Array {
        /// Element rule (boxed to allow recursive types)
        items: Box<SchemaNode>,
    },
    /// UTF-8 string
    String,
    /// Integral number
    Int,
    /// Any number
    Float,
    /// String holding a date in `format`
    Date {
        /// Precompiled date pattern
        format: DateFormat,
    },
}

impl FieldKind {
    /// Returns the configured type name
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Object { .. } => "object",
            FieldKind::Array { .. } => "array",
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Date { .. } => "date",
        }
    }
}

/// Type names accepted in configuration.
pub const TYPE_NAMES: [&str; 6] = ["object", "array", "string", "int", "float", "date"];

/// Extra named check applied to string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Value must be a syntactically valid email address
    Email,
}

impl FieldRule {
    /// Resolves a configured rule name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "email" => Some(FieldRule::Email),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldRule::Email => "email",
        }
    }
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One field's validation rule, possibly recursive.
///
/// `required` is tri-state: `None` asserts nothing, `Some(true)` demands
/// presence, `Some(false)` explicitly allows absence. `min`/`max` bound the
/// length of strings and arrays and the value of ints and floats.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Field name, back-filled from the configuration key
    pub name: String,
    /// Kind and kind-specific attributes
    pub kind: FieldKind,
    /// Presence requirement
    pub required: Option<bool>,
    /// Lower bound
    pub min: Option<i64>,
    /// Upper bound
    pub max: Option<i64>,
    /// Optional named string rule
    pub rule: Option<FieldRule>,
}

impl SchemaNode {
    /// Creates a node of the given kind with no constraints.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: None,
            min: None,
            max: None,
            rule: None,
        }
    }

    /// Creates a string node
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Creates an int node
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    /// Creates a float node
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Creates a date node parsed with `format`
    pub fn date(name: impl Into<String>, format: DateFormat) -> Self {
        Self::new(name, FieldKind::Date { format })
    }

    /// Creates an object node from its children. Child names are taken
    /// from each child's `name`.
    pub fn object(name: impl Into<String>, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        let children = children
            .into_iter()
            .map(|child| (child.name.clone(), child))
            .collect();
        Self::new(name, FieldKind::Object { children })
    }

    /// Creates an array node whose elements match `items`. The item node
    /// takes the array's name so element errors point at the array.
    pub fn array(name: impl Into<String>, mut items: SchemaNode) -> Self {
        let name = name.into();
        items.name = name.clone();
        Self::new(
            name,
            FieldKind::Array {
                items: Box::new(items),
            },
        )
    }

    /// Creates the synthetic top-level node wrapping a service's field map.
    ///
    /// The root is an explicitly required object with an empty name, so
    /// error paths start at the first configured field.
    pub fn root(children: BTreeMap<String, SchemaNode>) -> Self {
        Self::new("", FieldKind::Object { children }).required()
    }

    /// Marks the node as required
    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Marks the node as explicitly optional
    pub fn optional(mut self) -> Self {
        self.required = Some(false);
        self
    }

    /// Sets the lower bound
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the upper bound
    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Attaches a string rule
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Returns true when presence is demanded
    pub fn is_required(&self) -> bool {
        self.required == Some(true)
    }

    /// Checks the construction-time invariants of this node and every
    /// descendant. Returns the offending field name and a reason.
    pub fn check_structure(&self) -> Result<(), (String, String)> {
        let fail = |reason: &str| Err((self.name.clone(), reason.to_string()));

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return fail("invalid setting of min/max - min > max");
            }
        }

        if self.rule.is_some() && !matches!(self.kind, FieldKind::String) {
            return fail("rules are only supported on string fields");
        }

        match &self.kind {
            FieldKind::Object { children } => {
                if children.is_empty() {
                    return fail("at least one child field must be specified");
                }
                for child in children.values() {
                    child.check_structure()?;
                }
            }
            FieldKind::Array { items } => {
                if self.min.is_some_and(|min| min < 1) {
                    return fail("minimal length of array must be >= 1");
                }
                if self.max.is_some_and(|max| max < 1) {
                    return fail("maximal length of array must be >= 1");
                }
                items.check_structure()?;
            }
            FieldKind::String => {
                if self.min.is_some_and(|min| min < 1) {
                    return fail("minimal string length must be >= 1");
                }
                if self.max.is_some_and(|max| max < 1) {
                    return fail("maximal string length must be >= 1");
                }
            }
            FieldKind::Date { format } => {
                if format.is_empty() {
                    return fail("format must be defined for date type");
                }
            }
            FieldKind::Int | FieldKind::Float => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> SchemaNode {
        SchemaNode::root(
            [
                SchemaNode::string("name").required(),
                SchemaNode::int("age").min(0).max(150),
            ]
            .into_iter()
            .map(|n| (n.name.clone(), n))
            .collect(),
        )
    }

    #[test]
    fn test_root_is_required_object() {
        let root = person();
        assert!(root.is_required());
        assert_eq!(root.kind.type_name(), "object");
        assert!(root.check_structure().is_ok());
    }

    #[test]
    fn test_object_children_keyed_by_name() {
        let node = SchemaNode::object(
            "address",
            [SchemaNode::string("city"), SchemaNode::string("zip")],
        );
        match node.kind {
            FieldKind::Object { children } => {
                assert_eq!(children.keys().collect::<Vec<_>>(), vec!["city", "zip"]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_empty_object_rejected() {
        let node = SchemaNode::object("empty", []);
        let (field, reason) = node.check_structure().unwrap_err();
        assert_eq!(field, "empty");
        assert!(reason.contains("at least one"));
    }

    #[test]
    fn test_nested_violation_reports_innermost_field() {
        let node = SchemaNode::object(
            "outer",
            [SchemaNode::array("tags", SchemaNode::string("items").min(0))],
        );
        let (field, _) = node.check_structure().unwrap_err();
        assert_eq!(field, "tags");
    }

    #[test]
    fn test_min_greater_than_max_rejected() {
        let node = SchemaNode::float("ratio").min(5).max(1);
        assert!(node.check_structure().is_err());
    }

    #[test]
    fn test_rule_on_int_rejected() {
        let node = SchemaNode::int("count").rule(FieldRule::Email);
        assert!(node.check_structure().is_err());
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(FieldRule::from_name("email"), Some(FieldRule::Email));
        assert_eq!(FieldRule::from_name("phone"), None);
        assert_eq!(FieldRule::Email.to_string(), "email");
    }

    #[test]
    fn test_field_kind_names() {
        assert_eq!(FieldKind::String.type_name(), "string");
        assert_eq!(FieldKind::Int.type_name(), "int");
        assert_eq!(FieldKind::Float.type_name(), "float");
        assert_eq!(
            SchemaNode::array("a", SchemaNode::int("items")).kind.type_name(),
            "array"
        );
        for name in TYPE_NAMES {
            assert!(!name.is_empty());
        }
    }
}
