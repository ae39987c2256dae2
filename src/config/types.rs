//! Configuration file model
//!
//! The file holds a JSON array of services:
//!
//! ```json
//! [
//!   {
//!     "name": "people",
//!     "api": { "bearer": "secret", "limits": { "get": "0", "list": "10s", "put": "5m", "delete": "-1" } },
//!     "fields": {
//!       "name": { "type": "string", "required": true, "max": 64 },
//!       "email": { "type": "string", "rule": "email" },
//!       "born": { "type": "date", "format": "2006-01-02" },
//!       "tags": { "type": "array", "items": { "type": "string" } }
//!     }
//!   }
//! ]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{DateFormat, FieldKind, FieldRule, SchemaNode};

use super::errors::{ConfigError, ConfigResult};
use super::limits::{EndpointLimits, Limit};

/// One configured service (resource type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name; URL segment, object-key prefix and collection name
    pub name: String,

    /// API surface settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Top-level fields of the payload
    pub fields: BTreeMap<String, FieldConfig>,
}

/// API settings of a service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer token required by the HTTP layer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<String>,

    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Raw rate-limit strings of the four endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_limit")]
    pub get: String,
    #[serde(default = "default_limit")]
    pub list: String,
    #[serde(default = "default_limit")]
    pub put: String,
    #[serde(default = "default_limit")]
    pub delete: String,
}

// "0" is unlimited
fn default_limit() -> String {
    "0".to_string()
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            get: default_limit(),
            list: default_limit(),
            put: default_limit(),
            delete: default_limit(),
        }
    }
}

/// Raw field definition as written in the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldConfig>>,
}

impl FieldConfig {
    /// Builds the schema node for this field, named `name`.
    ///
    /// Names are back-filled from the enclosing map keys; array items take
    /// the array's name. Every construction-time invariant is checked here so
    /// the validator only ever sees well-formed trees.
    pub fn build(&self, name: &str) -> ConfigResult<SchemaNode> {
        let kind = match self.type_name.as_str() {
            "object" => {
                let fields = self.fields.as_ref().ok_or_else(|| {
                    ConfigError::invalid_field(name, "child fields must be specified")
                })?;
                if fields.is_empty() {
                    return Err(ConfigError::invalid_field(
                        name,
                        "at least one field must be specified",
                    ));
                }
                let children = fields
                    .iter()
                    .map(|(child_name, child)| Ok((child_name.clone(), child.build(child_name)?)))
                    .collect::<ConfigResult<BTreeMap<_, _>>>()?;
                FieldKind::Object { children }
            }
            "array" => {
                let items = self
                    .items
                    .as_ref()
                    .ok_or_else(|| ConfigError::invalid_field(name, "items must be specified"))?;
                FieldKind::Array {
                    items: Box::new(items.build(name)?),
                }
            }
            "string" => FieldKind::String,
            "int" => FieldKind::Int,
            "float" => FieldKind::Float,
            "date" => {
                let source = self.format.as_deref().ok_or_else(|| {
                    ConfigError::invalid_field(name, "format must be defined for date type")
                })?;
                let format =
                    DateFormat::new(source).map_err(|reason| ConfigError::invalid_field(name, reason))?;
                tracing::info!(
                    field = name,
                    format = source,
                    "date field configured; call the endpoint with a sample value to verify the format"
                );
                FieldKind::Date { format }
            }
            other => {
                return Err(ConfigError::UnknownType {
                    field: name.to_string(),
                    type_name: other.to_string(),
                })
            }
        };

        if self.fields.is_some() && !matches!(kind, FieldKind::Object { .. }) {
            return Err(ConfigError::invalid_field(
                name,
                "fields are only allowed on object fields",
            ));
        }
        if self.items.is_some() && !matches!(kind, FieldKind::Array { .. }) {
            return Err(ConfigError::invalid_field(
                name,
                "items are only allowed on array fields",
            ));
        }
        if self.format.is_some() && !matches!(kind, FieldKind::Date { .. }) {
            return Err(ConfigError::invalid_field(
                name,
                "format is only allowed on date fields",
            ));
        }

        let rule = match self.rule.as_deref() {
            Some(rule) => Some(FieldRule::from_name(rule).ok_or_else(|| ConfigError::UnknownRule {
                field: name.to_string(),
                rule: rule.to_string(),
            })?),
            None => None,
        };

        let node = SchemaNode {
            name: name.to_string(),
            kind,
            required: self.required,
            min: self.min,
            max: self.max,
            rule,
        };

        node.check_structure()
            .map_err(|(field, reason)| ConfigError::invalid_field(field, reason))?;

        Ok(node)
    }
}

impl ServiceConfig {
    /// Builds the synthetic root node wrapping the configured field map.
    pub fn schema(&self) -> ConfigResult<SchemaNode> {
        if self.fields.is_empty() {
            return Err(ConfigError::invalid_field(
                &self.name,
                "at least one field must be specified",
            ));
        }

        let children = self
            .fields
            .iter()
            .map(|(name, field)| Ok((name.clone(), field.build(name)?)))
            .collect::<ConfigResult<BTreeMap<_, _>>>()?;

        Ok(SchemaNode::root(children))
    }

    /// Parses the four endpoint limits.
    pub fn limits(&self) -> ConfigResult<EndpointLimits> {
        let parse = |endpoint: &'static str, value: &str| {
            value.parse::<Limit>().map_err(|_| ConfigError::InvalidLimit {
                service: self.name.clone(),
                endpoint,
                value: value.to_string(),
            })
        };

        let limits = &self.api.limits;
        Ok(EndpointLimits {
            get: parse("GET", &limits.get)?,
            list: parse("LIST", &limits.list)?,
            put: parse("PUT", &limits.put)?,
            delete: parse("DELETE", &limits.delete)?,
        })
    }
}
