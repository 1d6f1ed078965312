//! Tool parameter schemas
//!
//! Parameters are declared as [`ParamSpec`] lists over the tagged
//! [`ParamType`]. [`validate`] is pure: it checks arguments against the
//! declaration, fills defaults, and returns the normalized argument object.
//! The same declaration renders to JSON Schema for tool discovery.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    Enum(&'static [&'static str]),
    Array {
        items: Box<ParamType>,
        min_items: usize,
        max_items: usize,
    },
    Object(Vec<ParamSpec>),
}

impl ParamType {
    pub fn integer() -> Self {
        ParamType::Integer {
            min: None,
            max: None,
        }
    }

    pub fn integer_between(min: i64, max: i64) -> Self {
        ParamType::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn array_of(items: ParamType, min_items: usize, max_items: usize) -> Self {
        ParamType::Array {
            items: Box::new(items),
            min_items,
            max_items,
        }
    }

    fn json_type(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum(_) => "string",
            ParamType::Integer { .. } => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array { .. } => "array",
            ParamType::Object(_) => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &'static str, description: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            description,
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &'static str, description: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            description,
            ty,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Arguments rejected before any executor runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("invalid argument `{path}`: {reason}")]
pub struct SchemaViolation {
    /// Dotted location, e.g. `questions[0].options`
    pub path: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: if path.is_empty() {
                "arguments".to_string()
            } else {
                path.to_string()
            },
            reason: reason.into(),
        }
    }
}

/// Validate `args` against `params`, returning the object with defaults applied.
/// `null` arguments count as an empty object; unknown keys are dropped.
pub fn validate(params: &[ParamSpec], args: &Value) -> Result<Value, SchemaViolation> {
    let empty = Map::new();
    let object = match args {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(SchemaViolation::new(
                "",
                format!("expected an object, got {}", type_name(other)),
            ))
        }
    };
    validate_object(params, object, "").map(Value::Object)
}

fn validate_object(
    params: &[ParamSpec],
    object: &Map<String, Value>,
    prefix: &str,
) -> Result<Map<String, Value>, SchemaViolation> {
    let mut out = Map::new();
    for param in params {
        let path = if prefix.is_empty() {
            param.name.to_string()
        } else {
            format!("{}.{}", prefix, param.name)
        };
        match object.get(param.name).filter(|v| !v.is_null()) {
            Some(value) => {
                out.insert(param.name.to_string(), validate_value(&param.ty, value, &path)?);
            }
            None => match &param.default {
                Some(default) => {
                    out.insert(param.name.to_string(), default.clone());
                }
                None if param.required => {
                    return Err(SchemaViolation::new(&path, "required field is missing"));
                }
                None => {}
            },
        }
    }
    Ok(out)
}

fn validate_value(ty: &ParamType, value: &Value, path: &str) -> Result<Value, SchemaViolation> {
    let mismatch = || {
        SchemaViolation::new(
            path,
            format!("expected {}, got {}", ty.json_type(), type_name(value)),
        )
    };

    match ty {
        ParamType::String => value.as_str().map(|_| value.clone()).ok_or_else(mismatch),
        ParamType::Boolean => value.as_bool().map(Value::Bool).ok_or_else(mismatch),
        ParamType::Integer { min, max } => {
            let n = as_integer(value).ok_or_else(mismatch)?;
            if let Some(min) = min.filter(|m| n < *m) {
                return Err(SchemaViolation::new(path, format!("must be at least {}", min)));
            }
            if let Some(max) = max.filter(|m| n > *m) {
                return Err(SchemaViolation::new(path, format!("must be at most {}", max)));
            }
            Ok(Value::from(n))
        }
        ParamType::Enum(allowed) => {
            let s = value.as_str().ok_or_else(mismatch)?;
            if allowed.contains(&s) {
                Ok(value.clone())
            } else {
                Err(SchemaViolation::new(
                    path,
                    format!("must be one of: {}", allowed.join(", ")),
                ))
            }
        }
        ParamType::Array {
            items,
            min_items,
            max_items,
        } => {
            let array = value.as_array().ok_or_else(mismatch)?;
            if array.len() < *min_items || array.len() > *max_items {
                return Err(SchemaViolation::new(
                    path,
                    format!(
                        "must contain {}..={} items, got {}",
                        min_items,
                        max_items,
                        array.len()
                    ),
                ));
            }
            array
                .iter()
                .enumerate()
                .map(|(i, item)| validate_value(items, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        ParamType::Object(fields) => {
            let object = value.as_object().ok_or_else(mismatch)?;
            validate_object(fields, object, path).map(Value::Object)
        }
    }
}

/// Integers, or floats with no fractional part
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// JSON Schema rendering
// ============================================================================

/// JSON Schema representation for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

/// Schema for individual properties in a JSON Schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl PropertySchema {
    fn from_type(ty: &ParamType) -> Self {
        let mut schema = PropertySchema {
            prop_type: ty.json_type().to_string(),
            description: None,
            default: None,
            enum_values: None,
            minimum: None,
            maximum: None,
            items: None,
            min_items: None,
            max_items: None,
            properties: None,
            required: None,
        };
        match ty {
            ParamType::String | ParamType::Boolean => {}
            ParamType::Integer { min, max } => {
                schema.minimum = *min;
                schema.maximum = *max;
            }
            ParamType::Enum(values) => {
                schema.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
            }
            ParamType::Array {
                items,
                min_items,
                max_items,
            } => {
                schema.items = Some(Box::new(PropertySchema::from_type(items)));
                schema.min_items = Some(*min_items);
                schema.max_items = Some(*max_items);
            }
            ParamType::Object(fields) => {
                let rendered = JsonSchema::from_params(fields);
                schema.properties = Some(rendered.properties);
                schema.required = Some(rendered.required);
            }
        }
        schema
    }
}

impl JsonSchema {
    pub fn from_params(params: &[ParamSpec]) -> Self {
        let properties = params
            .iter()
            .map(|p| {
                let mut schema = PropertySchema::from_type(&p.ty);
                schema.description = Some(p.description.to_string());
                schema.default = p.default.clone();
                (p.name.to_string(), schema)
            })
            .collect();
        let required = params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.to_string())
            .collect();
        Self {
            schema_type: "object".to_string(),
            properties,
            required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question_params() -> Vec<ParamSpec> {
        let option = ParamType::Object(vec![
            ParamSpec::optional("id", "Option id", ParamType::String),
            ParamSpec::required("label", "Option label", ParamType::String),
        ]);
        let question = ParamType::Object(vec![
            ParamSpec::required("question", "Question text", ParamType::String),
            ParamSpec::required("options", "Choices", ParamType::array_of(option, 2, 5)),
            ParamSpec::optional("allowCustom", "Free text allowed", ParamType::Boolean)
                .with_default(true),
        ]);
        vec![ParamSpec::required(
            "questions",
            "Questions",
            ParamType::array_of(question, 1, 5),
        )]
    }

    #[test]
    fn test_defaults_applied() {
        let params = vec![
            ParamSpec::required("command", "Command", ParamType::String),
            ParamSpec::optional("timeout", "Timeout", ParamType::integer()).with_default(30_000),
            ParamSpec::optional("cwd", "Directory", ParamType::String),
        ];
        let out = validate(&params, &json!({ "command": "ls", "extra": 1 })).unwrap();
        assert_eq!(out, json!({ "command": "ls", "timeout": 30000 }));
    }

    #[test]
    fn test_missing_and_mistyped() {
        let params = vec![ParamSpec::required("path", "Path", ParamType::String)];
        let err = validate(&params, &Value::Null).unwrap_err();
        assert_eq!(err.path, "path");

        let err = validate(&params, &json!({ "path": 3 })).unwrap_err();
        assert_eq!(err.reason, "expected string, got number");

        let err = validate(&params, &json!(["path"])).unwrap_err();
        assert_eq!(err.path, "arguments");
    }

    #[test]
    fn test_nested_cardinality() {
        let params = question_params();
        let ok = validate(
            &params,
            &json!({ "questions": [{ "question": "Pick", "options": [{ "label": "A" }, { "label": "B" }] }] }),
        )
        .unwrap();
        assert_eq!(ok["questions"][0]["allowCustom"], json!(true));

        let err = validate(
            &params,
            &json!({ "questions": [{ "question": "Pick", "options": [{ "label": "A" }] }] }),
        )
        .unwrap_err();
        assert_eq!(err.path, "questions[0].options");

        let err = validate(&params, &json!({ "questions": [] })).unwrap_err();
        assert_eq!(err.reason, "must contain 1..=5 items, got 0");
    }

    #[test]
    fn test_enum_and_bounds() {
        let params = vec![
            ParamSpec::optional("direction", "Dir", ParamType::Enum(&["up", "down"]))
                .with_default("down"),
            ParamSpec::optional("limit", "Limit", ParamType::integer_between(1, 20)),
        ];
        assert!(validate(&params, &json!({ "direction": "left" })).is_err());
        assert!(validate(&params, &json!({ "limit": 21 })).is_err());
        let out = validate(&params, &json!({ "limit": 5.0 })).unwrap();
        assert_eq!(out, json!({ "direction": "down", "limit": 5 }));
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = JsonSchema::from_params(&question_params());
        let rendered = serde_json::to_value(&schema).unwrap();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["questions"]));
        let questions = &rendered["properties"]["questions"];
        assert_eq!(questions["maxItems"], 5);
        assert_eq!(questions["items"]["properties"]["options"]["minItems"], 2);
        assert_eq!(questions["items"]["properties"]["allowCustom"]["default"], true);
    }
}
