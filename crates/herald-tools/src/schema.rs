//! The small JSON Schema subset tools declare: an object with typed
//! properties, a `required` list, and optional string enums.

use herald_core::{HeraldError, Result};
use serde_json::{Map, Value};

const KNOWN_TYPES: &[&str] = &["string", "integer", "number", "boolean", "array", "object"];

fn schema_err(tool: &str, reason: impl Into<String>) -> HeraldError {
    HeraldError::InvalidToolSchema {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

fn args_err(tool: &str, reason: impl Into<String>) -> HeraldError {
    HeraldError::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

fn properties<'a>(schema: &'a Value) -> Option<&'a Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn required(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Checked once, at registration.
pub fn validate_schema(tool: &str, schema: &Value) -> Result<()> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(schema_err(tool, "top-level type must be \"object\""));
    }
    let Some(props) = properties(schema) else {
        return Err(schema_err(tool, "missing \"properties\" object"));
    };
    for (name, prop) in props {
        let Some(ty) = prop.get("type").and_then(Value::as_str) else {
            return Err(schema_err(tool, format!("property '{name}' has no type")));
        };
        if !KNOWN_TYPES.contains(&ty) {
            return Err(schema_err(tool, format!("property '{name}' has unknown type '{ty}'")));
        }
        if let Some(choices) = prop.get("enum")
            && !choices.as_array().is_some_and(|c| !c.is_empty())
        {
            return Err(schema_err(tool, format!("property '{name}' has an empty enum")));
        }
    }
    if let Some(req) = schema.get("required")
        && !req.is_array()
    {
        return Err(schema_err(tool, "\"required\" must be an array"));
    }
    for name in required(schema) {
        if !props.contains_key(name) {
            return Err(schema_err(tool, format!("required property '{name}' is not declared")));
        }
    }
    Ok(())
}

fn type_matches(ty: &str, value: &Value) -> bool {
    match ty {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

/// Checked before every invocation. Undeclared extra properties are tolerated.
pub fn validate_arguments(tool: &str, schema: &Value, args: &Value) -> Result<()> {
    let Some(obj) = args.as_object() else {
        return Err(args_err(tool, "arguments must be a JSON object"));
    };
    for name in required(schema) {
        if obj.get(name).is_none_or(Value::is_null) {
            return Err(args_err(tool, format!("missing required argument '{name}'")));
        }
    }
    let Some(props) = properties(schema) else {
        return Ok(());
    };
    for (name, value) in obj {
        let Some(prop) = props.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(ty) = prop.get("type").and_then(Value::as_str)
            && !type_matches(ty, value)
        {
            return Err(args_err(tool, format!("argument '{name}' must be of type {ty}")));
        }
        if let Some(choices) = prop.get("enum").and_then(Value::as_array)
            && !choices.contains(value)
        {
            return Err(args_err(tool, format!("argument '{name}' must be one of {}", Value::Array(choices.clone()))));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_schema() {
        assert!(validate_schema("t", &json!({"type": "string"})).is_err());
    }

    #[test]
    fn rejects_undeclared_required() {
        let schema = json!({"type": "object", "properties": {}, "required": ["x"]});
        assert!(validate_schema("t", &schema).is_err());
    }

    #[test]
    fn integer_is_not_string() {
        let schema = json!({
            "type": "object",
            "properties": {"n": {"type": "integer"}},
            "required": ["n"]
        });
        assert!(validate_arguments("t", &schema, &json!({"n": 15})).is_ok());
        assert!(validate_arguments("t", &schema, &json!({"n": "15"})).is_err());
        assert!(validate_arguments("t", &schema, &json!({"n": 1.5})).is_err());
    }

    #[test]
    fn null_required_counts_as_missing() {
        let schema = json!({
            "type": "object",
            "properties": {"to": {"type": "string"}},
            "required": ["to"]
        });
        assert!(validate_arguments("t", &schema, &json!({"to": null})).is_err());
    }
}
