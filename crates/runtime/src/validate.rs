//! Argument validation against a tool's JSON schema.
//!
//! Covers the subset of JSON Schema that tool definitions actually use:
//! `type` (single or list), `required`, `properties`, `enum` and `items`.
//! Unknown keywords are ignored.

use serde_json::Value;

/// Check `value` against `schema`.
///
/// The error names the offending location as a JSON pointer, e.g.
/// `/unit: expected string, found number`.
pub fn validate(schema: &Value, value: &Value) -> Result<(), String> {
    check(schema, value, &mut String::new())
}

fn check(schema: &Value, value: &Value, path: &mut String) -> Result<(), String> {
    let Value::Object(schema) = schema else {
        return Ok(());
    };

    if let Some(expected) = schema.get("type")
        && !matches_type(expected, value)
    {
        return Err(format!(
            "{}: expected {}, found {}",
            pointer(path),
            describe(expected),
            type_of(value)
        ));
    }

    if let Some(Value::Array(allowed)) = schema.get("enum")
        && !allowed.contains(value)
    {
        let allowed = Value::Array(allowed.clone());
        return Err(format!("{}: {value} is not one of {allowed}", pointer(path)));
    }

    match value {
        Value::Object(object) => {
            if let Some(Value::Array(required)) = schema.get("required") {
                for key in required.iter().filter_map(Value::as_str) {
                    if !object.contains_key(key) {
                        return Err(format!(
                            "{}: missing required property '{key}'",
                            pointer(path)
                        ));
                    }
                }
            }

            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (key, field) in object {
                    let Some(sub) = properties.get(key) else {
                        continue;
                    };
                    let len = path.len();
                    path.push('/');
                    path.push_str(key);
                    check(sub, field, path)?;
                    path.truncate(len);
                }
            }
        }
        Value::Array(items) => {
            if let Some(sub) = schema.get("items") {
                for (index, item) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("/{index}"));
                    check(sub, item, path)?;
                    path.truncate(len);
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn matches_type(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => is_type(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| is_type(name, value)),
        _ => true,
    }
}

fn is_type(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.as_f64().is_some_and(|n| n.fract() == 0.0),
        _ => true,
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn pointer(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

#[cfg(test)]
mod tests {
    use super::validate;
    use serde_json::json;

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["city"],
            "properties": {
                "city": { "type": "string" },
                "unit": { "type": "string", "enum": ["celsius", "fahrenheit"] },
                "days": { "type": "integer" },
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        })
    }

    #[test]
    fn accepts_matching_arguments() {
        let args = json!({ "city": "Paris", "unit": "celsius", "days": 3, "tags": ["a"] });
        assert_eq!(validate(&schema(), &args), Ok(()));
    }

    #[test]
    fn reports_missing_required() {
        let err = validate(&schema(), &json!({ "unit": "celsius" })).unwrap_err();
        assert_eq!(err, "/: missing required property 'city'");
    }

    #[test]
    fn reports_nested_path() {
        let err = validate(&schema(), &json!({ "city": "Paris", "tags": ["a", 1] })).unwrap_err();
        assert_eq!(err, "/tags/1: expected string, found number");

        let err = validate(&schema(), &json!({ "city": "Paris", "unit": "kelvin" })).unwrap_err();
        assert!(err.starts_with("/unit: \"kelvin\" is not one of"));
    }

    #[test]
    fn integers_and_unions() {
        assert!(validate(&schema(), &json!({ "city": "x", "days": 2.0 })).is_ok());
        assert!(validate(&schema(), &json!({ "city": "x", "days": 2.5 })).is_err());
        assert!(validate(&json!({ "type": ["string", "null"] }), &json!(null)).is_ok());
    }
}
