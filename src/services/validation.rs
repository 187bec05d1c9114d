use crate::errors::ToolError;
use serde_json::{Map, Value};

/// Typed accessors over a tool's JSON arguments.
#[derive(Clone, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(&self, args: &Value, key: &str) -> Result<String, ToolError> {
        let text = args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be a non-empty string", key)))?;
        Ok(text.to_string())
    }

    /// Absent, null and blank values all read as `None`.
    pub fn optional_string(&self, args: &Value, key: &str) -> Result<Option<String>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
            Some(_) => Err(ToolError::invalid_params(format!("{} must be a string", key))),
        }
    }

    pub fn integer_or(&self, args: &Value, key: &str, fallback: u64) -> Result<u64, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(fallback),
            Some(value) => value
                .as_u64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
                .ok_or_else(|| {
                    ToolError::invalid_params(format!("{} must be a non-negative integer", key))
                }),
        }
    }

    pub fn ensure_integer(&self, args: &Value, key: &str) -> Result<u64, ToolError> {
        if args.get(key).map_or(true, Value::is_null) {
            return Err(ToolError::invalid_params(format!("{} is required", key)));
        }
        self.integer_or(args, key, 0)
    }

    pub fn bool_or(&self, args: &Value, key: &str, fallback: bool) -> Result<bool, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(fallback),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(_) => Err(ToolError::invalid_params(format!("{} must be a boolean", key))),
        }
    }

    pub fn ensure_object(&self, args: &Value, key: &str) -> Result<Map<String, Value>, ToolError> {
        args.get(key)
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an object", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_trimmed_and_blank_is_missing() {
        let v = Validation::new();
        let args = json!({"name": "  env-a ", "empty": "  ", "n": 3});
        assert_eq!(v.ensure_string(&args, "name").unwrap(), "env-a");
        assert!(v.ensure_string(&args, "empty").is_err());
        assert_eq!(v.optional_string(&args, "empty").unwrap(), None);
        assert!(v.optional_string(&args, "n").is_err());
    }

    #[test]
    fn integers_accept_numeric_strings_and_fall_back() {
        let v = Validation::new();
        let args = json!({"limit": "20", "offset": null, "bad": -1});
        assert_eq!(v.integer_or(&args, "limit", 100).unwrap(), 20);
        assert_eq!(v.integer_or(&args, "offset", 0).unwrap(), 0);
        assert!(v.integer_or(&args, "bad", 0).is_err());
        assert!(v.ensure_integer(&args, "missing").is_err());
    }
}
