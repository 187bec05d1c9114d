use crate::errors::SpecError;
use serde_json::{Map, Number, Value};
use std::path::Path;

const BUNDLED_DOCUMENT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/servicestage_api.yaml"));

/// A parsed API description. YAML and JSON sources both land here as a JSON tree.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    root: Value,
}

impl ApiDocument {
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        if !path.exists() {
            return Err(SpecError::MissingFile(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&raw)
    }

    /// The ServiceStage environment and auto-tuning API shipped with the binary.
    pub fn bundled() -> Result<Self, SpecError> {
        Self::parse_str(BUNDLED_DOCUMENT)
    }

    pub fn parse_str(raw: &str) -> Result<Self, SpecError> {
        let parsed: serde_yaml::Value = serde_yaml::from_str(raw)?;
        Self::from_value(yaml_to_json(parsed)?)
    }

    pub fn from_value(root: Value) -> Result<Self, SpecError> {
        if !root.is_object() {
            return Err(SpecError::InvalidSpec(
                "document root must be a mapping".to_string(),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn title(&self) -> Option<&str> {
        self.root.pointer("/info/title").and_then(Value::as_str)
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, SpecError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(flag) => Value::Bool(flag),
        serde_yaml::Value::Number(number) => yaml_number(&number),
        serde_yaml::Value::String(text) => Value::String(text),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut out = Map::new();
            for (key, entry) in mapping {
                out.insert(mapping_key(key)?, yaml_to_json(entry)?);
            }
            Value::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

// Response codes are commonly written as bare integers (`200:`).
fn mapping_key(key: serde_yaml::Value) -> Result<String, SpecError> {
    match key {
        serde_yaml::Value::String(text) => Ok(text),
        serde_yaml::Value::Number(number) => Ok(number.to_string()),
        serde_yaml::Value::Bool(flag) => Ok(flag.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => Err(SpecError::InvalidSpec(format!(
            "unsupported mapping key: {:?}",
            other
        ))),
    }
}

fn yaml_number(number: &serde_yaml::Number) -> Value {
    if let Some(value) = number.as_u64() {
        return Value::Number(value.into());
    }
    if let Some(value) = number.as_i64() {
        return Value::Number(value.into());
    }
    number
        .as_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_keys_become_strings_and_order_is_kept() {
        let doc = ApiDocument::parse_str(
            r#"
openapi: 3.0.1
paths:
  /b:
    get:
      responses:
        200:
          description: ok
  /a:
    get: {}
"#,
        )
        .expect("parse");
        let paths: Vec<&String> = doc.root()["paths"].as_object().unwrap().keys().collect();
        assert_eq!(paths, vec!["/b", "/a"]);
        assert!(doc.root().pointer("/paths/~1b/get/responses/200").is_some());
    }

    #[test]
    fn json_documents_are_accepted() {
        let doc = ApiDocument::parse_str(r#"{"info": {"title": "x"}, "paths": {}}"#).expect("json");
        assert_eq!(doc.title(), Some("x"));
    }

    #[test]
    fn scalar_root_is_rejected() {
        assert!(matches!(
            ApiDocument::parse_str("just text"),
            Err(SpecError::InvalidSpec(_))
        ));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = ApiDocument::load(Path::new("/nonexistent/api.yaml")).expect_err("missing");
        assert!(matches!(err, SpecError::MissingFile(_)));
    }

    #[test]
    fn bundled_document_parses() {
        let doc = ApiDocument::bundled().expect("bundled");
        assert!(doc.root()["paths"].as_object().map(|p| !p.is_empty()).unwrap_or(false));
    }
}
