use crate::errors::SpecError;
use serde_json::{Map, Value};

/// Inlines same-document `$ref`s and flattens `allOf` object compositions.
///
/// Only `#/...` JSON pointers are accepted. Reference cycles are reported as
/// [`SpecError::InvalidSpec`] instead of being expanded forever.
pub struct Resolver<'a> {
    root: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Deep copy of `node` with every `$ref` replaced by its (resolved) target.
    pub fn resolve(&self, node: &Value) -> Result<Value, SpecError> {
        self.resolve_inner(node, &mut Vec::new())
    }

    /// [`Resolver::resolve`] followed by `allOf` flattening at every depth.
    pub fn resolve_schema(&self, schema: &Value) -> Result<Value, SpecError> {
        let resolved = self.resolve(schema)?;
        Ok(flatten_all_of(&resolved))
    }

    /// Merges the members of an `allOf` list into one object schema.
    pub fn merge_all_of(&self, members: &[Value]) -> Result<Value, SpecError> {
        let resolved = members
            .iter()
            .map(|member| self.resolve_schema(member))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(merge_object_members(&resolved))
    }

    fn resolve_inner(&self, node: &Value, in_flight: &mut Vec<String>) -> Result<Value, SpecError> {
        match node {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref") {
                    let reference = reference.as_str().ok_or_else(|| {
                        SpecError::InvalidSpec(format!("$ref must be a string, got {}", reference))
                    })?;
                    if in_flight.iter().any(|seen| seen == reference) {
                        return Err(SpecError::InvalidSpec(format!(
                            "cyclic $ref: {} -> {}",
                            in_flight.join(" -> "),
                            reference
                        )));
                    }
                    let target = self.lookup(reference)?;
                    in_flight.push(reference.to_string());
                    let resolved = self.resolve_inner(target, in_flight);
                    in_flight.pop();
                    return resolved;
                }
                let mut out = Map::new();
                for (key, entry) in map {
                    out.insert(key.clone(), self.resolve_inner(entry, in_flight)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_inner(item, in_flight))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn lookup(&self, reference: &str) -> Result<&'a Value, SpecError> {
        let Some(rest) = reference.strip_prefix("#/") else {
            return Err(SpecError::UnsupportedReference(reference.to_string()));
        };
        self.root
            .pointer(&format!("/{}", rest))
            .ok_or_else(|| SpecError::InvalidSpec(format!("unresolvable $ref: {}", reference)))
    }
}

/// Replaces every `{"allOf": [...]}` node (nested ones first) with its merged object schema.
pub fn flatten_all_of(node: &Value) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(Value::Array(members)) = map.get("allOf") {
                let flattened: Vec<Value> = members.iter().map(flatten_all_of).collect();
                return merge_object_members(&flattened);
            }
            Value::Object(
                map.iter()
                    .map(|(key, entry)| (key.clone(), flatten_all_of(entry)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(flatten_all_of).collect()),
        other => other.clone(),
    }
}

/// Object members contribute properties (later wins) and required names (union);
/// other members are ignored. An empty `required` is left out.
pub fn merge_object_members(members: &[Value]) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();
    for member in members {
        if member.get("type").and_then(Value::as_str) != Some("object") {
            continue;
        }
        if let Some(props) = member.get("properties").and_then(Value::as_object) {
            for (name, schema) in props {
                properties.insert(name.clone(), schema.clone());
            }
        }
        if let Some(names) = member.get("required").and_then(Value::as_array) {
            for name in names.iter().filter_map(Value::as_str) {
                if !required.iter().any(|known| known == name) {
                    required.push(name.to_string());
                }
            }
        }
    }

    let mut out = Map::new();
    out.insert("type".to_string(), Value::String("object".to_string()));
    out.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        out.insert(
            "required".to_string(),
            Value::Array(required.into_iter().map(Value::String).collect()),
        );
    }
    Value::Object(out)
}
