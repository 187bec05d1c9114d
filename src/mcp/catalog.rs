use crate::errors::{ErrorCode, McpError, ToolError};
use crate::utils::suggest::suggest;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDef {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Registered tool definitions in registration order, each with a compiled
/// argument validator. Built once at startup, read-only afterwards.
#[derive(Default)]
pub struct ToolCatalog {
    defs: Vec<ToolDef>,
    index: HashMap<String, usize>,
    validators: HashMap<String, JSONSchema>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: ToolDef) -> Result<(), ToolError> {
        if self.index.contains_key(&def.name) {
            return Err(ToolError::internal(format!(
                "Tool '{}' is registered twice",
                def.name
            )));
        }
        let validator = JSONSchema::compile(&def.input_schema).map_err(|err| {
            ToolError::internal(format!("Input schema of '{}' does not compile", def.name))
                .with_details(serde_json::json!({ "error": err.to_string() }))
        })?;
        self.validators.insert(def.name.clone(), validator);
        self.index.insert(def.name.clone(), self.defs.len());
        self.defs.push(def);
        Ok(())
    }

    pub fn list(&self) -> &[ToolDef] {
        &self.defs
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.index.get(name).map(|idx| &self.defs[*idx])
    }

    pub fn names(&self) -> Vec<String> {
        self.defs.iter().map(|def| def.name.clone()).collect()
    }

    /// Unknown tools pass through; the dispatcher reports those.
    pub fn validate(&self, tool_name: &str, args: &Value) -> Result<(), McpError> {
        let (Some(tool), Some(validator)) = (self.get(tool_name), self.validators.get(tool_name))
        else {
            return Ok(());
        };
        if let Err(errors) = validator.validate(args) {
            let message = format_schema_errors(tool_name, args, errors, &tool.input_schema);
            return Err(McpError::new(ErrorCode::InvalidParams, message));
        }
        Ok(())
    }
}

fn format_schema_errors(
    tool_name: &str,
    args: &Value,
    errors: jsonschema::ErrorIterator,
    schema: &Value,
) -> String {
    let mut rendered = Vec::new();
    let mut did_you_means = Vec::new();

    for err in errors.take(10) {
        let instance_path = if err.instance_path.to_string().is_empty() {
            "(root)".to_string()
        } else {
            err.instance_path.to_string()
        };
        match &err.kind {
            jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => {
                let known: Vec<String> = schema_node(schema, &err.schema_path.to_string())
                    .and_then(|parent| parent.get("properties"))
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().collect())
                    .unwrap_or_default();
                for unknown in unexpected {
                    rendered.push(format!("{}: unknown field '{}'", instance_path, unknown));
                    let suggestions = suggest(unknown, &known, 3);
                    if !suggestions.is_empty() {
                        did_you_means.push(format!("{} -> {}", unknown, suggestions.join(", ")));
                    }
                }
            }
            jsonschema::error::ValidationErrorKind::Enum { options } => {
                let allowed: Vec<String> = options
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| {
                                item.as_str()
                                    .map(str::to_string)
                                    .unwrap_or_else(|| item.to_string())
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                rendered.push(format!(
                    "{}: expected one of {}",
                    instance_path,
                    allowed.join(", ")
                ));
                let received = args
                    .pointer(&err.instance_path.to_string())
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let suggestions = suggest(received, &allowed, 3);
                if !suggestions.is_empty() {
                    did_you_means.push(format!("{} -> {}", received, suggestions.join(", ")));
                }
            }
            jsonschema::error::ValidationErrorKind::Required { property } => {
                let name = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                rendered.push(format!(
                    "{}: missing required field '{}'",
                    instance_path, name
                ));
            }
            jsonschema::error::ValidationErrorKind::Type { kind } => {
                rendered.push(format!(
                    "{}: expected {}",
                    instance_path,
                    format_type_kind(kind)
                ));
            }
            _ => rendered.push(format!("{}: {}", instance_path, err)),
        }
    }

    let mut lines = vec![format!("Invalid arguments for {}", tool_name)];
    lines.extend(rendered.iter().map(|line| format!("- {}", line)));
    if !did_you_means.is_empty() {
        lines.push(format!("Did you mean: {}", did_you_means.join(" | ")));
    }
    lines.join("\n")
}

fn format_type_kind(kind: &jsonschema::error::TypeKind) -> String {
    match kind {
        jsonschema::error::TypeKind::Single(primitive) => primitive.to_string(),
        jsonschema::error::TypeKind::Multiple(types) => {
            let list: Vec<String> = (*types).into_iter().map(|t| t.to_string()).collect();
            if list.is_empty() {
                "unknown".to_string()
            } else {
                list.join(" | ")
            }
        }
    }
}

// Parent object of the failing keyword, e.g. "/properties/spec/additionalProperties".
fn schema_node<'a>(schema: &'a Value, schema_path: &str) -> Option<&'a Value> {
    let mut segments: Vec<&str> = schema_path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    let mut current = schema;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
