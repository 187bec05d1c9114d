use crate::errors::ToolError;
use crate::http::endpoint::build_url;
use crate::http::headers::build_headers;
use crate::http::transport::OutgoingRequest;
use crate::openapi::extractor::{OperationDescriptor, ParamLocation, ParameterDescriptor};
use crate::utils::naming::{sanitize_identifier, stable_hash};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Path,
    Query,
    Body,
}

/// One argument of a generated tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArg {
    /// Argument name as exposed in the input schema.
    pub name: String,
    /// Parameter name on the wire.
    pub source_name: String,
    pub kind: ArgKind,
    pub required: bool,
    pub schema: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Path parameter implied by every template that mentions it.
    pub tenant_param: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            tenant_param: Some(crate::constants::spec::DEFAULT_TENANT_PARAM.to_string()),
        }
    }
}

/// A callable derived from one [`OperationDescriptor`].
#[derive(Debug, Clone)]
pub struct GeneratedTool {
    pub name: String,
    pub description: String,
    pub operation: OperationDescriptor,
    /// Ordered: path, required query, required body, optional query, optional body.
    pub args: Vec<ToolArg>,
}

impl GeneratedTool {
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for arg in &self.args {
            let mut schema = arg.schema.clone();
            if let (Some(description), Some(map)) = (arg.description.as_ref(), schema.as_object_mut()) {
                map.entry("description".to_string())
                    .or_insert_with(|| Value::String(description.clone()));
            }
            properties.insert(arg.name.clone(), schema);
            if arg.required {
                required.push(Value::String(arg.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Placeholders of the template that no argument fills.
    pub fn unbound_placeholders(&self) -> Vec<String> {
        self.operation
            .placeholders()
            .into_iter()
            .filter(|name| {
                !self
                    .args
                    .iter()
                    .any(|arg| arg.kind == ArgKind::Path && arg.source_name == *name)
            })
            .map(str::to_string)
            .collect()
    }

    /// Builds the HTTP request for one invocation.
    pub fn prepare(&self, base_url: &str, args: &Value, token: &str) -> Result<OutgoingRequest, ToolError> {
        let empty = Map::new();
        let args = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ToolError::invalid_params("arguments must be an object")),
        };

        let mut path_values: Vec<(&str, String)> = Vec::new();
        let mut query = Vec::new();
        let mut body = None;

        for arg in &self.args {
            let value = args.get(&arg.name).filter(|value| !value.is_null());
            match arg.kind {
                ArgKind::Path => {
                    let value = value.ok_or_else(|| missing(&arg.name))?;
                    let rendered = scalar_text(&arg.name, value)?;
                    if rendered.is_empty() {
                        return Err(ToolError::invalid_params(format!(
                            "path argument '{}' must not be empty",
                            arg.name
                        )));
                    }
                    path_values.push((arg.source_name.as_str(), rendered));
                }
                ArgKind::Query => match value {
                    Some(value) => {
                        if !arg.required && value.as_str() == Some("") {
                            continue;
                        }
                        push_query(&mut query, &arg.source_name, &arg.name, value)?;
                    }
                    None if arg.required => return Err(missing(&arg.name)),
                    None => {}
                },
                ArgKind::Body => match value {
                    Some(value) => body = Some(value.clone()),
                    None if arg.required => return Err(missing(&arg.name)),
                    None => {}
                },
            }
        }

        let url = build_url(base_url, &self.operation.path_template, &path_values)?;
        let headers = build_headers(token, self.operation.has_body())?;
        Ok(
            OutgoingRequest::new(self.operation.method.to_reqwest(), url, headers)
                .with_query(query)
                .with_body(body),
        )
    }
}

fn missing(name: &str) -> ToolError {
    ToolError::invalid_params(format!("missing required argument '{}'", name))
}

fn scalar_text(name: &str, value: &Value) -> Result<String, ToolError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(ToolError::invalid_params(format!(
            "argument '{}' must be a string, number or boolean",
            name
        ))),
    }
}

// Arrays repeat the key; objects are sent as compact JSON.
fn push_query(
    query: &mut Vec<(String, String)>,
    key: &str,
    name: &str,
    value: &Value,
) -> Result<(), ToolError> {
    match value {
        Value::Array(items) => {
            for item in items.iter().filter(|item| !item.is_null()) {
                query.push((key.to_string(), scalar_text(name, item)?));
            }
        }
        Value::Object(_) => query.push((key.to_string(), value.to_string())),
        other => query.push((key.to_string(), scalar_text(name, other)?)),
    }
    Ok(())
}

/// One tool per operation. Names already in `reserved` (hand-written tools) are
/// never reused; collisions get a stable hash of `METHOD path`, then a counter.
pub fn generate_tools(
    operations: &[OperationDescriptor],
    options: &GeneratorOptions,
    reserved: &HashSet<String>,
) -> Vec<GeneratedTool> {
    let mut taken: HashSet<String> = reserved.clone();
    operations
        .iter()
        .map(|operation| {
            let name = unique_name(operation, &mut taken);
            let description = describe(operation, &name);
            GeneratedTool {
                args: build_args(operation, options),
                name,
                description,
                operation: operation.clone(),
            }
        })
        .collect()
}

fn unique_name(operation: &OperationDescriptor, taken: &mut HashSet<String>) -> String {
    let mut name = sanitize_identifier(&operation.operation_id);
    if name.is_empty() {
        name = format!("op_{}", stable_hash(&operation.operation_id, 12));
    }
    if taken.contains(&name) {
        let signature = format!("{} {}", operation.method, operation.path_template);
        name = format!("{}_{}", name, stable_hash(&signature, 8));
        if taken.contains(&name) {
            let stem = name;
            let mut counter = 2usize;
            name = loop {
                let candidate = format!("{}_{}", stem, counter);
                if !taken.contains(&candidate) {
                    break candidate;
                }
                counter += 1;
            };
        }
    }
    taken.insert(name.clone());
    name
}

fn describe(operation: &OperationDescriptor, name: &str) -> String {
    operation
        .summary
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{} ({} {})",
                name, operation.method, operation.path_template
            )
        })
}

fn build_args(operation: &OperationDescriptor, options: &GeneratorOptions) -> Vec<ToolArg> {
    let mut used: HashSet<String> = HashSet::new();
    let mut claim = |raw: &str, location: &str| {
        let base = sanitize_identifier(raw);
        let name = if used.contains(&base) {
            format!("{}_{}", base, location)
        } else {
            base
        };
        used.insert(name.clone());
        name
    };

    let tenant = options
        .tenant_param
        .as_deref()
        .filter(|tenant| !tenant.is_empty());
    let placeholders = operation.placeholders();

    let mut path_args = Vec::new();
    if let Some(tenant) = tenant {
        let declared = operation
            .parameters
            .iter()
            .any(|param| param.location == ParamLocation::Path && param.name == tenant);
        if placeholders.contains(&tenant) && !declared {
            path_args.push(ToolArg {
                name: claim(tenant, "path"),
                source_name: tenant.to_string(),
                kind: ArgKind::Path,
                required: true,
                schema: json!({"type": "string"}),
                description: Some("Project (tenant) id".to_string()),
            });
        }
    }

    let mut path_params: Vec<_> = operation
        .parameters
        .iter()
        .filter(|param| param.location == ParamLocation::Path)
        .collect();
    // template order first, undeclared-in-template leftovers after
    path_params.sort_by_key(|param| {
        placeholders
            .iter()
            .position(|name| *name == param.name)
            .unwrap_or(usize::MAX)
    });
    for param in path_params {
        path_args.push(ToolArg {
            name: claim(&param.name, "path"),
            source_name: param.name.clone(),
            kind: ArgKind::Path,
            required: true,
            schema: scalar_schema(param.schema.as_ref(), true),
            description: param.description.clone(),
        });
    }

    let query_arg = |param: &ParameterDescriptor, name: String| ToolArg {
        name,
        source_name: param.name.clone(),
        kind: ArgKind::Query,
        required: param.required,
        schema: scalar_schema(param.schema.as_ref(), param.required),
        description: param.description.clone(),
    };
    let mut required_query = Vec::new();
    let mut optional_query = Vec::new();
    for param in operation
        .parameters
        .iter()
        .filter(|param| param.location == ParamLocation::Query)
    {
        let arg = query_arg(param, claim(&param.name, "query"));
        if arg.required {
            required_query.push(arg);
        } else {
            optional_query.push(arg);
        }
    }

    let body_arg = operation.request_body_schema.as_ref().map(|schema| {
        let name = if used.contains("body") {
            "request_body".to_string()
        } else {
            "body".to_string()
        };
        ToolArg {
            name,
            source_name: "body".to_string(),
            kind: ArgKind::Body,
            required: operation.request_body_required,
            schema: body_schema(schema, operation.request_body_required),
            description: Some(body_description(schema)),
        }
    });

    let mut args = path_args;
    args.extend(required_query);
    if let Some(body) = body_arg.as_ref().filter(|body| body.required) {
        args.push(body.clone());
    }
    args.extend(optional_query);
    if let Some(body) = body_arg.filter(|body| !body.required) {
        args.push(body);
    }
    args
}

fn scalar_schema(declared: Option<&Value>, required: bool) -> Value {
    let mut schema = Map::new();
    let kind = declared
        .and_then(|schema| schema.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("string");
    schema.insert("type".to_string(), nullable(kind, required));
    if let Some(values) = declared.and_then(|schema| schema.get("enum")).and_then(Value::as_array) {
        let mut values = values.clone();
        if !required {
            values.push(Value::Null);
        }
        schema.insert("enum".to_string(), Value::Array(values));
    }
    if let Some(description) = declared
        .and_then(|schema| schema.get("description"))
        .and_then(Value::as_str)
    {
        schema.insert("description".to_string(), Value::String(description.to_string()));
    }
    Value::Object(schema)
}

// Only the top-level type is enforced; field-level validation is left to the API.
fn body_schema(declared: &Value, required: bool) -> Value {
    match declared.get("type").and_then(Value::as_str) {
        Some(kind) => json!({"type": nullable(kind, required)}),
        None => json!({}),
    }
}

fn nullable(kind: &str, required: bool) -> Value {
    if required {
        Value::String(kind.to_string())
    } else {
        json!([kind, "null"])
    }
}

fn body_description(schema: &Value) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return "Request body (JSON)".to_string();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let fields: Vec<String> = properties
        .keys()
        .map(|key| {
            if required.contains(&key.as_str()) {
                format!("{}*", key)
            } else {
                key.clone()
            }
        })
        .collect();
    if fields.is_empty() {
        "Request body (JSON object)".to_string()
    } else {
        format!("Request body (JSON object). Fields (* = required): {}", fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::extractor::HttpMethod;

    fn op(method: HttpMethod, path: &str, id: &str) -> OperationDescriptor {
        OperationDescriptor {
            method,
            path_template: path.to_string(),
            operation_id: id.to_string(),
            summary: String::new(),
            parameters: Vec::new(),
            request_body_schema: None,
            request_body_required: false,
        }
    }

    fn query(name: &str, required: bool) -> ParameterDescriptor {
        ParameterDescriptor {
            name: name.to_string(),
            location: ParamLocation::Query,
            required,
            description: None,
            schema: None,
        }
    }

    fn arg_names(tool: &GeneratedTool) -> Vec<&str> {
        tool.args.iter().map(|arg| arg.name.as_str()).collect()
    }

    #[test]
    fn signature_follows_required_then_optional_order() {
        let mut operation = op(HttpMethod::Post, "/v3/{project_id}/cas/environments/{environment_id}/resources", "addResources");
        operation.parameters = vec![
            query("dry_run", false),
            ParameterDescriptor {
                name: "environment_id".to_string(),
                location: ParamLocation::Path,
                required: true,
                description: None,
                schema: None,
            },
            query("mode", true),
        ];
        operation.request_body_schema = Some(json!({"type": "object"}));
        operation.request_body_required = true;

        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        assert_eq!(
            arg_names(&tools[0]),
            vec!["project_id", "environment_id", "mode", "body", "dry_run"]
        );
        let schema = tools[0].input_schema();
        assert_eq!(schema["required"], json!(["project_id", "environment_id", "mode", "body"]));
        assert_eq!(schema["properties"]["dry_run"]["type"], json!(["string", "null"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn optional_body_goes_last() {
        let mut operation = op(HttpMethod::Put, "/v1/items", "putItems");
        operation.parameters = vec![query("limit", false)];
        operation.request_body_schema = Some(json!({}));
        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        assert_eq!(arg_names(&tools[0]), vec!["limit", "body"]);
    }

    #[test]
    fn tenant_param_can_be_disabled() {
        let operation = op(HttpMethod::Get, "/v3/{project_id}/cas/environments", "listEnvironments");
        let options = GeneratorOptions { tenant_param: None };
        let tools = generate_tools(&[operation], &options, &HashSet::new());
        assert!(tools[0].args.is_empty());
        assert_eq!(tools[0].unbound_placeholders(), vec!["project_id".to_string()]);
    }

    #[test]
    fn colliding_names_get_stable_suffixes() {
        let ops = vec![
            op(HttpMethod::Get, "/a", "list"),
            op(HttpMethod::Get, "/b", "list"),
            op(HttpMethod::Get, "/c", ""),
        ];
        let reserved: HashSet<String> = ["list".to_string()].into_iter().collect();
        let tools = generate_tools(&ops, &GeneratorOptions::default(), &reserved);
        assert_eq!(tools[0].name, format!("list_{}", stable_hash("GET /a", 8)));
        assert_eq!(tools[1].name, format!("list_{}", stable_hash("GET /b", 8)));
        assert_eq!(tools[2].name, format!("op_{}", stable_hash("", 12)));

        let again = generate_tools(&ops, &GeneratorOptions::default(), &reserved);
        assert_eq!(tools[0].name, again[0].name);
    }

    #[test]
    fn identical_operations_fall_back_to_counter() {
        let ops = vec![
            op(HttpMethod::Get, "/a", "dup"),
            op(HttpMethod::Get, "/a", "dup"),
            op(HttpMethod::Get, "/a", "dup"),
        ];
        let tools = generate_tools(&ops, &GeneratorOptions::default(), &HashSet::new());
        let hashed = format!("dup_{}", stable_hash("GET /a", 8));
        assert_eq!(tools[0].name, "dup");
        assert_eq!(tools[1].name, hashed);
        assert_eq!(tools[2].name, format!("{}_2", hashed));
    }

    #[test]
    fn prepare_skips_blank_optional_query_and_keeps_required() {
        let mut operation = op(HttpMethod::Get, "/v3/{project_id}/cas/environments", "listEnvironments");
        operation.parameters = vec![query("limit", false), query("name", false), query("offset", true)];
        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        let request = tools[0]
            .prepare(
                "https://ss.example.com",
                &json!({"project_id": "p1", "limit": "", "name": null, "offset": 0}),
                "tok",
            )
            .expect("request");
        assert_eq!(request.url, "https://ss.example.com/v3/p1/cas/environments");
        assert_eq!(request.query, vec![("offset".to_string(), "0".to_string())]);
        assert!(request.body.is_none());
        assert!(request.headers.get("content-type").is_none());
    }

    #[test]
    fn prepare_rejects_missing_or_empty_path_values() {
        let operation = op(HttpMethod::Get, "/v3/{project_id}/x", "x");
        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        assert!(tools[0].prepare("https://a.example.com", &json!({}), "t").is_err());
        assert!(tools[0]
            .prepare("https://a.example.com", &json!({"project_id": ""}), "t")
            .is_err());
    }

    #[test]
    fn body_is_forwarded_with_json_content_type() {
        let mut operation = op(HttpMethod::Post, "/v1/things", "createThing");
        operation.request_body_schema = Some(json!({"type": "object", "properties": {"name": {}}}));
        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        let request = tools[0]
            .prepare("https://a.example.com", &json!({"body": {"name": "n"}}), "t")
            .expect("request");
        assert_eq!(request.body, Some(json!({"name": "n"})));
        assert_eq!(request.headers.get("content-type").unwrap(), "application/json");
        assert_eq!(request.method, reqwest::Method::POST);
    }

    #[test]
    fn body_arg_is_renamed_when_a_parameter_is_called_body() {
        let mut operation = op(HttpMethod::Post, "/v1/things", "createThing");
        operation.parameters = vec![query("body", false)];
        operation.request_body_schema = Some(json!({}));
        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        assert_eq!(arg_names(&tools[0]), vec!["body", "request_body"]);
    }

    #[test]
    fn array_query_values_repeat_the_key() {
        let mut operation = op(HttpMethod::Get, "/v1/things", "listThings");
        operation.parameters = vec![query("id", false)];
        let tools = generate_tools(&[operation], &GeneratorOptions::default(), &HashSet::new());
        let request = tools[0]
            .prepare("https://a.example.com", &json!({"id": ["a", "b"]}), "t")
            .expect("request");
        assert_eq!(
            request.query,
            vec![("id".to_string(), "a".to_string()), ("id".to_string(), "b".to_string())]
        );
    }
}
