use crate::constants::spec::JSON_MEDIA_TYPE;
use crate::errors::SpecError;
use crate::openapi::document::ApiDocument;
use crate::openapi::resolver::Resolver;
use crate::utils::naming::sanitize_identifier;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Case-insensitive; anything outside the five supported verbs is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
}

impl ParamLocation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub description: Option<String>,
    /// Resolved parameter schema; `None` when the document declares none.
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub method: HttpMethod,
    pub path_template: String,
    pub operation_id: String,
    pub summary: String,
    pub parameters: Vec<ParameterDescriptor>,
    /// `Some(json!({}))` for a body declared without a schema.
    pub request_body_schema: Option<Value>,
    pub request_body_required: bool,
}

impl OperationDescriptor {
    pub fn has_body(&self) -> bool {
        self.request_body_schema.is_some()
    }

    /// `{name}` placeholders of the path template, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.path_template.as_str();
        while let Some(start) = rest.find('{') {
            let tail = &rest[start + 1..];
            let Some(end) = tail.find('}') else {
                break;
            };
            let name = &tail[..end];
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
            rest = &tail[end + 1..];
        }
        names
    }
}

/// One descriptor per (path, verb) in document order.
pub fn extract_operations(document: &ApiDocument) -> Result<Vec<OperationDescriptor>, SpecError> {
    let root = document.root();
    let resolver = Resolver::new(root);
    let Some(paths) = root.get("paths") else {
        return Ok(Vec::new());
    };
    let paths = paths
        .as_object()
        .ok_or_else(|| SpecError::InvalidSpec("'paths' must be a mapping".to_string()))?;

    let mut operations = Vec::new();
    for (path, item) in paths {
        let item = resolver.resolve(item)?;
        let Some(item) = item.as_object() else {
            return Err(SpecError::InvalidSpec(format!(
                "path item '{}' must be a mapping",
                path
            )));
        };
        let shared = item.get("parameters").cloned().unwrap_or(Value::Null);
        for (key, meta) in item {
            let Some(method) = HttpMethod::parse(key) else {
                continue;
            };
            operations.push(extract_operation(
                &resolver, path, key, method, meta, &shared,
            )?);
        }
    }
    Ok(operations)
}

fn extract_operation(
    resolver: &Resolver<'_>,
    path: &str,
    raw_method: &str,
    method: HttpMethod,
    meta: &Value,
    shared_parameters: &Value,
) -> Result<OperationDescriptor, SpecError> {
    let operation_id = match meta.get("operationId").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => sanitize_identifier(&format!("{}_{}", raw_method.to_ascii_lowercase(), path)),
    };
    let summary = meta
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let shared = parse_parameters(resolver, shared_parameters)?;
    let own = parse_parameters(resolver, meta.get("parameters").unwrap_or(&Value::Null))?;
    let parameters = merge_parameters(shared, own);

    let (request_body_schema, request_body_required) = match meta.get("requestBody") {
        Some(body) => extract_body(resolver, body)?,
        None => (None, false),
    };

    Ok(OperationDescriptor {
        method,
        path_template: path.to_string(),
        operation_id,
        summary,
        parameters,
        request_body_schema,
        request_body_required,
    })
}

fn parse_parameters(
    resolver: &Resolver<'_>,
    raw: &Value,
) -> Result<Vec<ParameterDescriptor>, SpecError> {
    let Some(items) = raw.as_array() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let param = resolver.resolve(item)?;
        let (Some(name), Some(location)) = (
            param.get("name").and_then(Value::as_str),
            param.get("in").and_then(Value::as_str),
        ) else {
            continue;
        };
        // header and cookie parameters are not exposed as tool arguments
        let Some(location) = ParamLocation::parse(location) else {
            continue;
        };
        let required = location == ParamLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let schema = match param.get("schema") {
            Some(schema) => Some(resolver.resolve_schema(schema)?),
            None => None,
        };
        out.push(ParameterDescriptor {
            name: name.to_string(),
            location,
            required,
            description: param
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            schema,
        });
    }
    Ok(out)
}

/// Path-level parameters first; an operation-level entry with the same
/// (location, name) replaces the earlier one in place.
pub fn merge_parameters(
    shared: Vec<ParameterDescriptor>,
    own: Vec<ParameterDescriptor>,
) -> Vec<ParameterDescriptor> {
    let mut merged: Vec<ParameterDescriptor> = Vec::with_capacity(shared.len() + own.len());
    for param in shared.into_iter().chain(own) {
        match merged
            .iter_mut()
            .find(|known| known.location == param.location && known.name == param.name)
        {
            Some(slot) => *slot = param,
            None => merged.push(param),
        }
    }
    merged
}

fn extract_body(resolver: &Resolver<'_>, raw: &Value) -> Result<(Option<Value>, bool), SpecError> {
    let body = resolver.resolve(raw)?;
    let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
    let media = body.get("content").and_then(Value::as_object).and_then(|content| {
        content
            .get(JSON_MEDIA_TYPE)
            .or_else(|| content.keys().min().and_then(|first| content.get(first)))
    });
    let schema = match media.and_then(|media| media.get("schema")) {
        Some(schema) => resolver.resolve_schema(schema)?,
        None => json!({}),
    };
    Ok((Some(schema), required))
}
