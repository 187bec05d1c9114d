use crate::constants::protocols::ALLOWED_HTTP;
use crate::errors::ToolError;
use url::Url;

/// Joins `base` with a `{name}`-templated path, percent-encoding each substituted value
/// as a single path segment.
pub fn build_url(base: &str, template: &str, values: &[(&str, String)]) -> Result<String, ToolError> {
    let mut url = Url::parse(base)
        .map_err(|_| ToolError::configuration(format!("Invalid base URL: {}", base)))?;
    if !scheme_allowed(url.scheme()) {
        return Err(ToolError::configuration(
            "Only http/https base URLs are supported",
        ));
    }
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ToolError::configuration(format!("Base URL cannot carry a path: {}", base)))?;
        segments.pop_if_empty();
        for raw in template.split('/').filter(|segment| !segment.is_empty()) {
            let segment = render_segment(raw, values)?;
            // `push` drops dot segments, which would address a different resource.
            if segment == "." || segment == ".." {
                return Err(ToolError::invalid_params(format!(
                    "path segment '{}' is not allowed",
                    segment
                )));
            }
            segments.push(&segment);
        }
    }
    Ok(url.to_string())
}

fn render_segment(raw: &str, values: &[(&str, String)]) -> Result<String, ToolError> {
    let mut out = String::new();
    let mut rest = raw;
    while let Some(start) = rest.find('{') {
        let (prefix, tail) = rest.split_at(start);
        out.push_str(prefix);
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return Ok(out);
        };
        let name = &tail[1..end];
        let value = values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
            .ok_or_else(|| {
                ToolError::invalid_params(format!("path parameter '{}' has no value", name))
            })?;
        out.push_str(value);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn scheme_allowed(scheme: &str) -> bool {
    ALLOWED_HTTP
        .iter()
        .any(|allowed| allowed.trim_end_matches(':') == scheme)
}
