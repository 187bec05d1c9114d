use crate::constants::headers::AUTH_TOKEN;
use crate::constants::spec::JSON_MEDIA_TYPE;
use crate::errors::ToolError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};

/// Auth header on every request; `Content-Type: application/json` only when a body is sent.
pub fn build_headers(token: &str, json_body: bool) -> Result<HeaderMap, ToolError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    insert_header(&mut headers, AUTH_TOKEN, token).map_err(|_| {
        ToolError::configuration("HW_AUTH_TOKEN contains characters not allowed in an HTTP header")
    })?;
    if json_body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
    }
    Ok(headers)
}

pub fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ToolError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ToolError::invalid_params(format!("Invalid header name: {}", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| ToolError::invalid_params(format!("Invalid value for header {}", name)))?;
    headers.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodiless_requests_only_carry_auth() {
        let headers = build_headers("tok", false).expect("headers");
        assert_eq!(headers.get("x-auth-token").unwrap(), "tok");
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn body_requests_add_json_content_type() {
        let headers = build_headers("tok", true).expect("headers");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        assert!(build_headers("tok\nInjected: 1", false).is_err());
    }
}
