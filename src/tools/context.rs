use crate::config::{Backend, Settings};
use crate::errors::ToolError;
use crate::http::endpoint::build_url;
use crate::http::headers::{build_headers, insert_header};
use crate::http::{HttpClient, OutgoingRequest};
use crate::services::logger::Logger;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Shared dependencies handed to every tool at construction time.
#[derive(Clone)]
pub struct ToolContext {
    pub settings: Arc<Settings>,
    pub http: Arc<HttpClient>,
    pub logger: Logger,
}

impl ToolContext {
    pub fn new(settings: Arc<Settings>, http: Arc<HttpClient>, logger: Logger) -> Self {
        Self {
            settings,
            http,
            logger,
        }
    }

    pub fn url(
        &self,
        backend: Backend,
        template: &str,
        values: &[(&str, String)],
    ) -> Result<String, ToolError> {
        build_url(self.settings.base_url(backend), template, values)
    }

    /// Fails with a configuration error when no auth token is set.
    pub fn headers(&self, json_body: bool) -> Result<HeaderMap, ToolError> {
        build_headers(self.settings.auth_token()?, json_body)
    }

    pub fn headers_with(&self, json_body: bool, extra: &[(&str, &str)]) -> Result<HeaderMap, ToolError> {
        let mut headers = self.headers(json_body)?;
        for (name, value) in extra {
            insert_header(&mut headers, name, value)?;
        }
        Ok(headers)
    }

    /// Sends one request and returns the shaped payload; transport and HTTP
    /// failures come back as `{"error": true, ...}` data.
    pub async fn call(&self, request: OutgoingRequest) -> Value {
        self.http.send(request).await.into_payload()
    }

    pub async fn get(&self, url: String, query: Vec<(String, String)>) -> Result<Value, ToolError> {
        let request = OutgoingRequest::new(Method::GET, url, self.headers(false)?).with_query(query);
        Ok(self.call(request).await)
    }

    pub async fn send_json(&self, method: Method, url: String, body: Value) -> Result<Value, ToolError> {
        let request = OutgoingRequest::new(method, url, self.headers(true)?).with_body(Some(body));
        Ok(self.call(request).await)
    }

    /// POST without a body, so no JSON content type.
    pub async fn post_empty(&self, url: String) -> Result<Value, ToolError> {
        let request = OutgoingRequest::new(Method::POST, url, self.headers(false)?);
        Ok(self.call(request).await)
    }
}
