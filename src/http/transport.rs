use crate::config::Settings;
use crate::constants::network::USER_AGENT;
use crate::errors::ToolError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Mutex;

/// A fully built request, independent of the transport that sends it.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl OutgoingRequest {
    pub fn new(method: Method, url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// The peer broke HTTP framing (closed mid-message, truncated body).
    Protocol,
    Closed,
    Other,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    pub fn closed() -> Self {
        Self::new(TransportErrorKind::Closed, "HTTP client is closed")
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect | TransportErrorKind::Protocol
        )
    }
}

/// The single seam between the retrying client and the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, TransportError>;

    /// Releases pooled connections. Later sends fail with [`TransportErrorKind::Closed`].
    async fn close(&self) {}
}

pub struct ReqwestTransport {
    client: Mutex<Option<Client>>,
}

impl ReqwestTransport {
    pub fn new(settings: &Settings) -> Result<Self, ToolError> {
        let mut builder = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10));
        if !settings.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(proxy) = settings.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy).map_err(|err| {
                ToolError::configuration(format!("Invalid proxy URL {}: {}", proxy, err))
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            client: Mutex::new(Some(client)),
        })
    }

    fn client(&self) -> Result<Client, TransportError> {
        let guard = self
            .client
            .lock()
            .map_err(|_| TransportError::new(TransportErrorKind::Other, "HTTP client lock poisoned"))?;
        guard.clone().ok_or_else(TransportError::closed)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, TransportError> {
        let client = self.client()?;
        let mut builder = client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn close(&self) {
        if let Ok(mut guard) = self.client.lock() {
            guard.take();
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_body() || err.is_decode() || err.is_request() {
        TransportErrorKind::Protocol
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}
