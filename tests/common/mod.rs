#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use servicestage_mcp::config::Settings;
use servicestage_mcp::http::transport::TransportErrorKind;
use servicestage_mcp::http::{HttpTransport, OutgoingRequest, RawResponse, TransportError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const SS_BASE: &str = "https://ss.test";
pub const CAE_BASE: &str = "https://cae.test";
pub const FG_BASE: &str = "https://fg.test";

pub fn test_settings() -> Settings {
    Settings {
        auth_token: Some("test-token".to_string()),
        servicestage_base: SS_BASE.to_string(),
        cae_base: CAE_BASE.to_string(),
        functiongraph_base: FG_BASE.to_string(),
        ..Settings::default()
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub at: Instant,
    pub request: OutgoingRequest,
}

/// Replays scripted outcomes in order and records every request it sees.
#[derive(Default)]
pub struct MockTransport {
    script: StdMutex<VecDeque<Result<RawResponse, TransportError>>>,
    seen: StdMutex<Vec<Recorded>>,
    closed: StdMutex<bool>,
    stalled: AtomicBool,
    abandoned: AtomicUsize,
}

/// Counts sends whose future was dropped before an answer came.
struct AbandonGuard<'a>(&'a AtomicUsize);

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(RawResponse {
            status,
            body: body.to_string().into_bytes(),
        }))
    }

    pub fn push_raw(&self, status: u16, body: &str) -> &Self {
        self.push(Ok(RawResponse {
            status,
            body: body.as_bytes().to_vec(),
        }))
    }

    pub fn push_error(&self, kind: TransportErrorKind, message: &str) -> &Self {
        self.push(Err(TransportError::new(kind, message)))
    }

    fn push(&self, outcome: Result<RawResponse, TransportError>) -> &Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Every later send is recorded and then never answered.
    pub fn stall(&self) -> &Self {
        self.stalled.store(true, Ordering::SeqCst);
        self
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(Recorded {
            at: Instant::now(),
            request: request.clone(),
        });
        if self.stalled.load(Ordering::SeqCst) {
            let _guard = AbandonGuard(&self.abandoned);
            std::future::pending::<()>().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new(TransportErrorKind::Other, "script exhausted")))
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}
