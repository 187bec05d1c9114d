use crate::constants::retry;
use crate::http::result::RequestResult;
use crate::http::transport::{HttpTransport, OutgoingRequest, TransportError};
use crate::services::logger::Logger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exponential backoff with additive jitter: `base * 2^attempt + U[0, jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(retry::BASE_DELAY_MS),
            jitter: Duration::from_millis(retry::JITTER_MS),
        }
    }
}

impl Backoff {
    /// `attempt` is zero-indexed; `jitter_fraction` is clamped into `[0, 1)`.
    pub fn delay(&self, attempt: u32, jitter_fraction: f64) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(20)).unwrap_or(u32::MAX);
        let fraction = if jitter_fraction.is_finite() {
            jitter_fraction.clamp(0.0, 1.0 - f64::EPSILON)
        } else {
            0.0
        };
        self.base.saturating_mul(factor) + self.jitter.mul_f64(fraction)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        self.delay(attempt, rand::random::<f64>())
    }
}

/// The process-wide HTTP resource shared by every tool.
///
/// Retries only transport failures; any HTTP status, 5xx included, is final.
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    logger: Logger,
    backoff: Backoff,
    default_max_retries: usize,
    closed: AtomicBool,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>, logger: Logger, default_max_retries: usize) -> Self {
        Self {
            transport,
            logger: logger.child("http"),
            backoff: Backoff::default(),
            default_max_retries,
            closed: AtomicBool::new(false),
        }
    }

    pub async fn send(&self, request: OutgoingRequest) -> RequestResult {
        self.execute(request, self.default_max_retries).await
    }

    /// Up to `max_retries + 1` attempts. Exhaustion yields a synthetic 599 result.
    pub async fn execute(&self, request: OutgoingRequest, max_retries: usize) -> RequestResult {
        let attempts = max_retries.saturating_add(1);
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..attempts {
            if self.is_closed() {
                last_error = Some(TransportError::closed());
                break;
            }
            let started = Instant::now();
            match self.transport.send(&request).await {
                Ok(raw) => {
                    let result = RequestResult::from_response(raw.status, &raw.body);
                    self.logger.debug(
                        "HTTP response",
                        Some(&serde_json::json!({
                            "method": request.method.as_str(),
                            "url": request.url,
                            "status": raw.status,
                            "attempt": attempt,
                            "duration_ms": started.elapsed().as_millis() as u64,
                        })),
                    );
                    return result;
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    let has_next = attempt + 1 < attempts;
                    self.logger.warn(
                        "HTTP transport failure",
                        Some(&serde_json::json!({
                            "method": request.method.as_str(),
                            "url": request.url,
                            "attempt": attempt,
                            "kind": format!("{:?}", err.kind).to_lowercase(),
                            "message": err.message,
                            "will_retry": retryable && has_next,
                        })),
                    );
                    last_error = Some(err);
                    if !retryable {
                        break;
                    }
                    if has_next {
                        tokio::time::sleep(self.backoff.next_delay(attempt as u32)).await;
                    }
                }
            }
        }

        let message = last_error
            .map(|err| err.message)
            .unwrap_or_else(|| "network error".to_string());
        RequestResult::transport_failure(message)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idempotent. After this every call resolves to a 599 result.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.transport.close().await;
        self.logger.info("HTTP client closed", None);
    }
}

#[cfg(test)]
mod tests {
    use super::Backoff;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_per_attempt_and_adds_bounded_jitter() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0, 0.0), Duration::from_millis(300));
        assert_eq!(backoff.delay(1, 0.0), Duration::from_millis(600));
        assert_eq!(backoff.delay(2, 0.0), Duration::from_millis(1200));
        let jittered = backoff.delay(1, 0.5);
        assert_eq!(jittered, Duration::from_millis(650));
        assert!(backoff.delay(0, 7.0) < Duration::from_millis(400));
    }

    #[test]
    fn backoff_does_not_overflow_on_large_attempts() {
        let backoff = Backoff::default();
        assert!(backoff.delay(200, 0.0) >= Duration::from_secs(300));
    }
}
