use crate::errors::ToolError;
use crate::http::result::{is_error_payload, RequestResult};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Calls `poll` until `is_ready` accepts a payload, an error payload shows up, or
/// `timeout` elapses.
///
/// The deadline is only checked after an attempt, so the last attempt may start up
/// to one `interval` past it. A readiness check that fails counts as "not ready".
/// `ToolError`s from `poll` itself (bad configuration) propagate unchanged.
pub async fn poll_until<F, Fut, P, E>(
    mut poll: F,
    interval: Duration,
    timeout: Duration,
    mut is_ready: P,
) -> Result<serde_json::Value, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<serde_json::Value, ToolError>>,
    P: FnMut(&serde_json::Value) -> Result<bool, E>,
    E: Display,
{
    let started = Instant::now();
    loop {
        let payload = poll().await?;
        if is_error_payload(&payload) {
            return Ok(payload);
        }
        // Err from the check means "not ready yet".
        if let Ok(true) = is_ready(&payload) {
            return Ok(payload);
        }
        if started.elapsed() > timeout {
            return Ok(RequestResult::poll_timeout().into_payload());
        }
        tokio::time::sleep(interval).await;
    }
}

/// Readiness check used by provisioning flows: the payload mentions `SUCCESS` anywhere.
pub fn mentions_success(payload: &serde_json::Value) -> Result<bool, ToolError> {
    let text = serde_json::to_string(payload)
        .map_err(|err| ToolError::internal(format!("unserializable payload: {}", err)))?;
    Ok(text.to_uppercase().contains("SUCCESS"))
}

#[cfg(test)]
mod tests {
    use super::mentions_success;
    use serde_json::json;

    #[test]
    fn success_marker_is_case_insensitive() {
        assert!(mentions_success(&json!({"events": [{"status": "Success"}]})).unwrap());
        assert!(!mentions_success(&json!({"events": [{"status": "RUNNING"}]})).unwrap());
    }
}
