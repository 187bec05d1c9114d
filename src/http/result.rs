use crate::constants::status;
use serde_json::{json, Value};

/// Outcome of one completed `execute` call, after retries.
///
/// Success payloads are the decoded body as-is. Error payloads are wrapped as
/// `{"error": true, "status_code": .., "data": ..}`. Callers rely on that asymmetry.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    pub status_code: u16,
    pub is_error: bool,
    pub payload: Value,
}

impl RequestResult {
    pub fn from_response(status_code: u16, body: &[u8]) -> Self {
        let data = decode_body(status_code, body);
        if status_code >= 400 {
            Self::error(status_code, data)
        } else {
            Self {
                status_code,
                is_error: false,
                payload: data,
            }
        }
    }

    /// Synthetic error result, also used by composite tools for local failures.
    pub fn error(status_code: u16, data: Value) -> Self {
        Self {
            status_code,
            is_error: true,
            payload: error_payload(status_code, data),
        }
    }

    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::error(
            status::TRANSPORT_FAILURE,
            json!({ "message": message.into() }),
        )
    }

    pub fn poll_timeout() -> Self {
        Self::error(status::POLL_TIMEOUT, json!({ "message": "poll timeout" }))
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}

pub fn error_payload(status_code: u16, data: Value) -> Value {
    json!({
        "error": true,
        "status_code": status_code,
        "data": data,
    })
}

pub fn is_error_payload(value: &Value) -> bool {
    matches!(value.get("error"), Some(Value::Bool(true)))
}

fn decode_body(status_code: u16, body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| {
        json!({
            "status_code": status_code,
            "text": String::from_utf8_lossy(body),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_payload_is_returned_unwrapped() {
        let result = RequestResult::from_response(200, br#"{"id":"env-1"}"#);
        assert!(!result.is_error);
        assert_eq!(result.payload, json!({"id": "env-1"}));
    }

    #[test]
    fn error_status_is_wrapped_with_decoded_body() {
        let result = RequestResult::from_response(404, br#"{"error_code":"SVCSTG.00100404"}"#);
        assert!(result.is_error);
        assert_eq!(
            result.payload,
            json!({"error": true, "status_code": 404, "data": {"error_code": "SVCSTG.00100404"}})
        );
        assert!(is_error_payload(&result.payload));
    }

    #[test]
    fn undecodable_body_falls_back_to_raw_text() {
        let result = RequestResult::from_response(204, b"");
        assert_eq!(result.payload, json!({"status_code": 204, "text": ""}));
        let result = RequestResult::from_response(502, b"<html>bad gateway</html>");
        assert_eq!(
            result.payload["data"],
            json!({"status_code": 502, "text": "<html>bad gateway</html>"})
        );
    }

    #[test]
    fn synthetic_results_use_reserved_status_codes() {
        let failure = RequestResult::transport_failure("connection refused");
        assert_eq!(failure.status_code, 599);
        assert_eq!(failure.payload["data"]["message"], "connection refused");
        let timeout = RequestResult::poll_timeout();
        assert_eq!(timeout.payload["status_code"], 408);
        assert_eq!(timeout.payload["data"]["message"], "poll timeout");
    }

    #[test]
    fn only_boolean_true_marks_an_error_payload() {
        assert!(!is_error_payload(&json!({"error": "none"})));
        assert!(!is_error_payload(&json!([1, 2])));
    }
}
