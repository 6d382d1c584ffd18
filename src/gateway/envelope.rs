//! The uniform `{ code, message, data }` body every endpoint returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, UNAUTHORIZED_CODE};

pub const HTTP_OK: u16 = 200;

const SUCCESS_CODES: [i64; 2] = [200, 0];
const FALLBACK_MESSAGE: &str = "Request failed";

fn default_code() -> i64 {
    SUCCESS_CODES[0]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_code")]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        is_success_code(self.code)
    }

    /// Server text from `message`, falling back to `msg`.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().or(self.msg.as_deref())
    }

    /// The payload of a successful response.
    pub fn into_data(self) -> Option<T> {
        if self.is_success() { self.data } else { None }
    }
}

pub fn is_success_code(code: i64) -> bool {
    SUCCESS_CODES.contains(&code)
}

/// Second validation layer: the business code embedded in the body.
///
/// A body without a numeric `code` is accepted.
pub fn check_business(body: &Value) -> Result<(), ApiError> {
    let Some(code) = body.get("code").and_then(Value::as_i64) else {
        return Ok(());
    };
    if is_success_code(code) {
        return Ok(());
    }

    let message = ["message", "msg"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_MESSAGE)
        .to_string();

    if code == UNAUTHORIZED_CODE {
        Err(ApiError::Unauthorized { message })
    } else {
        Err(ApiError::Business { code, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_success_sentinels_pass() {
        assert!(check_business(&json!({ "code": 200, "data": 1 })).is_ok());
        assert!(check_business(&json!({ "code": 0, "data": 1 })).is_ok());
        assert!(check_business(&json!({ "data": 1 })).is_ok());
    }

    #[test]
    fn business_failure_uses_message_then_msg() {
        match check_business(&json!({ "code": 500, "msg": "db down" })) {
            Err(ApiError::Business { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "db down");
            }
            other => panic!("unexpected: {other:?}"),
        }
        match check_business(&json!({ "code": 1001 })) {
            Err(ApiError::Business { message, .. }) => assert_eq!(message, "Request failed"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn code_401_is_unauthorized() {
        let err = check_business(&json!({ "code": 401, "message": "token expired" })).unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.code(), Some(401));
    }

    #[test]
    fn envelope_reads_msg_alias() {
        let response: ApiResponse<u32> =
            serde_json::from_value(json!({ "code": 0, "msg": "ok", "data": 3 })).unwrap();
        assert!(response.is_success());
        assert_eq!(response.message(), Some("ok"));
        assert_eq!(response.into_data(), Some(3));
    }
}
