//! Error types shared by the gateway and the stores.
//!
//! Every network, HTTP and business failure is normalized into an `ApiError`.
//! Callers that need the wire-style rejected shape use `ApiError::to_failure`.

use serde::Serialize;
use thiserror::Error;

/// Code attached to failures that never reached a server response.
pub const LOCAL_FAILURE_CODE: i64 = -1;

/// Business code the backend uses for an expired or missing token.
pub const UNAUTHORIZED_CODE: i64 = 401;

const FALLBACK_MESSAGE: &str = "Request failed";
const NETWORK_MESSAGE: &str = "Network error, please check your connection";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure raised by a transport before any response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("could not read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Request(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server was unreachable or the connection broke.
    #[error("network failure: {0}")]
    Network(String),
    /// Transport status code was not 200.
    #[error("HTTP error: {status}")]
    Http { status: u16 },
    /// Body code outside the accepted set.
    #[error("{message}")]
    Business { code: i64, message: String },
    /// Business code 401. The gateway has already torn down the token.
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("could not encode request payload: {0}")]
    Encode(String),
    /// The body passed validation but did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("File upload failed")]
    Upload(#[source] TransportError),
    #[error("Failed to parse upload response")]
    UploadParse,
    /// A platform capability (auth code, storage) could not deliver.
    #[error("{0}")]
    Capability(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Normalized rejected-result shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiFailure {
    pub code: Option<i64>,
    pub message: String,
    pub success: bool,
}

impl ApiError {
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Http { status } => Some(i64::from(*status)),
            ApiError::Business { code, .. } => Some(*code),
            ApiError::Unauthorized { .. } => Some(UNAUTHORIZED_CODE),
            ApiError::Upload(_) | ApiError::UploadParse => Some(LOCAL_FAILURE_CODE),
            ApiError::Network(_)
            | ApiError::Encode(_)
            | ApiError::Decode(_)
            | ApiError::Capability(_)
            | ApiError::Storage(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Message worth showing verbatim, if the failure carries one.
    ///
    /// Raw network errors are left out so callers fall back to their own text.
    pub fn message(&self) -> Option<String> {
        match self {
            ApiError::Network(_) | ApiError::Decode(_) | ApiError::Storage(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn to_failure(&self) -> ApiFailure {
        ApiFailure {
            code: self.code(),
            message: self.to_string(),
            success: false,
        }
    }

    /// Human-readable text for a transient notification.
    pub fn user_message(&self) -> String {
        user_message(self.code(), self.message().as_deref())
    }
}

/// Fixed lookup from failure code to notification text.
pub fn user_message(code: Option<i64>, message: Option<&str>) -> String {
    let Some(code) = code else {
        return NETWORK_MESSAGE.to_string();
    };

    match code {
        LOCAL_FAILURE_CODE => "Network connection failed".to_string(),
        400 => "Invalid request parameters".to_string(),
        UNAUTHORIZED_CODE => "Unauthorized, please log in first".to_string(),
        403 => "Permission denied".to_string(),
        404 => "The requested resource does not exist".to_string(),
        500 => "Internal server error".to_string(),
        _ => message
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string(),
    }
}
