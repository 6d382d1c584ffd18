//! Request gateway: every outbound call goes through here.
//!
//! The gateway resolves paths against the base URL, injects headers and the
//! bearer token, unwraps the response envelope and turns every failure into
//! an `ApiError`. A business code 401 tears down the token and schedules a
//! redirect to the login page.

mod envelope;
mod transport;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::notify::{LOGIN_ROUTE, ToastIcon, UiEvents};
use crate::storage::{ACCESS_TOKEN_KEY, KeyValueStore};
use crate::{log_api_request, log_api_result};

pub use envelope::{ApiResponse, HTTP_OK, check_business, is_success_code};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse, UploadRequest};

pub const UNAUTHORIZED_REDIRECT_DELAY: Duration = Duration::from_millis(1500);
const SESSION_EXPIRED_MESSAGE: &str = "Login expired, please log in again";
const CACHE_BUSTER_PARAM: &str = "_t";

/// Per-call overrides.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    /// Skip the user-facing notification on failure.
    pub silent: bool,
}

impl RequestOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

pub struct Gateway {
    base_url: String,
    default_headers: BTreeMap<String, String>,
    timeout: Duration,
    token: RwLock<Option<String>>,
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    events: UiEvents,
}

impl Gateway {
    /// Builds a gateway over `transport`. The token is read lazily from
    /// `storage` until one is set.
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        events: UiEvents,
    ) -> Self {
        Self {
            base_url: config.base_url.clone(),
            default_headers: config.default_headers.clone(),
            timeout: config.timeout,
            token: RwLock::new(None),
            storage,
            transport,
            events,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Token
    // ========================================================================

    /// Stores the token in memory and persists it under `access_token`.
    pub fn set_token(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
        if let Err(e) = self.storage.set(ACCESS_TOKEN_KEY, token) {
            tracing::warn!(error = %e, "Could not persist access token");
        }
    }

    /// In-memory token, else the persisted one, else empty.
    pub fn get_token(&self) -> String {
        if let Some(token) = self.token.read().as_ref() {
            return token.clone();
        }
        self.storage.get(ACCESS_TOKEN_KEY).unwrap_or_default()
    }

    /// Forgets the token in memory and in storage.
    pub fn clear_token(&self) {
        *self.token.write() = None;
        if let Err(e) = self.storage.remove(ACCESS_TOKEN_KEY) {
            tracing::warn!(error = %e, "Could not remove persisted access token");
        }
    }

    // ========================================================================
    // Verbs
    // ========================================================================

    /// GET with `payload` encoded as query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::GET, path, payload, options).await
    }

    /// POST with `payload` as the json body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::POST, path, payload, options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::PUT, path, payload, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::DELETE, path, payload, options).await
    }

    /// Runs one call through both interceptors.
    ///
    /// Failures are logged and, unless `options.silent`, toasted before
    /// being returned.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let operation = format!("{method} {path}");
        let silent = options.silent;

        let request = self.intercept_request(method, path, payload, options);
        log_api_request!(operation, url = %request.url);

        let result = match self.transport.send(request).await {
            Ok(response) => self.intercept_response(response),
            Err(e) => Err(ApiError::Network(e.to_string())),
        };
        log_api_result!(operation, result);

        result.map_err(|e| self.handle_error(e, !silent))
    }

    /// Multipart upload. Bypasses the response interceptor: only the json
    /// shape of the body is checked, and a 401 body is returned as data.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file_path: impl AsRef<Path>,
        field_name: &str,
        extra_fields: BTreeMap<String, String>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let operation = format!("UPLOAD {path}");

        let mut headers = self.default_headers.clone();
        set_header(&mut headers, "Content-Type".to_string(), "multipart/form-data".to_string());
        self.attach_token(&mut headers);

        let request = UploadRequest {
            url: format!("{}{}", self.base_url, path),
            file_path: file_path.as_ref().to_path_buf(),
            field_name: field_name.to_string(),
            form_data: extra_fields,
            headers,
        };
        log_api_request!(operation, url = %request.url, file = %request.file_path.display());

        let result = match self.transport.upload(request).await {
            Ok(response) => {
                serde_json::from_str::<ApiResponse<T>>(&response.body).map_err(|_| ApiError::UploadParse)
            }
            Err(e) => Err(ApiError::Upload(e)),
        };
        log_api_result!(operation, result);
        result
    }

    // ========================================================================
    // Interceptors
    // ========================================================================

    fn intercept_request(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        options: RequestOptions,
    ) -> TransportRequest {
        let mut url = resolve_url(&self.base_url, path);

        let mut headers = self.default_headers.clone();
        for (name, value) in options.headers {
            set_header(&mut headers, name, value);
        }
        self.attach_token(&mut headers);

        let body = if method == Method::GET {
            url = append_query(&url, payload.as_ref());
            url = append_cache_buster(&url, chrono::Utc::now().timestamp_millis());
            None
        } else {
            payload
        };

        TransportRequest {
            method,
            url,
            headers,
            body,
            timeout: options.timeout.unwrap_or(self.timeout),
        }
    }

    fn attach_token(&self, headers: &mut BTreeMap<String, String>) {
        let token = self.get_token();
        if token.is_empty() {
            return;
        }
        if !has_header(headers, "Authorization") {
            headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        if !has_header(headers, "token") {
            headers.insert("token".to_string(), token);
        }
    }

    fn intercept_response<T: DeserializeOwned>(&self, response: TransportResponse) -> Result<ApiResponse<T>, ApiError> {
        if response.status != HTTP_OK {
            return Err(ApiError::Http {
                status: response.status,
            });
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))?;

        if let Err(e) = check_business(&body) {
            if e.is_unauthorized() {
                self.handle_unauthorized();
            }
            return Err(e);
        }

        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn handle_unauthorized(&self) {
        tracing::warn!("Session rejected by server, clearing token");
        self.clear_token();
        self.events.toast(SESSION_EXPIRED_MESSAGE, ToastIcon::None);
        self.events.redirect(LOGIN_ROUTE, UNAUTHORIZED_REDIRECT_DELAY);
    }

    fn handle_error(&self, error: ApiError, notify: bool) -> ApiError {
        tracing::error!(code = ?error.code(), error = %error, "API request error");
        if notify {
            self.events.toast(error.user_message(), ToastIcon::None);
        }
        error
    }
}

/// Serializes a request body or query object.
pub fn payload(value: &impl Serialize) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Encode(e.to_string()))
}

/// Header names compare case-insensitively.
fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Replaces any header with the same name, whatever its casing.
fn set_header(headers: &mut BTreeMap<String, String>, name: String, value: String) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{base_url}{path}")
    }
}

/// Encodes a GET payload object as query parameters. Nulls are skipped.
fn append_query(url: &str, payload: Option<&Value>) -> String {
    let Some(Value::Object(map)) = payload else {
        return url.to_string();
    };
    if map.is_empty() {
        return url.to_string();
    }

    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        tracing::warn!(url, "Could not parse url, dropping query payload");
        return url.to_string();
    };
    {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in map {
            let value = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            pairs.append_pair(key, &value);
        }
    }
    parsed.to_string()
}

fn append_cache_buster(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{CACHE_BUSTER_PARAM}={millis}")
}
