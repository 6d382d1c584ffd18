//! The wire underneath the gateway.
//!
//! `Transport` is object safe so the gateway can hold `Arc<dyn Transport>`;
//! tests swap in a scripted implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::TransportError;

#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub url: String,
    pub file_path: PathBuf,
    pub field_name: String,
    pub form_data: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>>;

    /// Multipart POST of a single file plus text fields.
    fn upload(&self, request: UploadRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}

/// `reqwest`-backed transport used outside of tests.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        async move {
            let mut builder = self
                .client
                .request(request.method, &request.url)
                .timeout(request.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(TransportResponse { status, body })
        }
        .boxed()
    }

    fn upload(&self, request: UploadRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        async move {
            let bytes = tokio::fs::read(&request.file_path)
                .await
                .map_err(|source| TransportError::File {
                    path: request.file_path.display().to_string(),
                    source,
                })?;
            let file_name = request
                .file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());

            let mut form = Form::new().part(request.field_name.clone(), Part::bytes(bytes).file_name(file_name));
            for (name, value) in request.form_data {
                form = form.text(name, value);
            }

            let mut builder = self.client.post(&request.url);
            // reqwest writes its own multipart content type with the boundary
            for (name, value) in &request.headers {
                if !name.eq_ignore_ascii_case("content-type") {
                    builder = builder.header(name.as_str(), value.as_str());
                }
            }

            let response = builder.multipart(form).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(TransportResponse { status, body })
        }
        .boxed()
    }
}
