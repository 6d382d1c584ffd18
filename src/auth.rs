//! Platform authorization codes for third-party login.
//!
//! On device the code comes from the host platform's login capability. The
//! command-line binary reads it from the environment instead.

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};

const WECHAT_CODE_ENV: &str = "STUDYBEAT_WECHAT_CODE";

pub trait AuthCodeProvider: Send + Sync {
    /// Obtains a one-time authorization code. `Ok(None)` means the platform
    /// answered but handed out no code.
    fn request_code(&self) -> BoxFuture<'_, Result<Option<String>>>;
}

/// Provider returning a fixed answer.
pub struct StaticCodeProvider {
    code: Option<String>,
}

impl StaticCodeProvider {
    pub fn new(code: Option<String>) -> Self {
        Self { code }
    }
}

impl AuthCodeProvider for StaticCodeProvider {
    fn request_code(&self) -> BoxFuture<'_, Result<Option<String>>> {
        let code = self.code.clone();
        async move { Ok(code) }.boxed()
    }
}

/// Reads the code from `STUDYBEAT_WECHAT_CODE` each time it is asked.
pub struct EnvCodeProvider;

impl AuthCodeProvider for EnvCodeProvider {
    fn request_code(&self) -> BoxFuture<'_, Result<Option<String>>> {
        async move {
            let code = std::env::var(WECHAT_CODE_ENV)
                .ok()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            tracing::debug!(found = code.is_some(), "Read platform login code");
            Ok(code)
        }
        .boxed()
    }
}
