//! Session store: who is logged in, with which token, and the actions that
//! change it.
//!
//! Actions catch failures at their boundary. They log, queue a notification
//! and hand the caller a plain success flag, so the UI never sees a raw
//! transport error. The loading flag is cleared on every exit path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::api::AuthApi;
use crate::auth::AuthCodeProvider;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::notify::{LOGIN_ROUTE, ToastIcon, UiEvents};
use crate::storage::{ACCESS_TOKEN_KEY, KeyValueStore, REFRESH_TOKEN_KEY, USER_INFO_KEY};

use super::types::{LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, User, UserStats};

pub const LOGOUT_REDIRECT_DELAY: Duration = Duration::from_millis(1000);

/// Refresh when fewer than this many seconds of token lifetime remain.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Snapshot of the authentication state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: String,
    pub is_logged_in: bool,
    pub stats: Option<UserStats>,
}

pub struct SessionStore {
    session: Session,
    loading: bool,
    expires_at: Option<DateTime<Utc>>,
    gateway: Arc<Gateway>,
    auth_api: AuthApi,
    storage: Arc<dyn KeyValueStore>,
    events: UiEvents,
    code_provider: Arc<dyn AuthCodeProvider>,
}

impl SessionStore {
    /// Builds an empty store. Call `auto_login` to restore a persisted session.
    pub fn new(
        gateway: Arc<Gateway>,
        storage: Arc<dyn KeyValueStore>,
        events: UiEvents,
        code_provider: Arc<dyn AuthCodeProvider>,
    ) -> Self {
        Self {
            session: Session::default(),
            loading: false,
            expires_at: None,
            auth_api: AuthApi::new(gateway.clone()),
            gateway,
            storage,
            events,
            code_provider,
        }
    }

    // ========================================================================
    // Readers
    // ========================================================================

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    pub fn token(&self) -> &str {
        &self.session.token
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in
    }

    pub fn stats(&self) -> Option<&UserStats> {
        self.session.stats.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// True when a non-empty token is held in memory.
    pub fn has_token(&self) -> bool {
        !self.session.token.is_empty()
    }

    /// True when the user carries a non-empty student id.
    pub fn is_student(&self) -> bool {
        self.session
            .user
            .as_ref()
            .and_then(|u| u.student_id.as_deref())
            .is_some_and(|id| !id.is_empty())
    }

    /// Token expiry as reported by the last login or refresh.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    // ========================================================================
    // Local state
    // ========================================================================

    /// Restores token and user from device storage.
    pub fn init_user_state(&mut self) {
        if let Some(token) = self.storage.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty()) {
            self.session.token = token;
            self.session.is_logged_in = true;
        }

        if let Some(raw) = self.storage.get(USER_INFO_KEY) {
            match serde_json::from_str::<User>(&raw) {
                Ok(user) => self.session.user = Some(user),
                Err(e) => {
                    tracing::error!(error = %e, "Stored user is unreadable, clearing session");
                    self.clear_user_state();
                }
            }
        }

        tracing::debug!(logged_in = self.session.is_logged_in, "Session restored");
    }

    /// Drops the session from memory and from all three storage keys.
    pub fn clear_user_state(&mut self) {
        self.session = Session::default();
        self.expires_at = None;
        self.gateway.clear_token();
        for key in [USER_INFO_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Could not remove stored session key");
            }
        }
    }

    fn save_user_state(&mut self, login: LoginResponse) {
        self.gateway.set_token(&login.token);
        self.persist_user(&login.user);
        if let Some(refresh_token) = &login.refresh_token {
            self.persist(REFRESH_TOKEN_KEY, refresh_token);
        }

        self.expires_at = expiry_from(login.expires_in);
        self.session.is_logged_in = !login.token.is_empty();
        self.session.token = login.token;
        self.session.user = Some(login.user);
    }

    fn persist_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.persist(USER_INFO_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "Could not serialize user"),
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!(key, error = %e, "Could not persist session key");
        }
    }

    /// Common failure path: log, notify, and drop the session on 401.
    fn report_failure(&mut self, error: &ApiError, fallback: &str) {
        tracing::error!(code = ?error.code(), error = %error, "{fallback}");
        if error.is_unauthorized() {
            self.clear_user_state();
        }
        let message = error.message().unwrap_or_else(|| fallback.to_string());
        self.events.toast(message, ToastIcon::None);
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Signs in and persists token, user and refresh token.
    ///
    /// Returns false on any failure; the reason is toasted.
    pub async fn login(&mut self, request: LoginRequest) -> bool {
        self.loading = true;
        let result = self.auth_api.login(&request).await;
        self.loading = false;
        self.finish_sign_in(result, "Login successful", "Login failed")
    }

    /// Creates the account and signs in with the returned session.
    pub async fn register(&mut self, request: RegisterRequest) -> bool {
        self.loading = true;
        let result = self.auth_api.register(&request).await;
        self.loading = false;
        self.finish_sign_in(result, "Registration successful", "Registration failed")
    }

    fn finish_sign_in(
        &mut self,
        result: Result<crate::gateway::ApiResponse<LoginResponse>, ApiError>,
        success_message: &str,
        failure_message: &str,
    ) -> bool {
        match result {
            Ok(response) => match response.into_data() {
                Some(login) => {
                    tracing::info!(user_id = ?login.user.id, "Signed in");
                    self.save_user_state(login);
                    self.events.toast(success_message, ToastIcon::Success);
                    true
                }
                None => false,
            },
            Err(e) => {
                self.report_failure(&e, failure_message);
                false
            }
        }
    }

    /// Third-party login: fetch a platform code, then log in with it.
    pub async fn wechat_login(&mut self) -> bool {
        self.loading = true;
        let code = self.request_wechat_code().await;
        let outcome = match code {
            Ok(code) => Ok(self.login(LoginRequest::wechat(code)).await),
            Err(e) => Err(e),
        };
        self.loading = false;

        match outcome {
            Ok(logged_in) => logged_in,
            Err(e) => {
                self.report_failure(&e, "WeChat login failed");
                false
            }
        }
    }

    async fn request_wechat_code(&self) -> Result<String, ApiError> {
        match self.code_provider.request_code().await {
            Ok(Some(code)) if !code.is_empty() => Ok(code),
            Ok(_) => Err(ApiError::Capability(
                "Failed to obtain WeChat authorization code".to_string(),
            )),
            Err(e) => Err(ApiError::Capability(format!("WeChat authorization failed: {e}"))),
        }
    }

    /// Re-reads the profile. A 401 clears the session before returning.
    pub async fn get_current_user(&mut self) -> Result<(), ApiError> {
        let result = self.auth_api.get_user_info().await;
        match result {
            Ok(response) => {
                if let Some(user) = response.into_data() {
                    self.persist_user(&user);
                    self.session.user = Some(user);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch current user");
                if e.is_unauthorized() {
                    self.clear_user_state();
                }
                Err(e)
            }
        }
    }

    /// Re-reads the learning stats. A 401 clears the session before returning.
    pub async fn get_user_stats(&mut self) -> Result<(), ApiError> {
        let result = self.auth_api.get_user_stats().await;
        match result {
            Ok(response) => {
                if let Some(stats) = response.into_data() {
                    self.session.stats = Some(stats);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch user stats");
                if e.is_unauthorized() {
                    self.clear_user_state();
                }
                Err(e)
            }
        }
    }

    /// Sends a profile patch and replaces the user with the server's copy.
    pub async fn update_user(&mut self, patch: UpdateUserRequest) -> bool {
        self.loading = true;
        let result = self.auth_api.update_user_info(&patch).await;
        self.loading = false;

        match result {
            Ok(response) => match response.into_data() {
                Some(user) => {
                    self.persist_user(&user);
                    self.session.user = Some(user);
                    self.events.toast("Profile updated", ToastIcon::Success);
                    true
                }
                None => false,
            },
            Err(e) => {
                self.report_failure(&e, "Update failed");
                false
            }
        }
    }

    /// Uploads an image and patches `avatar_url` on the held user.
    pub async fn upload_avatar(&mut self, file_path: impl AsRef<Path>) -> bool {
        self.loading = true;
        let result = self.auth_api.upload_avatar(file_path).await;
        self.loading = false;

        match result {
            Ok(response) => match response.into_data() {
                Some(upload) => {
                    if let Some(user) = self.session.user.as_mut() {
                        user.avatar_url = Some(upload.avatar_url);
                    }
                    if let Some(user) = &self.session.user {
                        self.persist_user(user);
                    }
                    self.events.toast("Avatar updated", ToastIcon::Success);
                    true
                }
                None => false,
            },
            Err(e) => {
                self.report_failure(&e, "Avatar upload failed");
                false
            }
        }
    }

    /// Local state is cleared even when the server call fails.
    pub async fn logout(&mut self) {
        if let Err(e) = self.auth_api.logout().await {
            tracing::error!(error = %e, "Logout request failed");
        }

        self.clear_user_state();
        self.events.toast("Logged out", ToastIcon::Success);
        self.events.redirect(LOGIN_ROUTE, LOGOUT_REDIRECT_DELAY);
        tracing::info!("Logged out");
    }

    /// Cheap probe. Any failure counts as logged out.
    pub async fn check_login_status(&mut self) -> bool {
        if !self.has_token() {
            return false;
        }

        let result = self.get_current_user().await;
        match result {
            Ok(()) => true,
            Err(_) => {
                self.clear_user_state();
                false
            }
        }
    }

    /// Startup entry point. A stale token is treated like no token.
    pub async fn auto_login(&mut self) {
        self.init_user_state();
        if !self.has_token() {
            return;
        }

        let user = self.get_current_user().await;
        let refreshed = match user {
            Ok(()) => self.get_user_stats().await,
            Err(e) => Err(e),
        };

        if let Err(e) = refreshed {
            tracing::warn!(error = %e, "Auto login failed, clearing session");
            self.clear_user_state();
        }
    }

    // ========================================================================
    // Token lifetime
    // ========================================================================

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh_session(&mut self) -> Result<(), ApiError> {
        let result = self.auth_api.refresh_token().await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh token");
                if e.is_unauthorized() {
                    self.clear_user_state();
                }
                return Err(e);
            }
        };

        let Some(refresh) = response.into_data() else {
            return Err(ApiError::Decode("refresh response carried no token".to_string()));
        };

        self.gateway.set_token(&refresh.token);
        if let Some(refresh_token) = &refresh.refresh_token {
            self.persist(REFRESH_TOKEN_KEY, refresh_token);
        }
        self.expires_at = expiry_from(refresh.expires_in);
        self.session.is_logged_in = !refresh.token.is_empty();
        self.session.token = refresh.token;

        tracing::info!("Token refreshed successfully");
        Ok(())
    }

    /// True when the token expires within five minutes. Unknown expiry never
    /// needs a refresh.
    pub fn token_needs_refresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => (expires_at - Utc::now()).num_seconds() < REFRESH_MARGIN_SECS,
            None => false,
        }
    }

    /// Refreshes only when the token is close to expiring.
    pub async fn refresh_token_if_needed(&mut self) -> Result<bool, ApiError> {
        if !self.has_token() || !self.token_needs_refresh() {
            return Ok(false);
        }

        tracing::info!("Token expiring soon, refreshing...");
        self.refresh_session().await?;
        Ok(true)
    }
}

/// Absolute expiry for a server-reported lifetime. Out-of-range lifetimes
/// are treated as no expiry.
fn expiry_from(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    let secs = expires_in?;
    let expires_at = TimeDelta::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d));
    if expires_at.is_none() {
        tracing::warn!(expires_in = secs, "Token lifetime out of range, ignoring expiry");
    }
    expires_at
}
