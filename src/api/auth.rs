//! `/auth/*` endpoints.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::ApiError;
use crate::gateway::{ApiResponse, Gateway, RequestOptions, payload};
use crate::model::{
    AvatarUpload, LoginRequest, LoginResponse, LoginType, PhoneLoginParams, RegisterRequest, TokenRefresh,
    UpdateUserRequest, User, UserStats, VerifyCodeLoginParams, WechatLoginParams,
};

const AVATAR_FIELD: &str = "file";

#[derive(Clone)]
pub struct AuthApi {
    gateway: Arc<Gateway>,
}

impl AuthApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Routes a login request to the endpoint matching its credentials.
    pub async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<LoginResponse>, ApiError> {
        let path = login_path(request);
        tracing::debug!(path, login_type = request.login_type.as_str(), "Logging in");
        self.gateway
            .post(path, Some(payload(request)?), RequestOptions::default())
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse<LoginResponse>, ApiError> {
        self.gateway
            .post("/auth/register", Some(payload(request)?), RequestOptions::default())
            .await
    }

    pub async fn wechat_login(&self, params: &WechatLoginParams) -> Result<ApiResponse<LoginResponse>, ApiError> {
        self.gateway
            .post("/auth/wechat-login", Some(payload(params)?), RequestOptions::default())
            .await
    }

    pub async fn phone_login(&self, params: &PhoneLoginParams) -> Result<ApiResponse<LoginResponse>, ApiError> {
        self.gateway
            .post("/auth/phone-login", Some(payload(params)?), RequestOptions::default())
            .await
    }

    pub async fn send_verify_code(&self, phone: &str) -> Result<ApiResponse<Value>, ApiError> {
        self.gateway
            .post("/auth/send-code", Some(json!({ "phone": phone })), RequestOptions::default())
            .await
    }

    pub async fn verify_code_login(
        &self,
        params: &VerifyCodeLoginParams,
    ) -> Result<ApiResponse<LoginResponse>, ApiError> {
        self.gateway
            .post("/auth/verify-login", Some(payload(params)?), RequestOptions::default())
            .await
    }

    pub async fn get_user_info(&self) -> Result<ApiResponse<User>, ApiError> {
        self.gateway.get("/auth/user-info", None, RequestOptions::default()).await
    }

    pub async fn get_user_stats(&self) -> Result<ApiResponse<UserStats>, ApiError> {
        self.gateway.get("/auth/user-stats", None, RequestOptions::default()).await
    }

    pub async fn update_user_info(&self, patch: &UpdateUserRequest) -> Result<ApiResponse<User>, ApiError> {
        self.gateway
            .put("/auth/user-info", Some(payload(patch)?), RequestOptions::default())
            .await
    }

    pub async fn upload_avatar(&self, file_path: impl AsRef<Path>) -> Result<ApiResponse<AvatarUpload>, ApiError> {
        self.gateway
            .upload("/auth/avatar", file_path, AVATAR_FIELD, BTreeMap::new())
            .await
    }

    pub async fn logout(&self) -> Result<ApiResponse<Value>, ApiError> {
        self.gateway.post("/auth/logout", None, RequestOptions::default()).await
    }

    pub async fn refresh_token(&self) -> Result<ApiResponse<TokenRefresh>, ApiError> {
        self.gateway.post("/auth/refresh-token", None, RequestOptions::default()).await
    }
}

fn login_path(request: &LoginRequest) -> &'static str {
    match request.login_type {
        LoginType::Wechat => "/auth/wechat-login",
        _ if request.code.is_some() => "/auth/verify-login",
        _ => "/auth/login",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requests_route_by_credentials() {
        assert_eq!(login_path(&LoginRequest::wechat("c")), "/auth/wechat-login");
        assert_eq!(login_path(&LoginRequest::phone_code("138", "1234")), "/auth/verify-login");
        assert_eq!(login_path(&LoginRequest::phone_password("138", "pw")), "/auth/login");
    }
}
