//! Wire types for users, authentication and promotional content.
//!
//! Field names follow the backend's camelCase json. Almost everything is
//! optional because the backend omits unset columns.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// 0 unknown, 1 male, 2 female
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_verified: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_openid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_unionid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qq_openid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qq_nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qq_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    /// 0 disabled, 1 active, 2 locked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

pub const USER_STATUS_ACTIVE: i32 = 1;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub study_days: u32,
    pub practice_count: u32,
    pub test_count: u32,
    pub average_score: f64,
    /// minutes
    pub total_study_time: u64,
    pub weekly_study_time: u64,
    pub monthly_study_time: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    Phone,
    Email,
    Wechat,
    Qq,
}

impl LoginType {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginType::Phone => "phone",
            LoginType::Email => "email",
            LoginType::Wechat => "wechat",
            LoginType::Qq => "qq",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_type: LoginType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Verification code sent by sms or mail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qq_access_token: Option<String>,
}

impl LoginRequest {
    fn empty(login_type: LoginType) -> Self {
        Self {
            login_type,
            phone: None,
            email: None,
            password: None,
            code: None,
            wechat_code: None,
            qq_access_token: None,
        }
    }

    pub fn wechat(code: impl Into<String>) -> Self {
        Self {
            wechat_code: Some(code.into()),
            ..Self::empty(LoginType::Wechat)
        }
    }

    pub fn phone_password(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            password: Some(password.into()),
            ..Self::empty(LoginType::Phone)
        }
    }

    pub fn phone_code(phone: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            code: Some(code.into()),
            ..Self::empty(LoginType::Phone)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub login_type: LoginType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

/// Payload of `/auth/wechat-login`.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WechatLoginParams {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
}

/// Payload of `/auth/phone-login` (platform-encrypted phone number).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneLoginParams {
    pub encrypted_data: String,
    pub iv: String,
    pub code: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyCodeLoginParams {
    pub phone: String,
    pub code: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUpload {
    pub avatar_url: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefresh {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserLoginLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// 0 failed, 1 succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// Paged query wrapper used by the `/users/page` style endpoints.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PageParams<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<T>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarouselItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub link_url: String,
    pub platform_type: String,
    pub click_count: u64,
    pub sort_order: i32,
    pub is_active: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wechat_login_request_wire_shape() {
        let value = serde_json::to_value(LoginRequest::wechat("081abc")).unwrap();
        assert_eq!(value, json!({ "loginType": "wechat", "wechatCode": "081abc" }));
    }

    #[test]
    fn user_tolerates_missing_and_unknown_fields() {
        let user: User = serde_json::from_value(json!({
            "id": 12,
            "nickname": "Lin",
            "avatarUrl": "https://img/1.png",
            "phoneVerified": 1,
            "school": "ignored"
        }))
        .unwrap();
        assert_eq!(user.id, Some(12));
        assert_eq!(user.avatar_url.as_deref(), Some("https://img/1.png"));
        assert_eq!(user.phone_verified, Some(1));
        assert_eq!(user.email, None);
    }
}
