//! CRUD and paged queries over `/users/*` and `/userLoginLogs/*`.
//!
//! Both resources expose the same verbs, so a single `Resource` handles the
//! paths and `UserApi` adds the few helpers built on top.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::gateway::{ApiResponse, Gateway, RequestOptions, payload};
use crate::model::{PageParams, USER_STATUS_ACTIVE, User, UserLoginLog};

/// One CRUD resource under `prefix`.
#[derive(Clone)]
pub struct Resource {
    gateway: Arc<Gateway>,
    prefix: &'static str,
}

impl Resource {
    fn path(&self, action: &str) -> String {
        format!("{}/{}", self.prefix, action)
    }

    pub async fn insert<T: Serialize>(&self, item: &T) -> Result<ApiResponse<Value>, ApiError> {
        self.post("insert", payload(item)?).await
    }

    pub async fn save<T: Serialize>(&self, item: &T) -> Result<ApiResponse<Value>, ApiError> {
        self.post("save", payload(item)?).await
    }

    pub async fn update_by_id<T: Serialize>(&self, item: &T) -> Result<ApiResponse<Value>, ApiError> {
        self.post("updateById", payload(item)?).await
    }

    pub async fn delete_by_id(&self, ids: &[i64]) -> Result<ApiResponse<Value>, ApiError> {
        self.post("deleteById", payload(&ids)?).await
    }

    pub async fn get_by_id<T: DeserializeOwned>(&self, id: i64) -> Result<ApiResponse<T>, ApiError> {
        self.gateway
            .get(&self.path("getById"), Some(json!({ "id": id })), RequestOptions::default())
            .await
    }

    pub async fn list<F: Serialize, T: DeserializeOwned>(&self, filter: &F) -> Result<ApiResponse<Vec<T>>, ApiError> {
        self.post("list", payload(filter)?).await
    }

    pub async fn page<F: Serialize>(&self, params: &PageParams<F>) -> Result<ApiResponse<Value>, ApiError> {
        self.post("page", payload(params)?).await
    }

    pub async fn count<F: Serialize>(&self, filter: &F) -> Result<ApiResponse<u64>, ApiError> {
        self.post("count", payload(filter)?).await
    }

    async fn post<T: DeserializeOwned>(&self, action: &str, body: Value) -> Result<ApiResponse<T>, ApiError> {
        self.gateway
            .post(&self.path(action), Some(body), RequestOptions::default())
            .await
    }
}

#[derive(Clone)]
pub struct UserApi {
    users: Resource,
    login_logs: Resource,
}

impl UserApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            users: Resource {
                gateway: gateway.clone(),
                prefix: "/users",
            },
            login_logs: Resource {
                gateway,
                prefix: "/userLoginLogs",
            },
        }
    }

    pub fn users(&self) -> &Resource {
        &self.users
    }

    pub fn login_logs(&self) -> &Resource {
        &self.login_logs
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<ApiResponse<User>, ApiError> {
        self.users.get_by_id(id).await
    }

    pub async fn get_login_log_by_id(&self, id: i64) -> Result<ApiResponse<UserLoginLog>, ApiError> {
        self.login_logs.get_by_id(id).await
    }

    /// Username/password check against active users only.
    pub async fn simple_login(&self, username: &str, password: &str) -> Result<ApiResponse<Vec<User>>, ApiError> {
        self.users
            .list(&json!({
                "username": username,
                "password": password,
                "status": USER_STATUS_ACTIVE,
            }))
            .await
    }

    /// Inserts `user` as active with fresh audit timestamps.
    pub async fn register_user(&self, user: &User) -> Result<ApiResponse<Value>, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            status: Some(USER_STATUS_ACTIVE),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            ..user.clone()
        };
        self.users.insert(&user).await
    }

    pub async fn record_login(
        &self,
        user_id: i64,
        login_type: &str,
        success: bool,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let log = login_log(user_id, login_type, success, ip, user_agent);
        self.login_logs.insert(&log).await
    }
}

fn login_log(user_id: i64, login_type: &str, success: bool, ip: Option<&str>, user_agent: Option<&str>) -> UserLoginLog {
    UserLoginLog {
        id: None,
        user_id: Some(user_id),
        login_type: Some(login_type.to_string()),
        login_ip: ip.map(str::to_string),
        user_agent: user_agent.map(str::to_string),
        login_status: Some(i32::from(success)),
        login_time: Some(chrono::Utc::now().to_rfc3339()),
        remark: Some(if success { "Login succeeded" } else { "Login failed" }.to_string()),
    }
}
