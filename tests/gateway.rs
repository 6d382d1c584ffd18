mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};

use common::{BASE_URL, Harness, ok};
use studybeat::error::ApiError;
use studybeat::gateway::RequestOptions;
use studybeat::notify::{LOGIN_ROUTE, ToastIcon, UiEvent};
use studybeat::storage::{ACCESS_TOKEN_KEY, KeyValueStore};

#[tokio::test]
async fn success_unwraps_envelope() {
    let h = Harness::new();
    h.transport.reply(200, ok(json!({ "id": 3, "nickname": "Ming" })));

    let response = h
        .gateway
        .get::<Value>("/auth/user-info", None, RequestOptions::default())
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.data, Some(json!({ "id": 3, "nickname": "Ming" })));
}

#[tokio::test]
async fn zero_is_also_a_success_code() {
    let h = Harness::new();
    h.transport.reply(200, json!({ "code": 0, "msg": "ok", "data": 12 }));

    let response = h
        .gateway
        .post::<u64>("/users/count", Some(json!({})), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(response.into_data(), Some(12));
}

#[tokio::test]
async fn get_resolves_url_and_busts_cache() {
    let h = Harness::new();
    h.transport.reply(200, ok(json!([])));

    h.gateway
        .get::<Value>(
            "/carousel/queryActiveCarousel",
            Some(json!({ "platform": "all", "limit": 5 })),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    let sent = h.transport.last();
    assert_eq!(sent.method, Method::GET);
    assert!(
        sent.url
            .starts_with(&format!("{BASE_URL}/carousel/queryActiveCarousel?limit=5&platform=all&_t=")),
        "{}",
        sent.url
    );
    assert!(sent.body.is_none());
}

#[tokio::test]
async fn post_sends_json_body_without_cache_buster() {
    let h = Harness::new();
    h.transport.reply(200, ok(Value::Null));

    h.gateway
        .post::<Value>("/carousel/click", Some(json!({ "id": 4 })), RequestOptions::default())
        .await
        .unwrap();

    let sent = h.transport.last();
    assert_eq!(sent.url, format!("{BASE_URL}/carousel/click"));
    assert_eq!(sent.body, Some(json!({ "id": 4 })));
}

#[tokio::test]
async fn token_is_sent_in_both_headers() {
    let h = Harness::new();
    h.gateway.set_token("tok-42");
    h.transport.reply(200, ok(Value::Null));

    h.gateway
        .put::<Value>(
            "/auth/user-info",
            Some(json!({ "nickname": "Ming" })),
            RequestOptions::default().with_header("X-Trace", "abc"),
        )
        .await
        .unwrap();

    let headers = h.transport.last().headers;
    assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer tok-42"));
    assert_eq!(headers.get("token").map(String::as_str), Some("tok-42"));
    assert_eq!(headers.get("Content-Type").map(String::as_str), Some("application/json"));
    assert_eq!(headers.get("X-Trace").map(String::as_str), Some("abc"));
}

#[tokio::test]
async fn explicit_token_header_wins() {
    let h = Harness::new();
    h.gateway.set_token("stored");
    h.transport.reply(200, ok(Value::Null));

    h.gateway
        .delete::<Value>("/users/x", None, RequestOptions::default().with_header("token", "override"))
        .await
        .unwrap();

    let headers = h.transport.last().headers;
    assert_eq!(headers.get("token").map(String::as_str), Some("override"));
    assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer stored"));
}

#[tokio::test]
async fn explicit_token_headers_match_any_casing() {
    let h = Harness::new();
    h.gateway.set_token("stored");
    h.transport.reply(200, ok(Value::Null));

    h.gateway
        .get::<Value>(
            "/auth/user-info",
            None,
            RequestOptions::default()
                .with_header("authorization", "Bearer other")
                .with_header("Token", "other")
                .with_header("content-type", "text/plain"),
        )
        .await
        .unwrap();

    let headers = h.transport.last().headers;
    assert_eq!(headers.len(), 3);
    assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer other"));
    assert_eq!(headers.get("Token").map(String::as_str), Some("other"));
    assert_eq!(headers.get("content-type").map(String::as_str), Some("text/plain"));
}

#[tokio::test]
async fn token_falls_back_to_storage() {
    let h = Harness::new();
    h.storage.set(ACCESS_TOKEN_KEY, "persisted").unwrap();
    assert_eq!(h.gateway.get_token(), "persisted");

    h.gateway.set_token("fresh");
    assert_eq!(h.gateway.get_token(), "fresh");
    assert_eq!(h.stored(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));

    h.gateway.clear_token();
    assert_eq!(h.gateway.get_token(), "");
    assert_eq!(h.stored(ACCESS_TOKEN_KEY), None);
}

#[tokio::test]
async fn unauthorized_business_code_clears_token_and_schedules_redirect() {
    let mut h = Harness::new();
    h.gateway.set_token("expired");
    h.transport.reply(200, json!({ "code": 401, "message": "token expired" }));

    let err = h
        .gateway
        .get::<Value>("/auth/user-info", None, RequestOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(h.gateway.get_token(), "");
    assert_eq!(h.stored(ACCESS_TOKEN_KEY), None);

    let events = h.drain_events();
    assert!(events.contains(&UiEvent::Toast {
        message: "Login expired, please log in again".to_string(),
        icon: ToastIcon::None,
    }));
    assert!(events.contains(&UiEvent::Redirect {
        route: LOGIN_ROUTE.to_string(),
        delay: Duration::from_millis(1500),
    }));
}

#[tokio::test]
async fn http_failure_is_normalized() {
    let mut h = Harness::new();
    h.transport.reply_raw(502, "<html>bad gateway</html>");

    let err = h
        .gateway
        .get::<Value>("/auth/user-stats", None, RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 502 }));
    let failure = err.to_failure();
    assert_eq!(failure.code, Some(502));
    assert!(!failure.success);

    assert_eq!(
        h.drain_events(),
        vec![UiEvent::Toast {
            message: "HTTP error: 502".to_string(),
            icon: ToastIcon::None,
        }]
    );
}

#[tokio::test]
async fn business_failure_carries_server_message() {
    let mut h = Harness::new();
    h.transport.reply(200, json!({ "code": 1003, "message": "Code expired" }));

    let err = h
        .gateway
        .post::<Value>("/auth/verify-login", Some(json!({})), RequestOptions::default())
        .await
        .unwrap_err();

    match &err {
        ApiError::Business { code, message } => {
            assert_eq!(*code, 1003);
            assert_eq!(message, "Code expired");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(
        h.drain_events(),
        vec![UiEvent::Toast {
            message: "Code expired".to_string(),
            icon: ToastIcon::None,
        }]
    );
}

#[tokio::test]
async fn network_failure_has_no_code() {
    let mut h = Harness::new();
    h.transport.fail("connection refused");

    let err = h
        .gateway
        .get::<Value>("/auth/user-info", None, RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.code(), None);
    assert_eq!(
        h.drain_events(),
        vec![UiEvent::Toast {
            message: "Network error, please check your connection".to_string(),
            icon: ToastIcon::None,
        }]
    );
}

#[tokio::test]
async fn silent_calls_skip_the_notification() {
    let mut h = Harness::new();
    h.transport.reply(200, json!({ "code": 500, "message": "boom" }));

    let result = h
        .gateway
        .get::<Value>("/auth/user-info", None, RequestOptions::silent())
        .await;

    assert!(result.is_err());
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn per_call_timeout_overrides_default() {
    let h = Harness::new();
    h.transport.reply(200, ok(Value::Null));
    h.transport.reply(200, ok(Value::Null));

    let options = RequestOptions {
        timeout: Some(Duration::from_secs(2)),
        ..RequestOptions::default()
    };
    h.gateway.post::<Value>("/a", None, options).await.unwrap();
    h.gateway.post::<Value>("/b", None, RequestOptions::default()).await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent[0].timeout, Duration::from_secs(2));
    assert_eq!(sent[1].timeout, Duration::from_secs(10));
}

#[tokio::test]
async fn upload_sends_file_fields_and_token() {
    let h = Harness::new();
    h.gateway.set_token("tok");
    h.transport.reply(200, ok(json!({ "avatarUrl": "https://img/new.png" })));

    let mut extra = BTreeMap::new();
    extra.insert("scene".to_string(), "avatar".to_string());
    let response = h
        .gateway
        .upload::<Value>("/auth/avatar", "/tmp/me.png", "file", extra)
        .await
        .unwrap();

    assert_eq!(response.data, Some(json!({ "avatarUrl": "https://img/new.png" })));
    let upload = h.transport.uploads.lock()[0].clone();
    assert_eq!(upload.url, format!("{BASE_URL}/auth/avatar"));
    assert_eq!(upload.field_name, "file");
    assert_eq!(upload.form_data.get("scene").map(String::as_str), Some("avatar"));
    assert_eq!(upload.headers.get("token").map(String::as_str), Some("tok"));
    assert_eq!(
        upload.headers.get("Content-Type").map(String::as_str),
        Some("multipart/form-data")
    );
}

#[tokio::test]
async fn upload_with_malformed_body_is_rejected() {
    let h = Harness::new();
    h.transport.reply_raw(200, "<<not json>>");

    let err = h
        .gateway
        .upload::<Value>("/auth/avatar", "/tmp/me.png", "file", BTreeMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::UploadParse));
    assert_eq!(err.code(), Some(-1));
}

#[tokio::test]
async fn upload_transport_failure_is_rejected() {
    let h = Harness::new();
    h.transport.fail("reset by peer");

    let err = h
        .gateway
        .upload::<Value>("/auth/avatar", "/tmp/me.png", "file", BTreeMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Upload(_)));
    assert_eq!(err.to_failure().message, "File upload failed");
}

#[tokio::test]
async fn upload_does_not_run_unauthorized_handling() {
    let mut h = Harness::new();
    h.gateway.set_token("tok");
    h.transport.reply(200, json!({ "code": 401, "message": "token expired" }));

    let response = h
        .gateway
        .upload::<Value>("/auth/avatar", "/tmp/me.png", "file", BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(response.code, 401);
    assert!(!response.is_success());
    assert_eq!(h.gateway.get_token(), "tok");
    assert!(h.drain_events().is_empty());
}
