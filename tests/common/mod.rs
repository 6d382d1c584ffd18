#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

use studybeat::auth::{AuthCodeProvider, StaticCodeProvider};
use studybeat::error::TransportError;
use studybeat::gateway::{Gateway, Transport, TransportRequest, TransportResponse, UploadRequest};
use studybeat::model::SessionStore;
use studybeat::notify::{UiEvent, UiEvents};
use studybeat::storage::{KeyValueStore, MemoryStore};
use studybeat::AppConfig;

pub const BASE_URL: &str = "http://api.test";

type Reply = Result<TransportResponse, TransportError>;

/// Replays queued replies in order and records what was sent.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<TransportRequest>>,
    pub uploads: Mutex<Vec<UploadRequest>>,
}

impl MockTransport {
    pub fn reply(&self, status: u16, body: Value) {
        self.reply_raw(status, &body.to_string());
    }

    pub fn reply_raw(&self, status: u16, body: &str) {
        self.replies.lock().push_back(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .push_back(Err(TransportError::Request(message.to_string())));
    }

    pub fn sent(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn last(&self) -> TransportRequest {
        self.requests.lock().last().cloned().expect("no request sent")
    }

    fn next_reply(&self) -> Reply {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".to_string())))
    }
}

impl Transport for MockTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Reply> {
        self.requests.lock().push(request);
        let reply = self.next_reply();
        async move { reply }.boxed()
    }

    fn upload(&self, request: UploadRequest) -> BoxFuture<'_, Reply> {
        self.uploads.lock().push(request);
        let reply = self.next_reply();
        async move { reply }.boxed()
    }
}

pub fn ok(data: Value) -> Value {
    json!({ "code": 200, "message": "success", "data": data })
}

pub fn login_body(token: &str) -> Value {
    ok(json!({
        "user": { "id": 7, "nickname": "Lin", "avatarUrl": "https://img/old.png" },
        "token": token,
        "refreshToken": "refresh-1",
        "expiresIn": 7200
    }))
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStore>,
    pub gateway: Arc<Gateway>,
    pub events: UiEvents,
    pub events_rx: UnboundedReceiver<UiEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(MockTransport::default());
        let storage = Arc::new(MemoryStore::new());
        let (events, events_rx) = UiEvents::channel();
        let config = AppConfig::default().with_base_url(BASE_URL);
        let gateway = Arc::new(Gateway::new(
            &config,
            transport.clone(),
            storage.clone(),
            events.clone(),
        ));
        Self {
            transport,
            storage,
            gateway,
            events,
            events_rx,
        }
    }

    pub fn session(&self) -> SessionStore {
        self.session_with_code(Some("wx-code-1"))
    }

    pub fn session_with_code(&self, code: Option<&str>) -> SessionStore {
        let provider: Arc<dyn AuthCodeProvider> = Arc::new(StaticCodeProvider::new(code.map(str::to_string)));
        SessionStore::new(self.gateway.clone(), self.storage.clone(), self.events.clone(), provider)
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }

    /// Everything queued so far, without waiting for scheduled redirects.
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }
}
