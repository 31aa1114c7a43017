//! Fake homeserver for integration testing.
//!
//! Serves the four client/server API endpoints the tools use on an ephemeral
//! local port and records every request it receives.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::net::TcpListener;

/// A request seen by the fake homeserver.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Raw (still percent-encoded) path.
    pub path: String,
    /// Decoded `user_id` query parameter.
    pub user_id: Option<String>,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Default)]
struct Shared {
    requests: Mutex<Vec<RecordedRequest>>,
    memberships: Mutex<VecDeque<(StatusCode, String)>>,
    last_membership: Mutex<Option<(StatusCode, String)>>,
    room_id: Mutex<String>,
    event_id: Mutex<String>,
    forbidden_leaves: Mutex<HashSet<String>>,
}

/// A running fake homeserver.
pub struct TestHomeserver {
    shared: Arc<Shared>,
    base_url: String,
}

impl TestHomeserver {
    /// Bind to an ephemeral port and start serving in the background.
    pub async fn spawn() -> anyhow::Result<Self> {
        let shared = Arc::new(Shared::default());
        *shared.room_id.lock() = "!created:test".to_string();
        *shared.event_id.lock() = "$sent:test".to_string();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new().fallback(handle).with_state(shared.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            shared,
            base_url: format!("http://{}", addr),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_room_id(&self, room_id: &str) {
        *self.shared.room_id.lock() = room_id.to_string();
    }

    pub fn set_event_id(&self, event_id: &str) {
        *self.shared.event_id.lock() = event_id.to_string();
    }

    /// Queue a raw `joined_members` response body.
    pub fn push_joined_members(&self, body: &str) {
        self.shared
            .memberships
            .lock()
            .push_back((StatusCode::OK, body.to_string()));
    }

    /// Queue a failing `joined_members` response.
    pub fn push_joined_members_error(&self, status: StatusCode, errcode: &str) {
        let body = serde_json::json!({ "errcode": errcode, "error": "test failure" }).to_string();
        self.shared.memberships.lock().push_back((status, body));
    }

    /// Reject leaves issued as `user_id`.
    pub fn forbid_leave_for(&self, user_id: &str) {
        self.shared
            .forbidden_leaves
            .lock()
            .insert(user_id.to_string());
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().clone()
    }
}

fn json(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let user_id = params.get("user_id").cloned();
    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };

    shared.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        user_id: user_id.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    if method == Method::POST && path.ends_with("/createRoom") {
        let room_id = shared.room_id.lock().clone();
        return json(
            StatusCode::OK,
            serde_json::json!({ "room_id": room_id }).to_string(),
        );
    }

    if method == Method::GET && path.ends_with("/joined_members") {
        let next = shared.memberships.lock().pop_front();
        let (status, body) = match next {
            Some(reply) => {
                *shared.last_membership.lock() = Some(reply.clone());
                reply
            }
            None => shared
                .last_membership
                .lock()
                .clone()
                .unwrap_or((StatusCode::OK, r#"{"joined":{}}"#.to_string())),
        };
        return json(status, body);
    }

    if method == Method::POST && path.ends_with("/leave") {
        let forbidden = user_id
            .as_ref()
            .is_some_and(|u| shared.forbidden_leaves.lock().contains(u));
        if forbidden {
            return json(
                StatusCode::FORBIDDEN,
                r#"{"errcode":"M_FORBIDDEN","error":"not allowed"}"#.to_string(),
            );
        }
        return json(StatusCode::OK, "{}".to_string());
    }

    if method == Method::PUT && path.contains("/send/m.room.message/") {
        let event_id = shared.event_id.lock().clone();
        return json(
            StatusCode::OK,
            serde_json::json!({ "event_id": event_id }).to_string(),
        );
    }

    json(
        StatusCode::NOT_FOUND,
        r#"{"errcode":"M_UNRECOGNIZED","error":"Unrecognized request"}"#.to_string(),
    )
}
