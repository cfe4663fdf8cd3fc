#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path as UrlPath, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::{json, Value};

use wan_gateway::Config;

pub type Reply = (StatusCode, Value);

#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    pub path: String,
    pub authorization: Option<String>,
    pub async_header: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

/// Scripted stand-in for the DashScope API.
#[derive(Default)]
pub struct MockState {
    pub submits: Mutex<Vec<RecordedSubmit>>,
    pub submit_reply: Mutex<Option<Reply>>,
    pub polls: Mutex<VecDeque<Reply>>,
    pub status_queries: AtomicUsize,
    pub poll_auth: Mutex<Vec<Option<String>>>,
    pub file_status: Mutex<Option<StatusCode>>,
    pub file_body: Mutex<Vec<u8>>,
    pub file_hits: AtomicUsize,
}

impl MockState {
    pub fn reply_to_submit(&self, status: StatusCode, body: Value) {
        *self.submit_reply.lock().unwrap() = Some((status, body));
    }

    pub fn script_polls(&self, replies: Vec<Reply>) {
        self.polls.lock().unwrap().extend(replies);
    }

    pub fn submit_count(&self) -> usize {
        self.submits.lock().unwrap().len()
    }

    pub fn status_count(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub fn file_hit_count(&self) -> usize {
        self.file_hits.load(Ordering::SeqCst)
    }
}

pub struct MockDashScope {
    pub addr: std::net::SocketAddr,
    pub state: Arc<MockState>,
}

impl MockDashScope {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        *state.file_body.lock().unwrap() = b"\x00\x00\x00\x18ftypmp42fake-video".to_vec();

        let app = Router::new()
            .route("/api/v1/services/aigc/:group/video-synthesis", post(submit))
            .route("/api/v1/tasks/:task_id", get(task))
            .route("/files/:name", get(file))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("http://{}/files/{}", self.addr, name)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn submit(
    State(state): State<Arc<MockState>>,
    UrlPath(group): UrlPath<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut submits = state.submits.lock().unwrap();
    submits.push(RecordedSubmit {
        path: format!("/services/aigc/{}/video-synthesis", group),
        authorization: header(&headers, "authorization"),
        async_header: header(&headers, "x-dashscope-async"),
        content_type: header(&headers, "content-type"),
        body,
    });

    let (status, body) = state.submit_reply.lock().unwrap().clone().unwrap_or_else(|| {
        (
            StatusCode::OK,
            json!({
                "output": {
                    "task_status": "PENDING",
                    "task_id": format!("task-{}", submits.len())
                },
                "request_id": "req-mock"
            }),
        )
    });
    (status, Json(body))
}

async fn task(
    State(state): State<Arc<MockState>>,
    UrlPath(task_id): UrlPath<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.status_queries.fetch_add(1, Ordering::SeqCst);
    state
        .poll_auth
        .lock()
        .unwrap()
        .push(header(&headers, "authorization"));

    let (status, body) = state
        .polls
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| running(&task_id));
    (status, Json(body))
}

async fn file(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    state.file_hits.fetch_add(1, Ordering::SeqCst);
    let status = state.file_status.lock().unwrap().unwrap_or(StatusCode::OK);
    let body = state.file_body.lock().unwrap().clone();
    (status, body)
}

pub fn running(task_id: &str) -> Reply {
    (
        StatusCode::OK,
        json!({
            "output": { "task_id": task_id, "task_status": "RUNNING" },
            "request_id": "req-poll"
        }),
    )
}

pub fn succeeded(task_id: &str, url: &str) -> Reply {
    (
        StatusCode::OK,
        json!({
            "output": { "task_id": task_id, "task_status": "SUCCEEDED", "video_url": url },
            "usage": { "video_duration": 5, "video_ratio": "1920*1080", "video_count": 1 },
            "request_id": "req-poll"
        }),
    )
}

pub fn failed(task_id: &str, code: &str, message: &str) -> Reply {
    (
        StatusCode::OK,
        json!({
            "output": {
                "task_id": task_id,
                "task_status": "FAILED",
                "code": code,
                "message": message
            },
            "request_id": "req-poll"
        }),
    )
}

pub fn canceled(task_id: &str) -> Reply {
    (
        StatusCode::OK,
        json!({ "output": { "task_id": task_id, "task_status": "CANCELED" } }),
    )
}

/// Config pointed at the mock, polling at the shortest allowed interval.
pub fn config(base_url: &str, video_dir: &Path, extra: &[&str]) -> Config {
    let video_dir = video_dir.display().to_string();
    let mut argv = vec![
        "wan-gateway",
        "--dashscope-api-key",
        "sk-test",
        "--dashscope-base-url",
        base_url,
        "--text-poll-interval",
        "1",
        "--image-poll-interval",
        "1",
        "--video-dir",
        video_dir.as_str(),
    ];
    argv.extend_from_slice(extra);
    Config::parse_from(argv)
}
