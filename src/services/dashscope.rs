use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::DashScopeConfig;
use crate::models::{Resolution, TaskStatus, TaskUsage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitBody {
    pub model: String,
    pub input: SubmitInput,
    pub parameters: SubmitParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmitInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmitParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_extend: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    output: Option<SubmitOutput>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitOutput {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    task_status: Option<TaskStatus>,
}

/// Accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTask {
    pub task_id: String,
    pub request_id: Option<String>,
    pub status: TaskStatus,
}

/// Body of `GET /tasks/{task_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub output: TaskOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TaskUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub task_status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TaskResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub url: Option<String>,
}

impl TaskOutput {
    /// `video_url`, or the first entry of `results` for older models.
    pub fn result_url(&self) -> Option<&str> {
        self.video_url
            .as_deref()
            .or_else(|| {
                self.results
                    .as_ref()
                    .and_then(|r| r.first())
                    .and_then(|r| r.url.as_deref())
            })
            .filter(|u| !u.is_empty())
    }

    pub fn failure_message(&self) -> String {
        match (self.message.as_deref(), self.code.as_deref()) {
            (Some(m), _) if !m.is_empty() => m.to_string(),
            (_, Some(c)) if !c.is_empty() => c.to_string(),
            _ => "Unknown error".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashScopeError {
    #[error("Request timeout - please try again")]
    Timeout,

    #[error("Connection error - please check your internet connection")]
    Connect,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format from API: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for DashScopeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DashScopeError::Timeout
        } else if e.is_connect() {
            DashScopeError::Connect
        } else if e.is_decode() {
            DashScopeError::Malformed(e.to_string())
        } else {
            DashScopeError::Transport(e.to_string())
        }
    }
}

/// The two remote calls the job client needs.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn submit_task(
        &self,
        endpoint: &str,
        body: &SubmitBody,
    ) -> Result<SubmittedTask, DashScopeError>;

    async fn fetch_task(&self, task_id: &str) -> Result<TaskResponse, DashScopeError>;
}

pub struct DashScopeClient {
    http: Client,
    config: DashScopeConfig,
}

impl DashScopeClient {
    pub fn new(config: DashScopeConfig, http: Client) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl TaskApi for DashScopeClient {
    async fn submit_task(
        &self,
        endpoint: &str,
        body: &SubmitBody,
    ) -> Result<SubmittedTask, DashScopeError> {
        debug!(
            "submitting to {}: {}",
            endpoint,
            serde_json::to_string(body).unwrap_or_default()
        );

        let response = self
            .http
            .post(self.url(endpoint))
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Async", "enable")
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(status.as_u16(), &text);
            error!("DashScope submission error {}: {}", status, message);
            return Err(DashScopeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SubmitResponse =
            serde_json::from_str(&text).map_err(|e| DashScopeError::Malformed(e.to_string()))?;

        let output = parsed
            .output
            .ok_or_else(|| DashScopeError::Malformed("missing output".into()))?;
        let task_id = output
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DashScopeError::Malformed("no task_id in response".into()))?;

        Ok(SubmittedTask {
            task_id,
            request_id: parsed.request_id,
            status: output.task_status.unwrap_or(TaskStatus::Pending),
        })
    }

    async fn fetch_task(&self, task_id: &str) -> Result<TaskResponse, DashScopeError> {
        let response = self
            .http
            .get(self.url(&format!("/tasks/{}", task_id)))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DashScopeError::Api {
                status: status.as_u16(),
                message: extract_error_message(status.as_u16(), &text),
            });
        }

        serde_json::from_str(&text).map_err(|e| DashScopeError::Malformed(e.to_string()))
    }
}

/// Readable message from an error body: `message`, then `error`, then the raw body.
pub fn extract_error_message(status: u16, body: &str) -> String {
    let value: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        value
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    field("message")
        .or_else(|| field("error"))
        .unwrap_or_else(|| format!("API request failed with status {}: {}", status, body))
}
