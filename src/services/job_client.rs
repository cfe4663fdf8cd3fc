use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::models::{GenerationRequest, Job, TaskStatus, TaskUsage};
use crate::profiles::ModeProfiles;
use crate::services::dashscope::{DashScopeError, TaskApi, TaskResponse};
use crate::services::payload;

/// How often to poll, for how long, and how many consecutive faults to absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
    pub max_retries: u32,
}

impl PollPolicy {
    pub fn text_default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(300),
            max_retries: 3,
        }
    }

    pub fn image_default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            max_wait: Duration::from_secs(1800),
            max_retries: 3,
        }
    }
}

/// One-shot view of a remote task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub terminal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TaskUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

pub struct AsyncJobClient {
    api: Arc<dyn TaskApi>,
    profiles: ModeProfiles,
    max_prompt_chars: usize,
}

impl AsyncJobClient {
    pub fn new(api: Arc<dyn TaskApi>, profiles: ModeProfiles, max_prompt_chars: usize) -> Self {
        Self {
            api,
            profiles,
            max_prompt_chars,
        }
    }

    pub fn profiles(&self) -> &ModeProfiles {
        &self.profiles
    }

    /// Validate, build the mode payload and submit it once. Never retried.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<Job, GenerationError> {
        let profile = self.profiles.get(request.mode());
        payload::validate(request, profile, self.max_prompt_chars)?;

        let body = payload::build_submit_body(request, profile);
        let submitted = self
            .api
            .submit_task(profile.endpoint, &body)
            .await
            .map_err(|e| GenerationError::Submission(e.to_string()))?;

        info!(
            "submitted {} task {} (model {})",
            profile.mode, submitted.task_id, body.model
        );

        let mut job = Job::pending(submitted.task_id, profile.mode, body.model);
        job.request_id = submitted.request_id;
        job.status = submitted.status;
        Ok(job)
    }

    /// Poll until the job is terminal, the wait budget runs out or the service
    /// stays unreachable for more than `max_retries` consecutive queries.
    pub async fn await_completion(
        &self,
        mut job: Job,
        policy: &PollPolicy,
    ) -> Result<Job, GenerationError> {
        let started = Instant::now();
        let mut failures = 0u32;

        loop {
            match self.api.fetch_task(&job.id).await {
                Ok(response) => {
                    failures = 0;
                    observe(&mut job, response);

                    match job.status {
                        TaskStatus::Succeeded if job.result_url.is_none() => {
                            return Err(GenerationError::RemoteFailure {
                                task_id: job.id,
                                message: "Task succeeded but no video URL was returned".into(),
                            });
                        }
                        TaskStatus::Succeeded | TaskStatus::Canceled => return Ok(job),
                        TaskStatus::Failed => {
                            return Err(GenerationError::RemoteFailure {
                                message: job.error_detail.unwrap_or_default(),
                                task_id: job.id,
                            });
                        }
                        TaskStatus::Pending | TaskStatus::Running | TaskStatus::Unknown => {}
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "status query for {} failed ({}/{}): {}",
                        job.id, failures, policy.max_retries, e
                    );
                    if failures > policy.max_retries {
                        return Err(GenerationError::PollingTransport {
                            task_id: job.id,
                            attempts: failures,
                            message: e.to_string(),
                        });
                    }
                }
            }

            let waited = started.elapsed();
            if waited >= policy.max_wait {
                return Err(GenerationError::Timeout {
                    task_id: job.id,
                    waited,
                    last_status: job.status,
                });
            }

            sleep(policy.interval.min(policy.max_wait - waited)).await;
        }
    }

    pub async fn query(&self, task_id: &str) -> Result<TaskSnapshot, DashScopeError> {
        let response = self.api.fetch_task(task_id).await?;
        let output = response.output;
        let status = output.task_status;

        Ok(TaskSnapshot {
            task_id: output.task_id.clone().unwrap_or_else(|| task_id.to_string()),
            status,
            terminal: status.is_terminal(),
            video_url: output.result_url().map(str::to_string),
            error_message: (status == TaskStatus::Failed).then(|| output.failure_message()),
            usage: response.usage,
            request_id: response.request_id,
        })
    }
}

fn observe(job: &mut Job, response: TaskResponse) {
    let status = response.output.task_status;
    job.polls += 1;

    if status != job.status {
        info!("task {}: {} -> {}", job.id, job.status, status);
    }
    job.status = status;

    if response.usage.is_some() {
        job.usage = response.usage;
    }

    match status {
        TaskStatus::Succeeded => {
            job.result_url = response.output.result_url().map(str::to_string);
            job.completed_at = Some(Utc::now());
        }
        TaskStatus::Failed => {
            job.error_detail = Some(response.output.failure_message());
            job.completed_at = Some(Utc::now());
        }
        TaskStatus::Canceled => job.completed_at = Some(Utc::now()),
        _ => {}
    }
}
