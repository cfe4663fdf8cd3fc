use tracing::{error, info, warn};

use crate::error::GenerationError;
use crate::models::{GenerationRequest, Job, TaskStatus, VideoResult};
use crate::profiles::ModeProfiles;
use crate::services::dashscope::DashScopeError;
use crate::services::download::VideoDownloader;
use crate::services::job_client::{AsyncJobClient, TaskSnapshot};

pub const CANCELED_MESSAGE: &str = "the task was canceled by the service";

/// Facade the HTTP layer talks to: one call per generate request.
pub struct VideoService {
    jobs: AsyncJobClient,
    downloader: Option<VideoDownloader>,
}

impl VideoService {
    pub fn new(jobs: AsyncJobClient, downloader: Option<VideoDownloader>) -> Self {
        Self { jobs, downloader }
    }

    pub fn profiles(&self) -> &ModeProfiles {
        self.jobs.profiles()
    }

    pub async fn generate(&self, request: GenerationRequest) -> VideoResult {
        let mode = request.mode();
        match self.run(&request).await {
            Ok(job) => self.finish(job).await,
            Err(e) => {
                match &e {
                    GenerationError::Validation(msg) => warn!("{} rejected: {}", mode, msg),
                    other => error!("{} generation failed: {}", mode, other),
                }
                VideoResult::failed(mode, &e)
            }
        }
    }

    pub async fn query(&self, task_id: &str) -> Result<TaskSnapshot, DashScopeError> {
        self.jobs.query(task_id).await
    }

    async fn run(&self, request: &GenerationRequest) -> Result<Job, GenerationError> {
        let policy = &self.profiles().get(request.mode()).poll;
        let job = self.jobs.submit(request).await?;
        let job = self.jobs.await_completion(job, policy).await?;

        if job.status == TaskStatus::Canceled {
            return Err(GenerationError::RemoteFailure {
                task_id: job.id,
                message: CANCELED_MESSAGE.to_string(),
            });
        }
        Ok(job)
    }

    async fn finish(&self, job: Job) -> VideoResult {
        let mut result = VideoResult {
            success: true,
            video_url: job.result_url.clone(),
            task_id: Some(job.id.clone()),
            mode: Some(job.mode),
            model: Some(job.model.clone()),
            generation_time_secs: job.elapsed_secs(),
            submitted_at: Some(job.submitted_at),
            completed_at: job.completed_at,
            polls: job.polls,
            ..Default::default()
        };

        if let (Some(downloader), Some(url)) = (&self.downloader, job.result_url.as_deref()) {
            match downloader.download(url, &job.id).await {
                Ok(path) => {
                    result.local_video_url = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| format!("/videos/{}", n));
                    result.local_video_path = Some(path.display().to_string());
                }
                Err(e) => warn!("keeping remote URL only for {}: {}", job.id, e),
            }
        }

        info!(
            "{} task {} finished in {:.1}s after {} polls",
            job.mode,
            job.id,
            result.generation_time_secs.unwrap_or_default(),
            job.polls
        );
        result
    }
}
