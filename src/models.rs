use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, GenerationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    TextToVideo,
    ImageToVideo,
    KeyframeToVideo,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 3] = [
        GenerationMode::TextToVideo,
        GenerationMode::ImageToVideo,
        GenerationMode::KeyframeToVideo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::TextToVideo => "text_to_video",
            GenerationMode::ImageToVideo => "image_to_video",
            GenerationMode::KeyframeToVideo => "keyframe_to_video",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote task state as reported by DashScope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    // anything else the service reports, e.g. UNKNOWN for an expired id
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Style {
    #[default]
    #[serde(rename = "<auto>")]
    Auto,
    Cinematic,
    Anime,
    Realistic,
    Abstract,
    Documentary,
    Commercial,
}

impl Style {
    pub const ALL: [Style; 7] = [
        Style::Auto,
        Style::Cinematic,
        Style::Anime,
        Style::Realistic,
        Style::Abstract,
        Style::Documentary,
        Style::Commercial,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Style::Auto => "Auto (Recommended)",
            Style::Cinematic => "Cinematic",
            Style::Anime => "Anime",
            Style::Realistic => "Realistic",
            Style::Abstract => "Abstract",
            Style::Documentary => "Documentary",
            Style::Commercial => "Commercial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [
        AspectRatio::Widescreen,
        AspectRatio::Square,
        AspectRatio::Portrait,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9 (Widescreen)",
            AspectRatio::Square => "1:1 (Square)",
            AspectRatio::Portrait => "9:16 (Portrait)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "480P")]
    P480,
    #[serde(rename = "720P")]
    P720,
    #[serde(rename = "1080P")]
    P1080,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::P480 => "480P",
            Resolution::P720 => "720P",
            Resolution::P1080 => "1080P",
        }
    }

    /// `WIDTH*HEIGHT` as the text-to-video `size` parameter expects it.
    pub fn size_for(self, ratio: AspectRatio) -> &'static str {
        match (self, ratio) {
            (Resolution::P1080, AspectRatio::Widescreen) => "1920*1080",
            (Resolution::P1080, AspectRatio::Square) => "1440*1440",
            (Resolution::P1080, AspectRatio::Portrait) => "1080*1920",
            (Resolution::P720, AspectRatio::Widescreen) => "1280*720",
            (Resolution::P720, AspectRatio::Square) => "960*960",
            (Resolution::P720, AspectRatio::Portrait) => "720*1280",
            (Resolution::P480, AspectRatio::Widescreen) => "832*480",
            (Resolution::P480, AspectRatio::Square) => "624*624",
            (Resolution::P480, AspectRatio::Portrait) => "480*832",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToVideoRequest {
    pub prompt: String,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub seed: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageToVideoRequest {
    /// Public URL, `data:image/...;base64,` URI or local file reference
    pub img_url: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeToVideoRequest {
    pub first_frame_url: String,
    #[serde(default)]
    pub last_frame_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerationRequest {
    TextToVideo(TextToVideoRequest),
    ImageToVideo(ImageToVideoRequest),
    KeyframeToVideo(KeyframeToVideoRequest),
}

impl GenerationRequest {
    pub fn mode(&self) -> GenerationMode {
        match self {
            GenerationRequest::TextToVideo(_) => GenerationMode::TextToVideo,
            GenerationRequest::ImageToVideo(_) => GenerationMode::ImageToVideo,
            GenerationRequest::KeyframeToVideo(_) => GenerationMode::KeyframeToVideo,
        }
    }

    pub fn requested_model(&self) -> Option<&str> {
        match self {
            GenerationRequest::TextToVideo(r) => r.model.as_deref(),
            GenerationRequest::ImageToVideo(r) => r.model.as_deref(),
            GenerationRequest::KeyframeToVideo(r) => r.model.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<u32>,
}

/// One remote generation task, owned by the polling operation that drives it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub mode: GenerationMode,
    pub model: String,
    pub status: TaskStatus,
    pub result_url: Option<String>,
    pub error_detail: Option<String>,
    pub request_id: Option<String>,
    pub usage: Option<TaskUsage>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Successful status queries so far
    pub polls: u32,
}

impl Job {
    pub fn pending(id: String, mode: GenerationMode, model: String) -> Self {
        Self {
            id,
            mode,
            model,
            status: TaskStatus::Pending,
            result_url: None,
            error_detail: None,
            request_id: None,
            usage: None,
            submitted_at: Utc::now(),
            completed_at: None,
            polls: 0,
        }
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.submitted_at).num_milliseconds() as f64 / 1000.0)
    }
}

/// What the UI gets back from one generate call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VideoResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GenerationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub polls: u32,
}

impl VideoResult {
    pub fn failed(mode: GenerationMode, error: &GenerationError) -> Self {
        Self {
            success: false,
            error_message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            task_id: error.task_id().map(str::to_string),
            mode: Some(mode),
            ..Default::default()
        }
    }
}
