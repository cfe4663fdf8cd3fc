use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use crate::services::job_client::PollPolicy;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
const DOWNLOAD_TIMEOUT_MULTIPLIER: u64 = 3;

#[derive(Parser, Debug, Clone)]
#[command(name = "wan-gateway")]
#[command(about = "Text, image and keyframe to video gateway for DashScope", long_about = None)]
#[command(args_override_self = true)]
pub struct Config {
    #[arg(long, env = "DASHSCOPE_API_KEY", hide_env_values = true)]
    pub dashscope_api_key: Option<String>,

    #[arg(long, env = "DASHSCOPE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub dashscope_base_url: String,

    #[arg(long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "SERVER_PORT", default_value = "7860")]
    pub port: u16,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Per HTTP call to DashScope, and for the short API routes
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout: u64,

    #[arg(
        long,
        env = "TEXT_POLL_INTERVAL_SECS",
        default_value = "2",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub text_poll_interval: u64,

    #[arg(long, env = "TEXT_MAX_WAIT_SECS", default_value = "300")]
    pub text_max_wait: u64,

    // shared by image and keyframe modes
    #[arg(
        long,
        env = "IMAGE_POLL_INTERVAL_SECS",
        default_value = "15",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub image_poll_interval: u64,

    #[arg(long, env = "IMAGE_MAX_WAIT_SECS", default_value = "1800")]
    pub image_max_wait: u64,

    #[arg(long, env = "POLL_MAX_RETRIES", default_value = "3")]
    pub poll_max_retries: u32,

    #[arg(long, env = "MAX_PROMPT_CHARS", default_value = "1000")]
    pub max_prompt_chars: usize,

    #[arg(long, env = "DOWNLOAD_VIDEOS", default_value_t = true, action = clap::ArgAction::Set)]
    pub download_videos: bool,

    #[arg(long, env = "VIDEO_DIR")]
    pub video_dir: Option<PathBuf>,

    #[arg(long, env = "VIDEO_CACHE_MAX_AGE_HOURS", default_value = "24")]
    pub video_cache_max_age_hours: u64,

    #[arg(
        long,
        env = "CLEANUP_INTERVAL_SECS",
        default_value = "3600",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cleanup_interval: u64,

    #[arg(long, env = "CORS_ORIGINS", default_value = "")]
    pub cors_origins: String,
}

/// Connection settings handed to the DashScope client at construction.
#[derive(Debug, Clone)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    pub fn api_configured(&self) -> bool {
        self.dashscope_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    pub fn dashscope(&self) -> anyhow::Result<DashScopeConfig> {
        let api_key = match self.dashscope_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => bail!("DASHSCOPE_API_KEY is required. Set it in the environment or a .env file"),
        };

        let base = url::Url::parse(&self.dashscope_base_url)
            .with_context(|| format!("invalid DASHSCOPE_BASE_URL: {}", self.dashscope_base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("DASHSCOPE_BASE_URL must be http or https");
        }

        Ok(DashScopeConfig {
            api_key,
            base_url: self.dashscope_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(self.request_timeout),
        })
    }

    pub fn text_poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.text_poll_interval),
            max_wait: Duration::from_secs(self.text_max_wait),
            max_retries: self.poll_max_retries,
        }
    }

    pub fn image_poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.image_poll_interval),
            max_wait: Duration::from_secs(self.image_max_wait),
            max_retries: self.poll_max_retries,
        }
    }

    pub fn video_dir(&self) -> PathBuf {
        self.video_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("wan_gateway_videos"))
    }

    /// Videos are much larger than API responses.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout * DOWNLOAD_TIMEOUT_MULTIPLIER)
    }

    pub fn video_cache_max_age(&self) -> Duration {
        Duration::from_secs(self.video_cache_max_age_hours * 3600)
    }
}
