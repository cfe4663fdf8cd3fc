pub mod config;
pub mod error;
pub mod models;
pub mod profiles;
pub mod routes;
pub mod services;
pub mod worker;

pub use config::Config;
pub use error::{ApiError, GenerationError, Result};

use axum::{http::Method, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use profiles::ModeProfiles;
use services::{AsyncJobClient, DashScopeClient, TaskApi, VideoDownloader, VideoService};

// base64 data URIs for two keyframes fit comfortably
const BODY_LIMIT: usize = 32 * 1024 * 1024;

pub struct AppState {
    pub config: Config,
    pub profiles: ModeProfiles,
    /// None until a DashScope API key is configured
    pub videos: Option<VideoService>,
}

impl AppState {
    pub fn new(config: Config, api: Option<Arc<dyn TaskApi>>, http: reqwest::Client) -> Self {
        let profiles = ModeProfiles::from_config(&config);

        let videos = api.map(|api| {
            let jobs = AsyncJobClient::new(api, profiles.clone(), config.max_prompt_chars);
            let downloader = config.download_videos.then(|| {
                VideoDownloader::new(
                    http.clone(),
                    config.video_dir(),
                    config.download_timeout(),
                )
            });
            VideoService::new(jobs, downloader)
        });

        Self {
            config,
            profiles,
            videos,
        }
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let api: Option<Arc<dyn TaskApi>> = if config.api_configured() {
            Some(Arc::new(DashScopeClient::new(config.dashscope()?, http.clone())))
        } else {
            tracing::warn!("DASHSCOPE_API_KEY is not set, generation is disabled");
            None
        };

        Ok(Self::new(config, api, http))
    }
}

fn build_cors(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.config.cors_origins);

    // generate calls are bounded by the mode's max wait instead
    let short = Router::new()
        .nest("/api", routes::api::routes())
        .merge(routes::health::routes())
        .merge(routes::videos::routes())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout,
        )));

    Router::new()
        .nest("/api/generate", routes::generate::routes())
        .merge(short)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
