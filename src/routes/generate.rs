use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::GenerationError,
    models::{
        GenerationMode, GenerationRequest, ImageToVideoRequest, KeyframeToVideoRequest,
        TextToVideoRequest, VideoResult,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/text", post(generate_text))
        .route("/image", post(generate_image))
        .route("/keyframe", post(generate_keyframe))
}

type GenerateResponse = (StatusCode, Json<VideoResult>);

async fn generate_text(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextToVideoRequest>, JsonRejection>,
) -> GenerateResponse {
    match payload {
        Ok(Json(req)) => run(&state, GenerationRequest::TextToVideo(req)).await,
        Err(rejection) => rejected(GenerationMode::TextToVideo, rejection),
    }
}

async fn generate_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImageToVideoRequest>, JsonRejection>,
) -> GenerateResponse {
    match payload {
        Ok(Json(req)) => run(&state, GenerationRequest::ImageToVideo(req)).await,
        Err(rejection) => rejected(GenerationMode::ImageToVideo, rejection),
    }
}

async fn generate_keyframe(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<KeyframeToVideoRequest>, JsonRejection>,
) -> GenerateResponse {
    match payload {
        Ok(Json(req)) => run(&state, GenerationRequest::KeyframeToVideo(req)).await,
        Err(rejection) => rejected(GenerationMode::KeyframeToVideo, rejection),
    }
}

async fn run(state: &AppState, request: GenerationRequest) -> GenerateResponse {
    let result = match &state.videos {
        Some(videos) => videos.generate(request).await,
        None => VideoResult::failed(
            request.mode(),
            &GenerationError::Submission(
                "DashScope API key is not configured. Set DASHSCOPE_API_KEY".into(),
            ),
        ),
    };
    respond(result)
}

fn rejected(mode: GenerationMode, rejection: JsonRejection) -> GenerateResponse {
    let error = GenerationError::Validation(rejection.body_text());
    respond(VideoResult::failed(mode, &error))
}

fn respond(result: VideoResult) -> GenerateResponse {
    let status = result
        .error_kind
        .map(|kind| kind.status_code())
        .unwrap_or(StatusCode::OK);
    (status, Json(result))
}
