use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::{
    error::{ApiError, Result},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/videos/:file", get(serve_video))
}

/// Only names the downloader produces are served.
fn is_safe_name(name: &str) -> bool {
    name.starts_with("video_")
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("gif") => "image/gif",
        _ => "video/mp4",
    }
}

async fn serve_video(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse> {
    if !is_safe_name(&file) {
        return Err(ApiError::NotFound);
    }

    let bytes = tokio::fs::read(state.config.video_dir().join(&file)).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&file))
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", file),
        )
        .body(Body::from(bytes))
        .map_err(|_| ApiError::InternalError)
}
