// request validation and per-mode wire payloads
use crate::error::GenerationError;
use crate::models::{
    GenerationRequest, ImageToVideoRequest, KeyframeToVideoRequest, Resolution,
    TextToVideoRequest,
};
use crate::profiles::{ModeProfile, ModelInfo};
use crate::services::dashscope::{SubmitBody, SubmitInput, SubmitParameters};

const KEYFRAME_RESOLUTION: Resolution = Resolution::P720;

pub fn validate(
    request: &GenerationRequest,
    profile: &ModeProfile,
    max_prompt_chars: usize,
) -> Result<(), GenerationError> {
    if let Some(model) = request.requested_model().map(str::trim).filter(|m| !m.is_empty()) {
        if profile.find_model(model).is_none() {
            return Err(GenerationError::Validation(format!(
                "Unknown model '{}' for {}",
                model, profile.mode
            )));
        }
    }

    match request {
        GenerationRequest::TextToVideo(r) => {
            let prompt = r.prompt.trim();
            if prompt.is_empty() {
                return Err(GenerationError::Validation("Prompt cannot be empty".into()));
            }
            check_length("Prompt", prompt, max_prompt_chars)?;
            if let Some(negative) = r.negative_prompt.as_deref() {
                check_length("Negative prompt", negative.trim(), max_prompt_chars)?;
            }
        }
        GenerationRequest::ImageToVideo(r) => {
            check_image_ref("Image", &r.img_url)?;
            check_optional_prompt(r.prompt.as_deref(), max_prompt_chars)?;
        }
        GenerationRequest::KeyframeToVideo(r) => {
            check_image_ref("First frame", &r.first_frame_url)?;
            if let Some(last) = r.last_frame_url.as_deref().filter(|u| !u.trim().is_empty()) {
                check_image_ref("Last frame", last)?;
            }
            check_optional_prompt(r.prompt.as_deref(), max_prompt_chars)?;
        }
    }
    Ok(())
}

fn check_length(label: &str, text: &str, max: usize) -> Result<(), GenerationError> {
    let count = text.chars().count();
    if count > max {
        return Err(GenerationError::Validation(format!(
            "{} is too long ({} characters, maximum {})",
            label, count, max
        )));
    }
    Ok(())
}

fn check_optional_prompt(prompt: Option<&str>, max: usize) -> Result<(), GenerationError> {
    match prompt {
        Some(p) => check_length("Prompt", p.trim(), max),
        None => Ok(()),
    }
}

/// Accepts http(s) URLs with a host, base64 image data URIs, `file://` and `oss://` references.
fn check_image_ref(label: &str, value: &str) -> Result<(), GenerationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GenerationError::Validation(format!("{} is required", label)));
    }

    if let Some(rest) = value.strip_prefix("data:") {
        let valid = rest
            .split_once(',')
            .map(|(meta, data)| {
                meta.starts_with("image/") && meta.ends_with(";base64") && !data.is_empty()
            })
            .unwrap_or(false);
        return if valid {
            Ok(())
        } else {
            Err(GenerationError::Validation(format!(
                "{} data URI must be a base64 encoded image",
                label
            )))
        };
    }

    let parsed = url::Url::parse(value).map_err(|_| {
        GenerationError::Validation(format!("{} must be a URL or data URI", label))
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(()),
        "file" | "oss" => Ok(()),
        scheme => Err(GenerationError::Validation(format!(
            "{} has an unsupported URL scheme: {}",
            label, scheme
        ))),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Wire body for an already validated request.
pub fn build_submit_body(request: &GenerationRequest, profile: &ModeProfile) -> SubmitBody {
    let model = profile.resolve_model(request.requested_model());
    match request {
        GenerationRequest::TextToVideo(r) => text_body(r, model),
        GenerationRequest::ImageToVideo(r) => image_body(r, model),
        GenerationRequest::KeyframeToVideo(r) => keyframe_body(r, model),
    }
}

fn text_body(r: &TextToVideoRequest, model: &ModelInfo) -> SubmitBody {
    let size = model.best_resolution().size_for(r.aspect_ratio);
    SubmitBody {
        model: model.id.to_string(),
        input: SubmitInput {
            prompt: Some(r.prompt.trim().to_string()),
            ..Default::default()
        },
        parameters: SubmitParameters {
            size: Some(size.to_string()),
            negative_prompt: non_blank(r.negative_prompt.as_deref()),
            seed: r.seed,
            ..Default::default()
        },
    }
}

fn image_body(r: &ImageToVideoRequest, model: &ModelInfo) -> SubmitBody {
    SubmitBody {
        model: model.id.to_string(),
        input: SubmitInput {
            img_url: Some(r.img_url.trim().to_string()),
            prompt: non_blank(r.prompt.as_deref()),
            ..Default::default()
        },
        parameters: SubmitParameters {
            resolution: Some(model.best_resolution()),
            prompt_extend: Some(true),
            ..Default::default()
        },
    }
}

fn keyframe_body(r: &KeyframeToVideoRequest, model: &ModelInfo) -> SubmitBody {
    SubmitBody {
        model: model.id.to_string(),
        input: SubmitInput {
            first_frame_url: Some(r.first_frame_url.trim().to_string()),
            last_frame_url: non_blank(r.last_frame_url.as_deref()),
            prompt: non_blank(r.prompt.as_deref()),
            ..Default::default()
        },
        parameters: SubmitParameters {
            resolution: Some(KEYFRAME_RESOLUTION),
            prompt_extend: Some(true),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, GenerationMode, Style};
    use crate::profiles::ModeProfiles;
    use serde_json::json;

    fn text(prompt: &str) -> TextToVideoRequest {
        TextToVideoRequest {
            prompt: prompt.to_string(),
            style: Style::Auto,
            aspect_ratio: AspectRatio::Widescreen,
            model: None,
            negative_prompt: None,
            seed: None,
        }
    }

    fn image(url: &str) -> GenerationRequest {
        GenerationRequest::ImageToVideo(ImageToVideoRequest {
            img_url: url.to_string(),
            prompt: None,
            style: Style::Auto,
            model: None,
        })
    }

    fn text_profile() -> ModeProfile {
        ModeProfiles::default().get(GenerationMode::TextToVideo).clone()
    }

    fn image_profile() -> ModeProfile {
        ModeProfiles::default().get(GenerationMode::ImageToVideo).clone()
    }

    fn check_text(req: TextToVideoRequest, max: usize) -> Result<(), GenerationError> {
        validate(&GenerationRequest::TextToVideo(req), &text_profile(), max)
    }

    fn check_image(url: &str) -> Result<(), GenerationError> {
        validate(&image(url), &image_profile(), 1000)
    }

    #[test]
    fn test_unknown_model_rejected() {
        let mut req = text("a fox");
        req.model = Some("sora".into());
        let err = check_text(req.clone(), 1000).unwrap_err();
        assert!(err.to_string().contains("Unknown model 'sora'"));

        req.model = Some("wanx2.1-t2v-turbo".into());
        assert!(check_text(req, 1000).is_ok());
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let err = check_text(text("   "), 1000).unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
        assert!(err.to_string().contains("Prompt cannot be empty"));
    }

    #[test]
    fn test_prompt_length_counts_chars() {
        let prompt = "é".repeat(10);
        assert!(check_text(text(&prompt), 10).is_ok());
        let err = check_text(text(&prompt), 9).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_image_references() {
        assert!(check_image("https://cdn.example.com/cat.png").is_ok());
        assert!(check_image("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(check_image("file:///tmp/cat.png").is_ok());
        assert!(check_image("oss://bucket/cat.png").is_ok());

        assert!(check_image("").is_err());
        assert!(check_image("not a url").is_err());
        assert!(check_image("ftp://example.com/cat.png").is_err());
        assert!(check_image("data:text/plain;base64,aGk=").is_err());
    }

    #[test]
    fn test_text_body_wire_shape() {
        let profiles = ModeProfiles::default();
        let mut req = text("  A cat running on the grass ");
        req.negative_prompt = Some("   ".into());
        req.seed = Some(42);
        let body = build_submit_body(
            &GenerationRequest::TextToVideo(req),
            profiles.get(GenerationMode::TextToVideo),
        );
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "wan2.2-t2v-plus",
                "input": { "prompt": "A cat running on the grass" },
                "parameters": { "size": "1920*1080", "seed": 42 }
            })
        );
    }

    #[test]
    fn test_text_size_follows_model_resolution() {
        let profiles = ModeProfiles::default();
        let mut req = text("waves");
        req.model = Some("wanx2.1-t2v-turbo".into());
        req.aspect_ratio = AspectRatio::Square;
        req.negative_prompt = Some(" blurry ".into());
        let body = build_submit_body(
            &GenerationRequest::TextToVideo(req),
            profiles.get(GenerationMode::TextToVideo),
        );
        assert_eq!(body.model, "wanx2.1-t2v-turbo");
        assert_eq!(body.parameters.size.as_deref(), Some("960*960"));
        assert_eq!(body.parameters.negative_prompt.as_deref(), Some("blurry"));
    }

    #[test]
    fn test_image_body_wire_shape() {
        let profiles = ModeProfiles::default();
        let body = build_submit_body(
            &image("https://cdn.example.com/cat.png"),
            profiles.get(GenerationMode::ImageToVideo),
        );
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "wan2.2-i2v-plus",
                "input": { "img_url": "https://cdn.example.com/cat.png" },
                "parameters": { "resolution": "1080P", "prompt_extend": true }
            })
        );
    }

    #[test]
    fn test_keyframe_body_wire_shape() {
        let profiles = ModeProfiles::default();
        let req = GenerationRequest::KeyframeToVideo(KeyframeToVideoRequest {
            first_frame_url: "https://cdn.example.com/a.png".into(),
            last_frame_url: Some("https://cdn.example.com/b.png".into()),
            prompt: Some("a flower blooming".into()),
            style: Style::Cinematic,
            model: None,
        });
        let body = build_submit_body(&req, profiles.get(GenerationMode::KeyframeToVideo));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "wanx2.1-kf2v-plus",
                "input": {
                    "prompt": "a flower blooming",
                    "first_frame_url": "https://cdn.example.com/a.png",
                    "last_frame_url": "https://cdn.example.com/b.png"
                },
                "parameters": { "resolution": "720P", "prompt_extend": true }
            })
        );
    }
}
