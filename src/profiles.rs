use serde::Serialize;

use crate::config::Config;
use crate::models::{GenerationMode, Resolution};
use crate::services::job_client::PollPolicy;

pub const TEXT_TO_VIDEO_ENDPOINT: &str = "/services/aigc/video-generation/video-synthesis";
pub const IMAGE_TO_VIDEO_ENDPOINT: &str = "/services/aigc/image2video/video-synthesis";

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub resolutions: &'static [Resolution],
}

impl ModelInfo {
    pub fn best_resolution(&self) -> Resolution {
        self.resolutions
            .iter()
            .copied()
            .max()
            .unwrap_or(Resolution::P720)
    }
}

const TEXT_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "wan2.2-t2v-plus",
        name: "Wan 2.2 Plus",
        description: "higher visual quality",
        resolutions: &[Resolution::P480, Resolution::P1080],
    },
    ModelInfo {
        id: "wanx2.1-t2v-turbo",
        name: "Wan 2.1 Turbo",
        description: "faster generation",
        resolutions: &[Resolution::P480, Resolution::P720],
    },
    ModelInfo {
        id: "wanx2.1-t2v-plus",
        name: "Wan 2.1 Plus",
        description: "stable 720P output",
        resolutions: &[Resolution::P720],
    },
];

const IMAGE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "wan2.2-i2v-plus",
        name: "Wan 2.2 Plus",
        description: "higher visual quality",
        resolutions: &[Resolution::P480, Resolution::P1080],
    },
    ModelInfo {
        id: "wan2.2-i2v-flash",
        name: "Wan 2.2 Flash",
        description: "fastest generation",
        resolutions: &[Resolution::P480, Resolution::P720],
    },
    ModelInfo {
        id: "wanx2.1-i2v-plus",
        name: "Wan 2.1 Plus",
        description: "stable 720P output",
        resolutions: &[Resolution::P720],
    },
    ModelInfo {
        id: "wanx2.1-i2v-turbo",
        name: "Wan 2.1 Turbo",
        description: "faster generation",
        resolutions: &[Resolution::P480, Resolution::P720],
    },
];

const KEYFRAME_MODELS: &[ModelInfo] = &[ModelInfo {
    id: "wanx2.1-kf2v-plus",
    name: "Wan 2.1 Keyframe Plus",
    description: "first and last frame to video",
    resolutions: &[Resolution::P720],
}];

/// Endpoint, model catalogue and polling policy for one generation mode.
#[derive(Debug, Clone)]
pub struct ModeProfile {
    pub mode: GenerationMode,
    pub endpoint: &'static str,
    pub models: &'static [ModelInfo],
    pub poll: PollPolicy,
}

impl ModeProfile {
    pub fn default_model(&self) -> &'static ModelInfo {
        &self.models[0]
    }

    pub fn find_model(&self, id: &str) -> Option<&'static ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Requested model if catalogued, otherwise the mode default.
    pub fn resolve_model(&self, requested: Option<&str>) -> &'static ModelInfo {
        requested
            .map(str::trim)
            .and_then(|id| self.find_model(id))
            .unwrap_or_else(|| self.default_model())
    }
}

#[derive(Debug, Clone)]
pub struct ModeProfiles {
    text: ModeProfile,
    image: ModeProfile,
    keyframe: ModeProfile,
}

impl ModeProfiles {
    pub fn new(text_poll: PollPolicy, image_poll: PollPolicy) -> Self {
        Self {
            text: ModeProfile {
                mode: GenerationMode::TextToVideo,
                endpoint: TEXT_TO_VIDEO_ENDPOINT,
                models: TEXT_MODELS,
                poll: text_poll,
            },
            image: ModeProfile {
                mode: GenerationMode::ImageToVideo,
                endpoint: IMAGE_TO_VIDEO_ENDPOINT,
                models: IMAGE_MODELS,
                poll: image_poll.clone(),
            },
            keyframe: ModeProfile {
                mode: GenerationMode::KeyframeToVideo,
                endpoint: IMAGE_TO_VIDEO_ENDPOINT,
                models: KEYFRAME_MODELS,
                poll: image_poll,
            },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.text_poll_policy(), config.image_poll_policy())
    }

    pub fn get(&self, mode: GenerationMode) -> &ModeProfile {
        match mode {
            GenerationMode::TextToVideo => &self.text,
            GenerationMode::ImageToVideo => &self.image,
            GenerationMode::KeyframeToVideo => &self.keyframe,
        }
    }

    /// Profiles in `GenerationMode::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = &ModeProfile> {
        GenerationMode::ALL.into_iter().map(move |mode| self.get(mode))
    }
}

impl Default for ModeProfiles {
    fn default() -> Self {
        Self::new(PollPolicy::text_default(), PollPolicy::image_default())
    }
}
