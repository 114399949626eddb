use crate::error::{GenError, GenResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Settings for one studio instance. All timing and model choices live
/// here; nothing is read from process globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_planning_model")]
    pub planning_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Wait between consecutive image generations, in milliseconds.
    #[serde(default = "default_image_pacing_ms")]
    pub image_pacing_ms: u64,
    /// Wait between video operation status checks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on status checks per video operation. `None` polls
    /// until the operation reports done.
    #[serde(default)]
    pub max_polls: Option<u32>,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_planning_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}

fn default_voice_name() -> String {
    "Kore".to_string()
}

fn default_aspect_ratio() -> String {
    "9:16".to_string()
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_image_pacing_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            planning_model: default_planning_model(),
            image_model: default_image_model(),
            tts_model: default_tts_model(),
            video_model: default_video_model(),
            voice_name: default_voice_name(),
            aspect_ratio: default_aspect_ratio(),
            resolution: default_resolution(),
            image_pacing_ms: default_image_pacing_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: None,
        }
    }
}

impl StudioConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> GenResult<Self> {
        let content = fs::read_to_string(&path).await.map_err(|e| {
            GenError::config(format!(
                "failed to read config: {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: StudioConfig = serde_json::from_str(&content)
            .map_err(|e| GenError::config(format!("failed to parse config: {e}")))?;

        if config.api_key.is_empty() {
            return Err(GenError::config("api_key missing"));
        }

        Ok(config)
    }

    pub fn image_pacing(&self) -> Duration {
        Duration::from_millis(self.image_pacing_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
