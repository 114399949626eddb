//! Error types for the generation pipeline.

use std::fmt;
use thiserror::Error;

pub type GenResult<T> = Result<T, GenError>;

/// The kind of generation job a response was expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    TextPlan,
    Image,
    Voice,
    Video,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::TextPlan => "text plan",
            JobKind::Image => "image",
            JobKind::Voice => "audio",
            JobKind::Video => "video",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("media encoding failed: {0}")]
    Encoding(String),

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("plan response is not usable JSON: {0}")]
    MalformedPlan(String),

    #[error("expected {expected} scenes but the plan contains {actual}")]
    SceneCountMismatch { expected: usize, actual: usize },

    #[error("scene {scene} is missing required field \"{field}\"")]
    MissingField { scene: usize, field: String },

    #[error("rate limit reached; wait a moment before trying again")]
    RateLimited,

    #[error("scene {scene} failed: {source}")]
    SceneGeneration {
        scene: usize,
        #[source]
        source: Box<GenError>,
    },

    #[error("no {0} payload in response")]
    EmptyResponse(JobKind),

    #[error("voice synthesis returned no audio data")]
    VoiceSynthesis,

    #[error("no API key selected for video generation")]
    CredentialMissing,

    #[error("the selected API key is not valid")]
    CredentialInvalid,

    #[error("video generation finished without a result; the content may have been blocked by safety filters")]
    SafetyBlocked,

    #[error("video generation failed: {0}")]
    VideoGeneration(String),

    #[error("video download failed with HTTP {0}")]
    DownloadFailed(u16),

    #[error("operation still pending after {0} polls")]
    PollTimeout(u32),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GenError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn malformed_plan(msg: impl Into<String>) -> Self {
        Self::MalformedPlan(msg.into())
    }

    pub fn video_generation(msg: impl Into<String>) -> Self {
        Self::VideoGeneration(msg.into())
    }

    /// Wrap a failure with the 1-based index of the scene it occurred in.
    pub fn scene_failed(scene: usize, source: GenError) -> Self {
        Self::SceneGeneration {
            scene,
            source: Box::new(source),
        }
    }

    /// Check if the error is a rate-limit rejection, including one wrapped
    /// inside a per-scene failure.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            GenError::RateLimited => true,
            GenError::SceneGeneration { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }

    /// The 1-based scene index this error is tied to, when there is one.
    pub fn scene_index(&self) -> Option<usize> {
        match self {
            GenError::SceneGeneration { scene, .. } => Some(*scene),
            GenError::MissingField { scene, .. } => Some(*scene),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_seen_through_scene_wrapper() {
        let err = GenError::scene_failed(2, GenError::RateLimited);
        assert!(err.is_rate_limited());
        assert_eq!(err.scene_index(), Some(2));

        let plain = GenError::VoiceSynthesis;
        assert!(!plain.is_rate_limited());
        assert_eq!(plain.scene_index(), None);
    }

    #[test]
    fn messages_name_the_scene_and_field() {
        let err = GenError::MissingField {
            scene: 3,
            field: "image_prompt".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "scene 3 is missing required field \"image_prompt\""
        );

        let err = GenError::SceneCountMismatch {
            expected: 4,
            actual: 2,
        };
        assert_eq!(err.to_string(), "expected 4 scenes but the plan contains 2");
    }

    #[test]
    fn scene_wrapper_keeps_the_cause_visible() {
        let err = GenError::scene_failed(1, GenError::RateLimited);
        assert!(err.to_string().starts_with("scene 1 failed:"));
        assert!(err.to_string().contains("rate limit"));
    }
}
