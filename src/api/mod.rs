use crate::error::GenResult;
use crate::media::{MediaPayload, MediaSet};
use crate::poller::OperationSnapshot;
use async_trait::async_trait;

pub mod gemini;

/// The remote generation capabilities the studio orchestrates. One
/// implementation speaks to the real service; tests drive the studio
/// with stubs.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Text planning call. Returns the raw response text for plan
    /// validation; `fields` declares the per-scene schema the response
    /// must honor.
    async fn generate_plan(&self, prompt: &str, fields: &[&str]) -> GenResult<String>;

    /// Compose one still from the reference images and the instruction.
    async fn generate_image(
        &self,
        media: &MediaSet,
        instruction: &str,
    ) -> GenResult<MediaPayload>;

    /// Generate one still from text alone.
    async fn generate_image_from_text(&self, prompt: &str) -> GenResult<MediaPayload>;

    /// Speech synthesis for the narration text.
    async fn synthesize_speech(&self, text: &str) -> GenResult<MediaPayload>;

    /// Start a video generation job from a still and an instruction.
    async fn submit_video(
        &self,
        still: &MediaPayload,
        instruction: &str,
    ) -> GenResult<VideoOperation>;

    /// Fetch a fresh snapshot of a submitted operation.
    async fn refresh_video(&self, operation: VideoOperation) -> GenResult<VideoOperation>;

    /// Download the finished video from its locator.
    async fn fetch_video(&self, uri: &str) -> GenResult<MediaPayload>;
}

/// Snapshot of a long-running video generation job. Refreshing replaces
/// the whole snapshot.
#[derive(Debug, Clone)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    pub error: Option<OperationError>,
    pub video_uri: Option<String>,
}

/// The error record a failed operation carries.
#[derive(Debug, Clone)]
pub struct OperationError {
    pub code: i32,
    pub message: String,
}

impl OperationSnapshot for VideoOperation {
    fn is_done(&self) -> bool {
        self.done
    }
}
