//! Generation orchestration for short-form video ads.
//!
//! This crate turns a product image, an optional model image and a chosen
//! narrative template into the assets of a multi-scene vertical video ad:
//! a validated scene plan, one composited still per scene, an optional
//! voice-over, and one animated clip per still. It sequences the
//! rate-limited external generation calls one at a time, converts the
//! long-running video protocol into an awaited result, and enforces the
//! invariants no single call can guarantee on its own: exact scene-count
//! agreement, inter-request pacing, index alignment from plan to clip,
//! and identity consistency across every generated frame.
//!
//! The embedding application talks to [`studio::AdStudio`]; everything
//! else supports it.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod media;
pub mod plan;
pub mod poller;
pub mod sequencer;
pub mod studio;
pub mod templates;

pub use api::gemini::GeminiClient;
pub use api::{GenerationService, OperationError, VideoOperation};
pub use config::StudioConfig;
pub use credentials::{CredentialProvider, PreselectedKey};
pub use error::{GenError, GenResult, JobKind};
pub use media::{MediaPayload, MediaReference, MediaRole, MediaSet, RenderedAsset};
pub use plan::{BrandingScene, ScenePlan};
pub use studio::{AdStudio, BrandingPackage, VideoOptions};
pub use templates::{BrandingParams, PlanParams, SceneTemplate, SCENE_TEMPLATES};
