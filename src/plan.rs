use crate::error::{GenError, GenResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One planned ad scene, as returned by the planning call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenePlan {
    pub title: String,
    pub description: String,
    pub script: String,
    pub image_prompt: String,
    pub video_prompt: String,
    pub overlay_text: String,
    pub caption: String,
}

/// One planned personal-branding scene. Script and overlay may come back
/// empty; the image prompt carries the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingScene {
    #[serde(default)]
    pub script: String,
    pub image_prompt: String,
    #[serde(default)]
    pub overlay: String,
}

/// Check a raw planning response against the requested scene count and the
/// per-scene required fields, then deserialize it. All or nothing: any
/// violation rejects the whole plan.
pub fn parse_scene_plans<T: DeserializeOwned>(
    raw: &str,
    expected: usize,
    required: &[&str],
) -> GenResult<Vec<T>> {
    let text = strip_code_fences(raw);
    let root: Value =
        serde_json::from_str(text).map_err(|e| GenError::malformed_plan(e.to_string()))?;

    let scenes = root
        .get("scenes")
        .and_then(Value::as_array)
        .ok_or_else(|| GenError::malformed_plan("missing \"scenes\" array"))?;

    if scenes.len() != expected {
        return Err(GenError::SceneCountMismatch {
            expected,
            actual: scenes.len(),
        });
    }

    for (i, scene) in scenes.iter().enumerate() {
        for field in required {
            let present = scene
                .get(*field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(GenError::MissingField {
                    scene: i + 1,
                    field: (*field).to_string(),
                });
            }
        }
    }

    serde_json::from_value(Value::Array(scenes.clone()))
        .map_err(|e| GenError::malformed_plan(e.to_string()))
}

// Planning models occasionally wrap the JSON in a markdown code block.
fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        text
    };
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
